use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquipmentId(pub uuid::Uuid);

impl fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EquipmentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s.trim()).map(EquipmentId)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationDetail {
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Equipment {
    pub id: EquipmentId,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub location_detail: Option<LocationDetail>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanResult {
    pub id: EquipmentId,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub location: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueRequest {
    pub equipment_id: EquipmentId,
    pub target_user_id: i64,
    pub notes: String,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCondition {
    Ok,
    NeedRepair,
    Damaged,
}

impl std::str::FromStr for ReturnCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(ReturnCondition::Ok),
            "need_repair" => Ok(ReturnCondition::NeedRepair),
            "damaged" => Ok(ReturnCondition::Damaged),
            other => Err(format!("unknown condition: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnRequest {
    pub equipment_id: EquipmentId,
    pub condition: ReturnCondition,
    pub notes: String,
}

/// Operation record echoed back by issue/return.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Operation {
    pub id: i64,
    pub equipment: EquipmentId,
    pub action_type: String,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct InventorySessionId(pub i64);

impl fmt::Display for InventorySessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InventorySession {
    pub id: InventorySessionId,
    #[serde(default)]
    pub location: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InventoryResult {
    #[serde(default)]
    pub scanned: Vec<EquipmentId>,
    #[serde(default)]
    pub missing: Vec<EquipmentId>,
    #[serde(default)]
    pub extra: Vec<EquipmentId>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Notification {
    pub id: i64,
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub is_read: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OverdueItem {
    pub equipment_id: EquipmentId,
    pub equipment_name: String,
    #[serde(default)]
    pub target_user: String,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionCount {
    pub action_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Stats {
    pub total_operations: u64,
    pub by_action: Vec<ActionCount>,
}
