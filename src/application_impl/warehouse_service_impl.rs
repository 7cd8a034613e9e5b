use crate::application_port::*;
use crate::domain_model::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ScannedCount {
    scanned_count: u64,
}

#[derive(Debug, Deserialize)]
struct Updated {
    updated: u64,
}

#[derive(Debug, Deserialize)]
struct OverdueList {
    #[serde(default)]
    overdue: Vec<OverdueItem>,
}

pub struct RealWarehouseService {
    session: Arc<dyn SessionService>,
}

impl RealWarehouseService {
    pub fn new(session: Arc<dyn SessionService>) -> Self {
        Self { session }
    }

    async fn get<T: DeserializeOwned + Send>(&self, path: &str) -> Result<T, WarehouseError> {
        let resp = self
            .session
            .authenticated_request(Endpoint::get(path), RequestOptions::default())
            .await?;
        Ok(resp.json()?)
    }

    async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, WarehouseError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let options = match body {
            Some(body) => RequestOptions::json(body)?,
            None => RequestOptions::default(),
        };
        let resp = self
            .session
            .authenticated_request(Endpoint::post(path), options)
            .await?;
        Ok(resp.json()?)
    }
}

#[async_trait::async_trait]
impl WarehouseService for RealWarehouseService {
    async fn list_equipment(&self) -> Result<Vec<Equipment>, WarehouseError> {
        self.get("/api/equipment/").await
    }

    async fn scan(&self, qr_data: &str) -> Result<ScanResult, WarehouseError> {
        let qr_data = qr_data.trim();
        if qr_data.is_empty() {
            return Err(WarehouseError::InvalidInput("empty QR payload".to_string()));
        }
        self.post("/api/scan/", Some(&json!({ "qr_data": qr_data })))
            .await
    }

    async fn issue(&self, request: IssueRequest) -> Result<Operation, WarehouseError> {
        self.post("/api/operations/issue/", Some(&request)).await
    }

    async fn return_equipment(&self, request: ReturnRequest) -> Result<Operation, WarehouseError> {
        self.post("/api/operations/return/", Some(&request)).await
    }

    async fn start_inventory(&self, location: Option<i64>) -> Result<InventorySession, WarehouseError> {
        let body = match location {
            Some(location) => json!({ "location": location }),
            None => json!({}),
        };
        self.post("/api/inventory/", Some(&body)).await
    }

    async fn scan_inventory(
        &self,
        session: InventorySessionId,
        equipment_id: EquipmentId,
    ) -> Result<u64, WarehouseError> {
        let path = format!("/api/inventory/{}/scan/", session);
        let counted: ScannedCount = self
            .post(&path, Some(&json!({ "equipment_id": equipment_id })))
            .await?;
        Ok(counted.scanned_count)
    }

    async fn finish_inventory(
        &self,
        session: InventorySessionId,
    ) -> Result<InventoryResult, WarehouseError> {
        let path = format!("/api/inventory/{}/finish/", session);
        self.post::<(), _>(&path, None).await
    }

    async fn notifications(&self) -> Result<Vec<Notification>, WarehouseError> {
        self.get("/api/notifications/").await
    }

    async fn mark_notifications_read(&self) -> Result<u64, WarehouseError> {
        let updated: Updated = self
            .post::<(), _>("/api/notifications/mark_all_read/", None)
            .await?;
        Ok(updated.updated)
    }

    async fn overdue(&self) -> Result<Vec<OverdueItem>, WarehouseError> {
        let list: OverdueList = self.get("/api/notifications/overdue/").await?;
        Ok(list.overdue)
    }

    async fn stats(&self) -> Result<Stats, WarehouseError> {
        self.get("/api/stats/").await
    }
}
