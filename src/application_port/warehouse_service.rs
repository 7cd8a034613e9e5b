use crate::application_port::RequestError;
use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait WarehouseService: Send + Sync {
    async fn list_equipment(&self) -> Result<Vec<Equipment>, WarehouseError>;
    async fn scan(&self, qr_data: &str) -> Result<ScanResult, WarehouseError>;
    async fn issue(&self, request: IssueRequest) -> Result<Operation, WarehouseError>;
    async fn return_equipment(&self, request: ReturnRequest) -> Result<Operation, WarehouseError>;
    async fn start_inventory(&self, location: Option<i64>) -> Result<InventorySession, WarehouseError>;
    async fn scan_inventory(
        &self,
        session: InventorySessionId,
        equipment_id: EquipmentId,
    ) -> Result<u64, WarehouseError>;
    async fn finish_inventory(
        &self,
        session: InventorySessionId,
    ) -> Result<InventoryResult, WarehouseError>;
    async fn notifications(&self) -> Result<Vec<Notification>, WarehouseError>;
    async fn mark_notifications_read(&self) -> Result<u64, WarehouseError>;
    async fn overdue(&self) -> Result<Vec<OverdueItem>, WarehouseError>;
    async fn stats(&self) -> Result<Stats, WarehouseError>;
}
