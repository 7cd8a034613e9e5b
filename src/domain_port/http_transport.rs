use crate::domain_model::{HttpRequest, HttpResponse};

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Other(String),
}

/// Dispatches requests to the warehouse API. Any HTTP status, including
/// 4xx/5xx, is a successful send; only missing responses are errors.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
