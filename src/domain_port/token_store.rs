use crate::domain_model::StoredTokens;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt token file: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Missing storage loads as empty tokens.
    async fn load(&self) -> Result<StoredTokens, StoreError>;
    /// Replaces both keys in one step.
    async fn save(&self, tokens: &StoredTokens) -> Result<(), StoreError>;
    async fn clear(&self) -> Result<(), StoreError>;
}
