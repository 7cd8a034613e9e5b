use crate::domain_model::*;
use crate::domain_port::{StoreError, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,
    #[error("login rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("store error: {0}")]
    Store(String),
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        AuthError::Network(err.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    Unauthorized,
    ServerError,
    NetworkError,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RequestError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("server error ({status}): {body}")]
    Server { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
}

impl RequestError {
    pub fn kind(&self) -> RequestErrorKind {
        match self {
            RequestError::Unauthorized => RequestErrorKind::Unauthorized,
            RequestError::Server { .. } => RequestErrorKind::ServerError,
            RequestError::Network(_) => RequestErrorKind::NetworkError,
        }
    }
}

impl From<TransportError> for RequestError {
    fn from(err: TransportError) -> Self {
        RequestError::Network(err.to_string())
    }
}

/// Paths of the collaborator endpoints the session layer calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub session_login: String,
    pub token_issue: String,
    pub token_refresh: String,
    pub current_user: String,
    pub session_logout: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            session_login: "/auth/login/".to_string(),
            token_issue: "/api/token/".to_string(),
            token_refresh: "/api/token/refresh/".to_string(),
            current_user: "/api/users/me/".to_string(),
            session_logout: "/auth/logout/".to_string(),
        }
    }
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    async fn login(&self, credentials: Credentials) -> Result<Session, AuthError>;
    async fn authenticated_request(
        &self,
        endpoint: Endpoint,
        options: RequestOptions,
    ) -> Result<HttpResponse, RequestError>;
    /// Single-flight: concurrent callers share one refresh call.
    async fn refresh(&self) -> bool;
    async fn logout(&self);
    async fn load_current_user(&self) -> Result<Role, RequestError>;
    fn guard_access(&self, path: &str, requirement: Option<RoleRequirement>) -> GuardDecision;
    fn enforce_guard(&self, path: &str, requirement: Option<RoleRequirement>) -> GuardDecision;
    fn snapshot(&self) -> Session;
    fn is_authenticated(&self) -> bool;
    fn role(&self) -> Option<Role>;
    fn has_refresh_token(&self) -> bool;
}
