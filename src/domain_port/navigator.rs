use crate::domain_model::RedirectTarget;

/// Receives view-level redirects decided by the session layer.
pub trait Navigator: Send + Sync {
    fn redirect(&self, target: RedirectTarget);
}
