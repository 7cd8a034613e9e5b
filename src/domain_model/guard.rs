use super::{Role, RoleRequirement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectToLogin,
    RedirectHome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    Login,
    Home,
}

impl GuardDecision {
    pub fn redirect_target(self) -> Option<RedirectTarget> {
        match self {
            GuardDecision::Allow => None,
            GuardDecision::RedirectToLogin => Some(RedirectTarget::Login),
            GuardDecision::RedirectHome => Some(RedirectTarget::Home),
        }
    }
}

pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/login/", "/403/", "/404/", "/500/", "/501/", "/503/", "/errors/",
];

/// View paths reachable without a token, matched by prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPaths {
    prefixes: Vec<String>,
}

impl PublicPaths {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

impl Default for PublicPaths {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_PATHS.iter().copied())
    }
}

pub fn guard_access(
    public_paths: &PublicPaths,
    path: &str,
    has_token: bool,
    role: Option<Role>,
    requirement: Option<RoleRequirement>,
) -> GuardDecision {
    if !has_token {
        return if public_paths.contains(path) {
            GuardDecision::Allow
        } else {
            GuardDecision::RedirectToLogin
        };
    }
    match requirement {
        Some(req) if !req.is_satisfied_by(role) => GuardDecision::RedirectHome,
        _ => GuardDecision::Allow,
    }
}
