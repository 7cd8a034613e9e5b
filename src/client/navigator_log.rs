use crate::domain_model::RedirectTarget;
use crate::domain_port::Navigator;
use crate::logger::*;

/// Navigator for headless use: redirects become log lines naming the view.
pub struct LogNavigator {
    login_path: String,
    home_path: String,
}

impl LogNavigator {
    pub fn new(login_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            home_path: home_path.into(),
        }
    }

    pub fn path_for(&self, target: RedirectTarget) -> &str {
        match target {
            RedirectTarget::Login => &self.login_path,
            RedirectTarget::Home => &self.home_path,
        }
    }
}

impl Default for LogNavigator {
    fn default() -> Self {
        Self::new("/login/", "/")
    }
}

impl Navigator for LogNavigator {
    fn redirect(&self, target: RedirectTarget) {
        info!(to = %self.path_for(target), "redirect");
    }
}
