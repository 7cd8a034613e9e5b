use crate::domain_model::RedirectTarget;
use crate::domain_port::Navigator;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<RedirectTarget>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<RedirectTarget> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, target: RedirectTarget) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target);
    }
}
