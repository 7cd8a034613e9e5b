use crate::application_port::SessionService;
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_RENEW_INTERVAL: Duration = Duration::from_secs(9 * 60);

/// Periodically renews the access token ahead of expiry. Failures are only
/// logged; the request path decides what a dead session means.
pub struct TokenRenewal {
    session: Arc<dyn SessionService>,
    every: Duration,
    cancellation_token: CancellationToken,
}

impl TokenRenewal {
    pub fn new(
        session: Arc<dyn SessionService>,
        every: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            session,
            every,
            cancellation_token,
        }
    }

    async fn tick_once(&self) {
        if !self.session.has_refresh_token() {
            trace!("no refresh token, renewal skipped");
            return;
        }
        if self.session.refresh().await {
            debug!("background token renewal succeeded");
        } else {
            warn!("background token renewal failed");
        }
    }

    pub async fn run(&self) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.every, self.every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    info!("token renewal shutting down...");
                    break;
                }
                _ = interval.tick() => self.tick_once().await,
            }
        }
    }
}

pub fn spawn_token_renewal(
    session: Arc<dyn SessionService>,
    every: Duration,
    cancellation_token: CancellationToken,
) -> JoinHandle<()> {
    let renewal = TokenRenewal::new(session, every, cancellation_token);
    tokio::spawn(async move { renewal.run().await })
}
