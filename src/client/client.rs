use crate::application_impl::*;
use crate::application_port::*;
use crate::client::LogNavigator;
use crate::domain_port::*;
use crate::infra_fake::*;
use crate::infra_http::*;
use crate::infra_store::*;
use crate::logger::*;
use crate::settings::Settings;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Client {
    pub session: Arc<dyn SessionService>,
    pub warehouse: Arc<dyn WarehouseService>,
    renew_interval: Duration,
    renewal_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Client {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let transport: Arc<dyn HttpTransport> = match settings.api.backend.as_str() {
            "fake" => Arc::new(FakeTransport::with_demo_routes()),
            "real" => Arc::new(ReqwestTransport::try_new(
                settings.api.base_url.clone(),
                settings.api.timeout(),
            )?),
            other => return Err(anyhow::anyhow!("Unknown api backend: {}", other)),
        };

        let store: Arc<dyn TokenStore> = match settings.storage.backend.as_str() {
            "memory" => Arc::new(MemoryTokenStore::new()),
            "file" => {
                let path = match &settings.storage.path {
                    Some(path) => PathBuf::from(path),
                    None => FileTokenStore::default_path()?,
                };
                debug!(path = %path.display(), "using file token store");
                Arc::new(FileTokenStore::new(path))
            }
            other => return Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        };

        let navigator: Arc<dyn Navigator> = Arc::new(LogNavigator::default());

        let session: Arc<dyn SessionService> = Arc::new(
            SessionManager::restore(
                transport,
                store,
                navigator,
                (&settings.api.endpoints).into(),
                settings.session.public_paths(),
            )
            .await?,
        );
        let warehouse: Arc<dyn WarehouseService> =
            Arc::new(RealWarehouseService::new(session.clone()));

        info!(backend = %settings.api.backend, "client started");

        Ok(Self {
            session,
            warehouse,
            renew_interval: settings.session.renew_interval(),
            renewal_handle: Mutex::new(None),
            cancel: CancellationToken::new(),
        })
    }

    /// Starts background token renewal. Calling it again is a no-op.
    pub fn start_renewal(&self) {
        let mut handle = self
            .renewal_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if handle.is_none() {
            *handle = Some(spawn_token_renewal(
                self.session.clone(),
                self.renew_interval,
                self.cancel.clone(),
            ));
        }
    }

    pub fn is_renewing(&self) -> bool {
        self.renewal_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub async fn shutdown(&self) {
        info!("client shutting down...");

        self.cancel.cancel();

        let handle = self
            .renewal_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let r = handle.await;
            info!("renewal handle dropped: {:?}", r);
        }
    }
}
