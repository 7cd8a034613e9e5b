/// Drives the client against the in-process fake API: logs in, lets the
/// access token go stale, then fires concurrent requests that share one
/// token refresh.
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use warehouse_client::application_impl::*;
use warehouse_client::application_port::*;
use warehouse_client::domain_model::*;
use warehouse_client::domain_port::*;
use warehouse_client::infra_fake::*;
use warehouse_client::infra_store::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::new("infra_demo=debug,warehouse_client=debug");

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let transport = Arc::new(FakeTransport::with_demo_routes());
    let store = Arc::new(MemoryTokenStore::with_tokens(StoredTokens {
        access_token: Some("stale".to_string()),
        refresh_token: Some("fake-refresh-token:admin".to_string()),
    }));
    let session: Arc<dyn SessionService> = Arc::new(
        SessionManager::restore(
            transport.clone(),
            store.clone(),
            Arc::new(RecordingNavigator::new()),
            AuthEndpoints::default(),
            PublicPaths::default(),
        )
        .await?,
    );
    let warehouse = RealWarehouseService::new(session.clone());

    let results = join_all((0..5).map(|_| warehouse.list_equipment())).await;
    for r in &results {
        tracing::info!(ok = r.is_ok(), "list_equipment");
    }
    tracing::info!(
        refreshes = transport.count(Method::Post, "/api/token/refresh/"),
        "concurrent requests done"
    );

    let cancel = CancellationToken::new();
    let renewal = spawn_token_renewal(session.clone(), Duration::from_millis(200), cancel.clone());
    tokio::time::sleep(Duration::from_millis(650)).await;
    cancel.cancel();
    renewal.await?;
    tracing::info!(
        refreshes = transport.count(Method::Post, "/api/token/refresh/"),
        stored = ?store.load().await?,
        "renewal stopped"
    );

    session.logout().await;
    tracing::info!(authenticated = session.snapshot().is_authenticated(), "logged out");

    Ok(())
}
