use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;

use storefront_auth::{
    auth::clock::SystemClock,
    config::AppConfig,
    db::connection,
    logging::init_tracing,
    routes::app,
    state::AppState,
};

const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!("server failed: {err:?}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env().context("failed to load config")?;
    init_tracing(&cfg.logging);

    let db_cfg = cfg
        .database
        .clone()
        .context("database config is required (APP_DATABASE__URL)")?;
    let db = connection::connect(&db_cfg).await?;

    let state = AppState::new(cfg, db, Arc::new(SystemClock))?;
    bootstrap(&state).await?;
    spawn_housekeeping(Arc::clone(&state));

    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.general.host, state.config.general.port
    )
    .parse()
    .context("invalid host/port")?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Runs before the listener opens: permission checks must never read a
/// half-replaced role -> permission mapping.
async fn bootstrap(state: &AppState) -> anyhow::Result<()> {
    state
        .services()
        .rbac()
        .initialize_rbac()
        .await
        .map_err(|err| anyhow::anyhow!("rbac initialization failed: {err}"))?;

    let purged = state
        .services()
        .sessions(&state.config.session)
        .purge_expired()
        .await
        .map_err(|err| anyhow::anyhow!("session purge failed: {err}"))?;
    tracing::info!(purged, "expired sessions removed");

    let admin = state
        .auth_service()
        .seed_admin(&state.auth)
        .await
        .map_err(|err| anyhow::anyhow!("admin seeding failed: {err}"))?;
    tracing::info!(user_id = %admin.id, "admin account ready");
    Ok(())
}

fn spawn_housekeeping(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let sessions = state.services().sessions(&state.config.session);
            match sessions.purge_expired().await {
                Ok(purged) => tracing::debug!(purged, "expired sessions removed"),
                Err(err) => tracing::warn!(error = %err.message(), "session purge failed"),
            }
            let pruned = state.rate_limiter.prune();
            tracing::debug!(pruned, "rate limit windows pruned");
        }
    });
}
