use anyhow::Result;
use axum::Router;
use grid_load_forecaster::{api, app::AppState, config::Config, telemetry};
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;

    if cfg.auth.cron_secret.is_empty() || cfg.auth.cron_secret.starts_with("__SET_VIA_ENV") {
        anyhow::bail!(
            "SECURITY ERROR: GLF__AUTH__CRON_SECRET must be set to a secure random secret (min 32 chars). \
            Generate one with: openssl rand -base64 32"
        );
    }

    if cfg.epias.username.is_empty() || cfg.epias.password.is_empty() {
        warn!("EPIAS credentials are not set - consumption sync will fail until they are");
    }

    let state = AppState::new(cfg.clone()).await?;
    let app: Router = api::router(state, &cfg);

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!(
            "WARNING: Server binding to 0.0.0.0 - service will be accessible from network! \
            For production, bind to 127.0.0.1 unless behind a firewall/reverse proxy."
        );
    }

    info!(%addr, "starting grid load forecaster");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
