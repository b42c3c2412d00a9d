use anyhow::Context;
use std::net::SocketAddr;
use tracing::info;

use movie_booking::{config::Config, controllers, services::auth::ensure_admin_user, telemetry, AppState};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;

    telemetry::init(&config.app.rust_log, config.app.log_format);
    info!(environment = %config.app.environment, "Starting Movie Booking API");

    let state = AppState::new(config).await?;

    ensure_admin_user(&state.db.pool, &state.config.admin, state.config.security.bcrypt_cost)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bootstrap admin user: {e}"))?;

    state.cache.warmup_cache(&state.db.pool).await;

    let addr: SocketAddr = format!("{}:{}", state.config.app.host, state.config.app.port)
        .parse()
        .context("invalid HOST/PORT")?;
    let app = controllers::router(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
