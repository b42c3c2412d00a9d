use anyhow::Context;
use tracing::info;

use movie_booking::{
    config::Config, database::Database, seed::seed_catalog, services::auth::ensure_admin_user, telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;
    telemetry::init(&config.app.rust_log, config.app.log_format);

    let db = Database::new(&config.database.url, config.database.pool_size).await?;
    db.run_migrations().await?;

    ensure_admin_user(&db.pool, &config.admin, config.security.bcrypt_cost)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bootstrap admin user: {e}"))?;

    let summary = seed_catalog(&db.pool).await.context("seeding the catalog failed")?;
    info!(?summary, "seed finished");
    Ok(())
}
