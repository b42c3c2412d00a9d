use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use movie_booking::{
    config::PaymentConfig,
    controllers::payment::{payment_router, PaymentState},
    services::payment::StripeClient,
    telemetry,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = PaymentConfig::from_env().context("invalid payment configuration")?;

    telemetry::init(&config.rust_log, config.log_format);
    info!(currency = %config.intent_currency, amount = config.intent_amount, "Starting payment service");

    let stripe = StripeClient::from_config(&config).context("failed to build HTTP client")?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid PAYMENT_HOST/PAYMENT_PORT")?;
    let app = payment_router(Arc::new(PaymentState { stripe, config }));

    info!("Payment service listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
