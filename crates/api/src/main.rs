use anyhow::Context;
use clap::Parser;

use printshop_api::config::{ApiConfig, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ApiConfig::load(&args).context("failed to load configuration")?;

    printshop_observability::tracing::init(&config.logging());

    if args.validate {
        tracing::info!("configuration is valid");
        return Ok(());
    }

    if config.uses_dev_secret() {
        tracing::warn!("jwt_secret not set; using insecure dev default");
    }

    let app = printshop_api::app::build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
