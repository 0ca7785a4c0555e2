use anyhow::Result;
use packwise_api::{build_app, AppConfig};
use packwise_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("packwise_api");

    let config = AppConfig::from_env();
    let bind = config.bind.clone();
    let app = build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "packwise reminder api started");

    axum::serve(listener, app).await?;
    Ok(())
}
