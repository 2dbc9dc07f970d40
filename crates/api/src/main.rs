use anyhow::Context;

use warden_infra::AppConfig;
use warden_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_observability::init(LogFormat::from_env());

    let config = AppConfig::from_env().context("loading configuration")?;
    tracing::info!(?config, "configuration loaded");

    let (services, gate) = warden_api::app::services::build_services(&config)
        .await
        .context("wiring services")?;
    let app = warden_api::app::build_app(services, gate);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received");
    }
}
