use std::sync::Arc;

use anyhow::Context;

use cadence_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cadence_observability::init();

    let config = AppConfig::from_env()?;
    let services = cadence_api::app::build_services(&config).await?;
    tracing::info!(
        scheduler = services.runner.scheduler_name(),
        "services ready"
    );

    let app = cadence_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
