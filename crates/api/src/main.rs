use std::sync::Arc;

use anyhow::Context as _;

use civicdesk_api::app::{build_app, AppServices};
use civicdesk_infra::config::AppConfig;
use civicdesk_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let log_format: LogFormat = config.log_format.parse()?;
    civicdesk_observability::init(log_format);

    let services = Arc::new(AppServices::from_config(&config)?);
    let _maintenance = services.spawn_maintenance(config.jobs.clone());

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
