use std::sync::Arc;

use ecosphere_server::api::server::{AppState, serve};
use ecosphere_server::config::Config;
use ecosphere_server::db::pg::PgStore;
use ecosphere_server::telemetry::Telemetry;

type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> Result<()> {
    _ = dotenvy::dotenv();

    let otel_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();
    let telemetry = Telemetry::init(otel_endpoint.as_deref())?;

    tracing::info!("starting ecosphere server");

    let config = Config::load();

    let store = PgStore::connect(&config.database_url).await?;
    store.migrate().await?;

    let state = Arc::new(AppState { store, config });
    serve(state).await?;

    if let Some(telemetry) = telemetry {
        telemetry.shutdown();
    }

    Ok(())
}
