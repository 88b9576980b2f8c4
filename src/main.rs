use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use cohort_core::{CohortService, CoreConfig};

/// Main entry point for the cohort service
///
/// Reads the source configuration once, builds the shared [`CohortService`] and serves the
/// REST API until the process is stopped.
///
/// # Environment Variables
/// - `COHORT_SOURCE_URL`: base URL of the FHIR server (default: "http://localhost:8080/fhir/")
/// - `COHORT_PAGE_SIZE`: records per page used for page counts (default: 50)
/// - `COHORT_FETCH_TIMEOUT_SECS`: timeout for each page fetch (default: 30)
/// - `COHORT_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cohort=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_env_values(
        std::env::var("COHORT_SOURCE_URL").ok(),
        std::env::var("COHORT_PAGE_SIZE").ok(),
        std::env::var("COHORT_FETCH_TIMEOUT_SECS").ok(),
    )?;
    let rest_addr = std::env::var("COHORT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("++ Source FHIR server {}", cfg.source_base_url());
    tracing::info!("++ Starting cohort REST on {}", rest_addr);

    // The blocking HTTP client owns a runtime of its own and must not be built on a worker thread.
    let cfg = Arc::new(cfg);
    let service = tokio::task::spawn_blocking(move || CohortService::with_http(cfg)).await??;

    let app = api_rest::router(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
