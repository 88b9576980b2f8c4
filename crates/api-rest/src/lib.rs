//! # API REST
//!
//! REST API implementation for the cohort service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - mapping core failures to status codes (`NotFound` → 404, `Fault` → 500)
//!
//! Core operations are synchronous and may perform a long forward walk over the remote source,
//! so every handler runs them on the blocking thread pool.

#![warn(rust_2018_idioms)]

mod summary;

use api_shared::{
    CreateResultReq, CreateResultRes, ErrorRes, HealthRes, HealthService, OpenQueryReq,
    ResultStatsRes, SubjectTreeRes,
};
use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use cohort_core::{CohortResult, CohortService, Failure, FailureKind, ResultId};
use fhir::Bundle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use summary::summarise_subjects;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<CohortService>,
}

impl AppState {
    pub fn new(service: CohortService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorRes>);

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_result,
        open_query,
        result_stats,
        get_page,
        page_subjects,
    ),
    components(schemas(
        HealthRes,
        CreateResultReq,
        CreateResultRes,
        OpenQueryReq,
        ResultStatsRes,
        SubjectTreeRes,
        api_shared::SubjectSummary,
        api_shared::ConditionSummary,
        ErrorRes,
    ))
)]
pub struct ApiDoc;

/// Build the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/results", post(create_result))
        .route("/queries", post(open_query))
        .route("/results/:id", get(result_stats))
        .route("/results/:id/pages/:page", get(get_page))
        .route("/results/:id/pages/:page/subjects", get(page_subjects))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Failure mapping
// ============================================================================

fn failure_response(failure: Failure) -> ApiError {
    match failure.kind() {
        FailureKind::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorRes {
                error: failure.message().to_string(),
            }),
        ),
        FailureKind::Fault => {
            tracing::error!("Cohort fault: {}", failure);
            internal_error()
        }
    }
}

fn internal_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorRes {
            error: "Internal error".into(),
        }),
    )
}

/// Malformed ids cannot name an existing result, so they are reported as missing.
fn parse_result_id(id: &str) -> Result<ResultId, ApiError> {
    ResultId::parse(id).map_err(|_| {
        failure_response(Failure::not_found(format!("result {id} does not exist")))
    })
}

async fn run_blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> CohortResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(result) => result.map_err(failure_response),
        Err(e) => {
            tracing::error!("Blocking task failed: {:?}", e);
            Err(internal_error())
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/results",
    request_body = CreateResultReq,
    responses(
        (status = 201, description = "Result registered", body = CreateResultRes),
        (status = 404, description = "First page has no self address", body = ErrorRes)
    )
)]
/// Register a cohort result from the facts of its first page.
///
/// Seeds page 0 with `selfAddress` and, when given, page 1 with `nextAddress`.
///
/// # Errors
/// Returns `404 Not Found` if `selfAddress` is missing.
#[axum::debug_handler]
async fn create_result(
    State(state): State<AppState>,
    Json(req): Json<CreateResultReq>,
) -> Result<(StatusCode, Json<CreateResultRes>), ApiError> {
    let id = state
        .service
        .create_result(
            req.total,
            req.self_address.as_deref(),
            req.next_address.as_deref(),
        )
        .map_err(failure_response)?;
    Ok((StatusCode::CREATED, Json(CreateResultRes { id })))
}

#[utoipa::path(
    post,
    path = "/queries",
    request_body = OpenQueryReq,
    responses(
        (status = 201, description = "Query run and result registered", body = CreateResultRes),
        (status = 404, description = "First page has no self address", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Run a search against the source and register its first page.
///
/// # Errors
/// Returns `404 Not Found` if the first page does not identify itself, and
/// `500 Internal Server Error` if the source cannot be reached or answers with garbage.
#[axum::debug_handler]
async fn open_query(
    State(state): State<AppState>,
    Json(req): Json<OpenQueryReq>,
) -> Result<(StatusCode, Json<CreateResultRes>), ApiError> {
    let service = Arc::clone(&state.service);
    let id = run_blocking(move || service.open_query(&req.query)).await?;
    Ok((StatusCode::CREATED, Json(CreateResultRes { id })))
}

#[utoipa::path(
    get,
    path = "/results/{id}",
    params(("id" = String, Path, description = "Result id")),
    responses(
        (status = 200, description = "Result size", body = ResultStatsRes),
        (status = 404, description = "Unknown result", body = ErrorRes)
    )
)]
/// Total size and page count of a result.
#[axum::debug_handler]
async fn result_stats(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<ResultStatsRes>, ApiError> {
    let id = parse_result_id(&id)?;
    let stats = state.service.result_stats(&id).map_err(failure_response)?;
    Ok(Json(ResultStatsRes {
        total_size: stats.total_size,
        number_of_pages: stats.number_of_pages,
    }))
}

#[utoipa::path(
    get,
    path = "/results/{id}/pages/{page}",
    params(
        ("id" = String, Path, description = "Result id"),
        ("page" = usize, Path, description = "Zero-based page number")
    ),
    responses(
        (status = 200, description = "Searchset Bundle for the page"),
        (status = 404, description = "Unknown result or page past the end", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Fetch one page of a result as a searchset Bundle.
///
/// Pages beyond the furthest one seen so far are reached by walking the source's next links.
#[axum::debug_handler]
async fn get_page(
    State(state): State<AppState>,
    AxumPath((id, page)): AxumPath<(String, usize)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_result_id(&id)?;
    let service = Arc::clone(&state.service);
    let bundle = run_blocking(move || service.page(&id, page)).await?;
    Ok(Json(Bundle::render(&bundle)))
}

#[utoipa::path(
    get,
    path = "/results/{id}/pages/{page}/subjects",
    params(
        ("id" = String, Path, description = "Result id"),
        ("page" = usize, Path, description = "Zero-based page number")
    ),
    responses(
        (status = 200, description = "Subjects on the page", body = SubjectTreeRes),
        (status = 404, description = "Unknown result or page past the end", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Fetch one page and return its records grouped per subject.
#[axum::debug_handler]
async fn page_subjects(
    State(state): State<AppState>,
    AxumPath((id, page)): AxumPath<(String, usize)>,
) -> Result<Json<SubjectTreeRes>, ApiError> {
    let id = parse_result_id(&id)?;
    let service = Arc::clone(&state.service);
    let tree = run_blocking(move || service.page_tree(&id, page)).await?;
    Ok(Json(SubjectTreeRes {
        result_id: id,
        page,
        records: tree.index().len(),
        subjects: summarise_subjects(&tree),
    }))
}
