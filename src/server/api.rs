//! HTTP API server implementation

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::core::config::ServiceConfig;
use crate::core::errors::TranslationError;
use crate::core::models::{DeviceKind, TranslationRequest, TranslationResponse};
use crate::core::pipeline::TranslationPipeline;
use crate::core::pool::WorkerPool;
use crate::core::registry::ModelRegistry;

/// Page served when the static directory has no `index.html`
const FALLBACK_INDEX: &str = include_str!("../../static/index.html");

/// Application state
#[derive(Clone)]
pub struct AppState {
    registry: Arc<ModelRegistry>,
    pipeline: Arc<TranslationPipeline>,
    config: Arc<ServiceConfig>,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServiceConfig, registry: ModelRegistry, pipeline: TranslationPipeline) -> Self {
        Self {
            registry: Arc::new(registry),
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
            started_at: Utc::now(),
        }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
    started_at: DateTime<Utc>,
    devices: Vec<DeviceKind>,
    workers: usize,
    idle_workers: usize,
    jobs_submitted: u64,
}

/// Models list response
#[derive(Serialize)]
struct ModelsResponse {
    object: String,
    data: Vec<ModelInfo>,
}

#[derive(Serialize)]
struct ModelInfo {
    id: String,
    object: String,
    direction: String,
    device: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failure on its way to the client
pub enum ApiError {
    /// The request body could not be read as a translation request
    Malformed(JsonRejection),
    Translation(TranslationError),
}

impl From<TranslationError> for ApiError {
    fn from(err: TranslationError) -> Self {
        ApiError::Translation(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::Translation(err) => match err {
                TranslationError::InvalidDirection { .. } => StatusCode::BAD_REQUEST,
                TranslationError::DeviceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                TranslationError::TimeoutError { .. } => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Malformed(rejection) => format!("Invalid request: {}", rejection.body_text()),
            ApiError::Translation(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Translation request failed");
        } else {
            debug!(status = status.as_u16(), error = %message, "Translation request rejected");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Index page handler
async fn index(State(state): State<AppState>) -> Html<String> {
    let path = state.config.server.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Serving built-in index page");
            Html(FALLBACK_INDEX.to_string())
        }
    }
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let pool = state.pipeline.pool();
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: state.started_at,
        devices: state.registry.devices(),
        workers: pool.capacity(),
        idle_workers: pool.idle_workers(),
        jobs_submitted: pool.submitted(),
    })
}

/// Get models handler
async fn get_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let data = state
        .registry
        .units()
        .map(|unit| ModelInfo {
            id: unit.direction().model_id().to_string(),
            object: "model".to_string(),
            direction: unit.direction().to_string(),
            device: unit.device().to_string(),
        })
        .collect();

    Json(ModelsResponse {
        object: "list".to_string(),
        data,
    })
}

async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<TranslationRequest>, JsonRejection>,
) -> Result<Json<TranslationResponse>, ApiError> {
    let Json(payload) = payload?;
    let device = state.config.server.default_device;
    translate_on(&state, device, payload).await
}

async fn translate_cpu(
    State(state): State<AppState>,
    payload: Result<Json<TranslationRequest>, JsonRejection>,
) -> Result<Json<TranslationResponse>, ApiError> {
    let Json(payload) = payload?;
    translate_on(&state, DeviceKind::Cpu, payload).await
}

async fn translate_gpu(
    State(state): State<AppState>,
    payload: Result<Json<TranslationRequest>, JsonRejection>,
) -> Result<Json<TranslationResponse>, ApiError> {
    let Json(payload) = payload?;
    translate_on(&state, DeviceKind::Gpu, payload).await
}

/// Validate, pick the unit for `device` and run the pipeline
async fn translate_on(
    state: &AppState,
    device: DeviceKind,
    payload: TranslationRequest,
) -> Result<Json<TranslationResponse>, ApiError> {
    let direction = payload.direction()?;
    let unit = state.registry.lookup(device, direction)?;

    debug!(%device, %direction, chars = payload.text.chars().count(), "Translation request");
    let translation = state.pipeline.translate_text(&payload.text, unit).await?;

    Ok(Json(TranslationResponse { translation }))
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/v1/models", get(get_models))
        .route("/translate", post(translate))
        .route("/translate-cpu", post(translate_cpu))
        .route("/translate-gpu", post(translate_gpu))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: ServiceConfig, registry: ModelRegistry) -> anyhow::Result<()> {
    let mut pipeline = TranslationPipeline::new(WorkerPool::new(config.pipeline.max_workers));
    if let Some(timeout) = config.pipeline.timeout() {
        pipeline = pipeline.with_timeout(timeout);
    }

    // Bind address
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState::new(config, registry, pipeline);
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
