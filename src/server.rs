// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! HTTP API.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `POST /process_image` | Annotate an uploaded image and return its landmarks |
//! | `GET /health` | Liveness probe |
//! | `GET /info` | Loaded model summary |
//! | `GET /swagger-ui` | Interactive API docs (`/api-docs/openapi.json`) |
//!
//! The estimator is shared by all requests behind a single mutex; each request
//! runs the pipeline on the blocking thread pool.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::error::{AnnotatorError, Result};
use crate::format::PoseFormat;
use crate::inference::PoseConfig;
use crate::model::PoseEstimator;
use crate::pipeline::{ProcessResponse, process_image};
use crate::results::Landmark;

/// Default maximum request body size (20 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    estimator: Mutex<Box<dyn PoseEstimator>>,
    config: PoseConfig,
    format: PoseFormat,
    input_size: (usize, usize),
    body_limit: usize,
}

impl AppState {
    /// Wrap an estimator and the configuration used for every request.
    pub fn new<E: PoseEstimator + 'static>(estimator: E, config: PoseConfig) -> Self {
        Self {
            format: estimator.format(),
            input_size: estimator.input_size(),
            estimator: Mutex::new(Box::new(estimator)),
            config,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Set the maximum accepted request body size in bytes.
    #[must_use]
    pub const fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

/// Error body returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub detail: String,
}

/// An [`AnnotatorError`] rendered as an HTTP response.
///
/// Oversized bodies become 413, other request errors 422, everything else 500.
#[derive(Debug)]
pub struct ApiError(AnnotatorError);

impl From<AnnotatorError> for ApiError {
    fn from(err: AnnotatorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AnnotatorError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            err if err.is_request_error() => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, "rejected request");
        }
        (status, Json(ErrorResponse { detail: self.0.to_string() })).into_response()
    }
}

/// Body of `GET /health`.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Server status
    pub status: String,
    /// API version
    pub version: String,
}

/// Body of `GET /info`.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct InfoResponse {
    /// Landmark layout: `blazepose` or `coco`
    pub format: String,
    /// Number of landmarks per pose
    pub num_landmarks: usize,
    /// Whether landmarks carry a depth (`z`) estimate; `z` is 0 otherwise
    pub has_depth: bool,
    /// Model input size (height, width)
    pub input_size: (usize, usize),
    /// Encoding of the `image` field in responses
    pub image_encoding: String,
}

/// Multipart form accepted by `POST /process_image` (documentation only).
#[derive(ToSchema)]
#[allow(dead_code)]
struct ProcessImageForm {
    /// Encoded image file
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
    /// Skip drawing the skeleton. Default: false
    seen_all_keypoints: Option<bool>,
}

// OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pose Annotator",
        description = "Runs a pose model on an uploaded image, draws the skeleton and returns the annotated JPEG with its landmarks.",
        license(name = "AGPL-3.0", url = "https://github.com/ultralytics/inference/blob/main/LICENSE")
    ),
    paths(root, health, info, process_image_handler),
    components(schemas(
        Landmark,
        ProcessResponse,
        ProcessImageForm,
        ErrorResponse,
        HealthResponse,
        InfoResponse
    )),
    tags(
        (name = "pose", description = "Pose annotation endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.body_limit;
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/process_image", post(process_image_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns [`AnnotatorError::Io`] if the address cannot be bound or the server fails.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!("Server listening on {local}");
    tracing::info!("Swagger UI available at http://{local}/swagger-ui/");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Root endpoint
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Usage hint", body = String)
    )
)]
async fn root() -> &'static str {
    "Pose Annotator - POST /process_image with an image file. Swagger UI at /swagger-ui/"
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
    })
}

/// Model information endpoint
#[utoipa::path(
    get,
    path = "/info",
    tag = "pose",
    responses(
        (status = 200, description = "Model information", body = InfoResponse)
    )
)]
async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        format: state.format.to_string(),
        num_landmarks: state.format.num_landmarks(),
        has_depth: state.format.has_depth(),
        input_size: state.input_size,
        image_encoding: state.config.image_encoding.to_string(),
    })
}

/// Annotate an image
///
/// Runs pose estimation, draws the skeleton (green when every landmark is
/// visible, white otherwise) unless `seen_all_keypoints` is true, and returns
/// the JPEG with the landmarks.
#[utoipa::path(
    post,
    path = "/process_image",
    tag = "pose",
    request_body(content = ProcessImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image processed", body = ProcessResponse),
        (status = 413, description = "Request body larger than the configured limit", body = ErrorResponse),
        (status = 422, description = "Missing image or malformed form field", body = ErrorResponse),
        (status = 500, description = "Decode, inference or encode failure", body = ErrorResponse)
    )
)]
async fn process_image_handler(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<ProcessResponse>, ApiError> {
    let multipart = multipart.map_err(|e| AnnotatorError::Request(e.body_text()))?;
    let form = read_form(multipart).await?;

    let start = Instant::now();
    let size = form.image.len();
    let seen_all_keypoints = form.seen_all_keypoints;
    let worker_state = Arc::clone(&state);

    let processed = tokio::task::spawn_blocking(move || {
        let mut estimator = worker_state.estimator.blocking_lock();
        process_image(
            &mut **estimator,
            &form.image,
            form.seen_all_keypoints,
            &worker_state.config,
        )
    })
    .await
    .map_err(|e| AnnotatorError::Inference(format!("Processing task failed: {e}")))??;

    tracing::info!(
        bytes = size,
        width = processed.dimensions.0,
        height = processed.dimensions.1,
        landmarks = processed.keypoints.len(),
        all_keypoints_visible = processed.all_keypoints_visible,
        seen_all_keypoints,
        policy = processed.policy.as_str(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "POST /process_image"
    );

    Ok(Json(processed.into_response(state.config.image_encoding)))
}

struct ProcessForm {
    image: Vec<u8>,
    seen_all_keypoints: bool,
}

/// Collect the `image` and `seen_all_keypoints` fields; other fields are ignored.
async fn read_form(mut multipart: Multipart) -> Result<ProcessForm> {
    let mut image = None;
    let mut seen_all_keypoints = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| form_error("Malformed multipart body", &e))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| form_error("Failed to read field 'image'", &e))?;
                image = Some(data.to_vec());
            }
            Some("seen_all_keypoints") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| form_error("Failed to read field 'seen_all_keypoints'", &e))?;
                seen_all_keypoints = parse_form_bool(&text).ok_or_else(|| {
                    AnnotatorError::Request(format!(
                        "Field 'seen_all_keypoints' is not a valid boolean: {text:?}"
                    ))
                })?;
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| AnnotatorError::Request("Missing 'image' field".to_string()))?;
    Ok(ProcessForm { image, seen_all_keypoints })
}

fn form_error(context: &str, err: &MultipartError) -> AnnotatorError {
    let message = format!("{context}: {err}");
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AnnotatorError::PayloadTooLarge(message)
    } else {
        AnnotatorError::Request(message)
    }
}

/// Parse a form boolean. Case-insensitive; surrounding whitespace is ignored.
#[must_use]
pub fn parse_form_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}
