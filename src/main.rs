//! Receipt Scanner - capture a receipt photo, review it and extract its total via OCR.

mod camera;
mod capture;
mod config;
mod controller;
mod data_url;
mod error;
mod ocr;
mod receipt;
mod session;
#[cfg(test)]
mod test_support;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use camera::still::StillCamera;
use camera::DeviceCamera;
use capture::JPEG_MIME;
use config::ScannerConfig;
use controller::CaptureController;
use error::ScanError;
use ocr::http::HttpOcrService;
use session::SessionView;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    controller: Arc<CaptureController>,
    camera: Arc<StillCamera>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "receipt_scanner=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ScannerConfig::from_env()?;
    info!(
        "JPEG quality: {} | camera: {:?}",
        config.jpeg_quality, config.camera
    );

    let camera = Arc::new(StillCamera::new(config.camera.clone()));
    let ocr = Arc::new(HttpOcrService::new(
        &config.ocr_service_url,
        reqwest::Client::new(),
    ));
    info!("OCR endpoint: {}", ocr.endpoint());
    let controller = Arc::new(CaptureController::new(
        camera.clone(),
        ocr,
        config.jpeg_quality,
    ));

    let app = router(AppState {
        controller: controller.clone(),
        camera,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    controller.teardown();
    info!("Camera released, shutting down");
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(get_session))
        .route("/camera/start", post(start_camera))
        .route("/camera/stop", post(stop_camera))
        .route("/camera/scene", post(upload_scene))
        .route("/camera/status", get(camera_status))
        .route("/photo", get(get_photo).post(take_photo))
        .route("/process", post(process_image))
        .route("/retake", post(retake))
        .route("/reset", post(reset))
        .route("/error", delete(dismiss_error))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

// ============================================================================
// Handlers
// ============================================================================

type ActionResponse = (StatusCode, Json<SessionView>);

/// 200 on success, 422 when the action put an error on the overlay,
/// 409 when the action is not available right now.
fn respond(controller: &CaptureController, outcome: Result<(), ScanError>) -> ActionResponse {
    let status = match &outcome {
        Ok(()) => StatusCode::OK,
        Err(err) if err.is_overlay() => StatusCode::UNPROCESSABLE_ENTITY,
        Err(err) => {
            warn!("{}", err);
            StatusCode::CONFLICT
        }
    };
    (status, Json(controller.snapshot()))
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.controller.snapshot())
}

async fn start_camera(State(state): State<AppState>) -> ActionResponse {
    let outcome = state.controller.start_camera().await;
    respond(&state.controller, outcome)
}

async fn stop_camera(State(state): State<AppState>) -> ActionResponse {
    let outcome = state.controller.stop_camera();
    respond(&state.controller, outcome)
}

async fn take_photo(State(state): State<AppState>) -> ActionResponse {
    let outcome = state.controller.take_photo();
    respond(&state.controller, outcome)
}

/// The captured photo, for the review screen.
async fn get_photo(State(state): State<AppState>) -> Response {
    match state.controller.photo_jpeg() {
        Some(jpeg) => ([(header::CONTENT_TYPE, JPEG_MIME)], jpeg).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn process_image(State(state): State<AppState>) -> ActionResponse {
    let outcome = state.controller.process_image().await;
    respond(&state.controller, outcome)
}

async fn retake(State(state): State<AppState>) -> ActionResponse {
    let outcome = state.controller.retake().await;
    respond(&state.controller, outcome)
}

async fn reset(State(state): State<AppState>) -> ActionResponse {
    let outcome = state.controller.reset();
    respond(&state.controller, outcome)
}

async fn dismiss_error(State(state): State<AppState>) -> Json<SessionView> {
    state.controller.dismiss_error();
    Json(state.controller.snapshot())
}

#[derive(serde::Serialize)]
struct CameraStatus {
    device: String,
    running: bool,
    device_open: bool,
    permission: Option<camera::PermissionState>,
}

/// Camera diagnostics: stream state as the controller and the device see it.
async fn camera_status(State(state): State<AppState>) -> Json<CameraStatus> {
    Json(CameraStatus {
        device: state.camera.name().to_string(),
        running: state.controller.camera_running(),
        device_open: state.camera.is_open(),
        permission: state.controller.snapshot().permission,
    })
}

#[derive(serde::Serialize)]
struct SceneInfo {
    width: u32,
    height: u32,
}

/// Point the camera at a new scene (multipart field `file`).
async fn upload_scene(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SceneInfo>, (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e)))?;
            let (width, height) = state
                .camera
                .load_scene(&data)
                .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, format!("{:#}", e)))?;
            return Ok(Json(SceneInfo { width, height }));
        }
    }

    Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()))
}
