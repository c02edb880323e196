//! Helpers shared by the unit tests: an OCR service stand-in and a scripted camera.

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::post,
    Router,
};
use image::{Rgb, RgbImage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::camera::{AcquireError, Constraints, DeviceCamera, MediaStream, PermissionState};

/// One request received by the OCR stub.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub debug: Option<String>,
    pub bytes: usize,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: String,
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
}

/// A running OCR service stand-in answering every upload with a fixed reply.
pub struct OcrStub {
    pub base_url: String,
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
}

impl OcrStub {
    pub async fn spawn(status: u16, body: &str) -> Self {
        let uploads = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
            uploads: uploads.clone(),
        };
        let app = Router::new()
            .route("/extrair-valor/", post(extract))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            uploads,
        }
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

async fn extract(
    State(state): State<StubState>,
    Query(query): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let upload = RecordedUpload {
            field: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            debug: query.get("debug").cloned(),
            bytes: field.bytes().await.unwrap().len(),
        };
        state.uploads.lock().unwrap().push(upload);
    }
    (state.status, state.body.clone())
}

/// Camera double with scripted faults that records every acquisition.
pub struct ScriptedCamera {
    pub supported: bool,
    pub permission: PermissionState,
    pub fail_preferred: Option<AcquireError>,
    pub fail_minimal: Option<AcquireError>,
    pub fail_preview: bool,
    pub frame_size: (u32, u32),
    pub attempts: Mutex<Vec<Constraints>>,
    pub live: Arc<AtomicBool>,
}

impl Default for ScriptedCamera {
    fn default() -> Self {
        Self {
            supported: true,
            permission: PermissionState::Granted,
            fail_preferred: None,
            fail_minimal: None,
            fail_preview: false,
            frame_size: (640, 480),
            attempts: Mutex::new(Vec::new()),
            live: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ScriptedCamera {
    pub fn attempts(&self) -> Vec<Constraints> {
        self.attempts.lock().unwrap().clone()
    }

    /// Whether a stream handed out by this camera is still running.
    pub fn stream_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DeviceCamera for ScriptedCamera {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn query_permission(&self) -> Result<PermissionState, AcquireError> {
        Ok(self.permission)
    }

    async fn acquire_stream(
        &self,
        constraints: &Constraints,
    ) -> Result<Box<dyn MediaStream>, AcquireError> {
        self.attempts.lock().unwrap().push(constraints.clone());
        let fault = match constraints {
            Constraints::Preferred { .. } => self.fail_preferred.clone(),
            Constraints::Minimal => self.fail_minimal.clone(),
        };
        if let Some(fault) = fault {
            return Err(fault);
        }
        self.live.store(true, Ordering::SeqCst);
        Ok(Box::new(ScriptedStream {
            size: self.frame_size,
            fail_preview: self.fail_preview,
            live: self.live.clone(),
        }))
    }
}

struct ScriptedStream {
    size: (u32, u32),
    fail_preview: bool,
    live: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl MediaStream for ScriptedStream {
    async fn wait_ready(&mut self) -> anyhow::Result<()> {
        if self.fail_preview {
            anyhow::bail!("play() rejected");
        }
        Ok(())
    }

    fn frame_dimensions(&self) -> (u32, u32) {
        self.size
    }

    fn grab_frame(&self) -> anyhow::Result<RgbImage> {
        let (w, h) = self.size;
        Ok(RgbImage::from_pixel(w, h, Rgb([200, 200, 190])))
    }

    fn stop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}
