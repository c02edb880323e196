//! Capture controller.
//!
//! Owns the camera stream and the scan session and moves the session through
//! Idle → CameraActive → PhotoTaken → Processing → Result. Errors are recorded
//! as an overlay on the session; the phase is left where the user can recover.

use chrono::Local;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::camera::{Constraints, DeviceCamera, MediaStream, PermissionState};
use crate::capture::{self, CapturedImage};
use crate::error::ScanError;
use crate::ocr::OcrService;
use crate::receipt::ExtractedResult;
use crate::session::{Phase, Session, SessionView};

pub struct CaptureController {
    camera: Arc<dyn DeviceCamera>,
    ocr: Arc<dyn OcrService>,
    jpeg_quality: u8,
    session: Mutex<Session>,
    stream: Mutex<Option<Box<dyn MediaStream>>>,
    /// Held for the whole of a user action so actions never interleave.
    turn: tokio::sync::Mutex<()>,
}

impl CaptureController {
    pub fn new(camera: Arc<dyn DeviceCamera>, ocr: Arc<dyn OcrService>, jpeg_quality: u8) -> Self {
        let mut session = Session::new();
        if !camera.is_supported() {
            warn!("Camera '{}' reports no capture capability", camera.name());
            session.set_permission(PermissionState::Unsupported);
            session.set_error(&ScanError::UnsupportedPlatform);
        }

        Self {
            camera,
            ocr,
            jpeg_quality,
            session: Mutex::new(session),
            stream: Mutex::new(None),
            turn: tokio::sync::Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> SessionView {
        self.session().view()
    }

    /// JPEG bytes of the captured photo, for previewing it.
    pub fn photo_jpeg(&self) -> Option<Vec<u8>> {
        self.session()
            .captured()
            .and_then(|image| image.to_jpeg_bytes().ok())
    }

    pub fn camera_running(&self) -> bool {
        self.stream()
            .as_ref()
            .map_or(false, |stream| stream.is_active())
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    pub async fn start_camera(&self) -> Result<(), ScanError> {
        let _turn = self.begin("start_camera")?;
        self.expect_phase("start_camera", &[Phase::Idle])?;
        self.start_camera_inner().await
    }

    /// Release the camera without taking a photo.
    pub fn stop_camera(&self) -> Result<(), ScanError> {
        let _turn = self.begin("stop_camera")?;
        self.release_stream();
        self.session().leave_camera();
        Ok(())
    }

    pub fn take_photo(&self) -> Result<(), ScanError> {
        let _turn = self.begin("take_photo")?;
        self.expect_phase("take_photo", &[Phase::CameraActive])?;

        let outcome = self.capture_still().map(|image| {
            let (width, height) = image.dimensions();
            self.session().store_photo(image);
            self.release_stream();
            info!("Photo taken ({}x{})", width, height);
        });
        self.record(outcome)
    }

    pub async fn process_image(&self) -> Result<(), ScanError> {
        let _turn = self.begin("process_image")?;
        self.expect_phase("process_image", &[Phase::PhotoTaken])?;

        let payload = self.session().captured().map(CapturedImage::to_jpeg_bytes);
        let jpeg = match payload {
            Some(Ok(bytes)) => bytes,
            Some(Err(err)) => return self.record(Err(err)),
            None => return self.record(Err(ScanError::NoImage)),
        };

        let scan_id = {
            let mut session = self.session();
            session.clear_error();
            session.enter_processing();
            session.scan_id()
        };
        info!(
            %scan_id,
            "Processing receipt ({} bytes) via {}",
            jpeg.len(),
            self.ocr.name()
        );

        let processing = ProcessingGuard {
            session: &self.session,
        };
        let outcome = self.ocr.extract_total(jpeg).await.map(|response| {
            let result = ExtractedResult::from_response(response, Local::now().date_naive());
            info!(
                %scan_id,
                "Receipt processed: total={} establishment={}",
                result.total_amount,
                result.establishment_name
            );
            self.session().store_result(result);
        });
        drop(processing);

        self.record(outcome)
    }

    /// "Scan new receipt": back to Idle without starting the camera.
    pub fn reset(&self) -> Result<(), ScanError> {
        let _turn = self.begin("reset")?;
        self.release_stream();
        self.session().reset();
        info!("Session reset");
        Ok(())
    }

    /// "New photo": discard the photo and start the camera again.
    pub async fn retake(&self) -> Result<(), ScanError> {
        let _turn = self.begin("retake")?;
        self.expect_phase("retake", &[Phase::PhotoTaken])?;
        self.release_stream();
        self.session().reset();
        self.start_camera_inner().await
    }

    /// Clears the overlay. Nothing is retried.
    pub fn dismiss_error(&self) {
        self.session().clear_error();
    }

    /// Release the camera for good (server shutdown).
    pub fn teardown(&self) {
        self.release_stream();
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn start_camera_inner(&self) -> Result<(), ScanError> {
        self.session().clear_error();
        self.release_stream();
        let outcome = self.open_preview().await;
        self.record(outcome)
    }

    async fn open_preview(&self) -> Result<(), ScanError> {
        if !self.camera.is_supported() {
            self.session().set_permission(PermissionState::Unsupported);
            return Err(ScanError::UnsupportedPlatform);
        }

        let permission = self.camera.query_permission().await?;
        self.session().set_permission(permission);
        debug!("Camera permission: {:?}", permission);
        match permission {
            PermissionState::Denied => return Err(ScanError::PermissionBlocked),
            PermissionState::Unsupported => return Err(ScanError::UnsupportedPlatform),
            PermissionState::Granted | PermissionState::Prompt => {}
        }

        let mut stream = match self.camera.acquire_stream(&Constraints::preferred()).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(
                    "Preferred camera constraints failed ({}), retrying with minimal constraints",
                    err
                );
                self.camera.acquire_stream(&Constraints::Minimal).await?
            }
        };

        if let Err(e) = stream.wait_ready().await {
            error!("Camera preview failed to start: {:#}", e);
            stream.stop();
            return Err(ScanError::PreviewFailed);
        }

        let (width, height) = stream.frame_dimensions();
        *self.stream() = Some(stream);
        self.session().enter_camera_active();
        info!(
            "Camera '{}' started ({}x{})",
            self.camera.name(),
            width,
            height
        );
        Ok(())
    }

    fn capture_still(&self) -> Result<CapturedImage, ScanError> {
        let guard = self.stream();
        let stream = guard.as_deref().ok_or(ScanError::FrameNotReady)?;
        let frame = capture::render_frame(stream)?;
        CapturedImage::encode(&frame, self.jpeg_quality)
    }

    fn release_stream(&self) {
        let held = self.stream().take();
        if let Some(mut stream) = held {
            stream.stop();
            debug!("Camera stream released");
        }
    }

    /// Claim the action slot; fails while another action is running.
    fn begin(&self, action: &'static str) -> Result<tokio::sync::MutexGuard<'_, ()>, ScanError> {
        self.turn.try_lock().map_err(|_| {
            debug!("Rejected '{}': another action is running", action);
            ScanError::Busy { action }
        })
    }

    fn expect_phase(&self, action: &'static str, allowed: &[Phase]) -> Result<(), ScanError> {
        let phase = self.session().phase();
        if allowed.contains(&phase) {
            Ok(())
        } else {
            debug!("Rejected '{}' in phase {:?}", action, phase);
            Err(ScanError::InvalidAction { action, phase })
        }
    }

    /// Put a failed action's error on the overlay.
    fn record(&self, outcome: Result<(), ScanError>) -> Result<(), ScanError> {
        if let Err(err) = &outcome {
            if err.is_overlay() {
                warn!("{:?}: {}", err.kind(), err);
                self.session().set_error(err);
            }
        }
        outcome
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stream(&self) -> MutexGuard<'_, Option<Box<dyn MediaStream>>> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.release_stream();
    }
}

/// Ends the Processing phase when dropped, whether the upload finished,
/// failed or was cancelled.
struct ProcessingGuard<'a> {
    session: &'a Mutex<Session>,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.phase() == Phase::Processing {
            session.leave_processing();
            debug!("Processing ended without a result");
        }
    }
}
