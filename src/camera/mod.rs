//! Camera capability abstraction.
//!
//! Defines the [`DeviceCamera`] and [`MediaStream`] traits so the capture
//! controller can drive any media-capture backend (the bundled
//! [`still::StillCamera`], a hardware device, a test double).

pub mod still;

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;

/// Camera permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
    /// No camera capability on this platform.
    Unsupported,
}

/// Which way the camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera, pointing away from the user.
    Environment,
    User,
}

impl FacingMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "environment" | "rear" | "back" => Some(Self::Environment),
            "user" | "front" => Some(Self::User),
            _ => None,
        }
    }
}

/// Requested stream configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraints {
    /// Ideal resolution and facing; devices may deliver something close.
    Preferred {
        width: u32,
        height: u32,
        facing: FacingMode,
    },
    /// Any video stream the device can produce.
    Minimal,
}

impl Constraints {
    pub fn preferred() -> Self {
        Self::Preferred {
            width: 1280,
            height: 720,
            facing: FacingMode::Environment,
        }
    }
}

/// Faults a platform raises when a stream cannot be acquired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("camera access not allowed")]
    NotAllowed,
    #[error("no camera device found")]
    NotFound,
    #[error("camera device not readable")]
    NotReadable,
    #[error("constraints cannot be satisfied")]
    Overconstrained,
    #[error("invalid stream request")]
    TypeError,
    #[error("{0}")]
    Other(String),
}

/// A live stream held by the controller.
#[async_trait::async_trait]
pub trait MediaStream: Send {
    /// Resolves once the preview is ready to play.
    async fn wait_ready(&mut self) -> anyhow::Result<()>;

    /// Dimensions of the latest frame, `(0, 0)` before the first frame.
    fn frame_dimensions(&self) -> (u32, u32);

    /// Current frame at its native dimensions.
    fn grab_frame(&self) -> anyhow::Result<RgbImage>;

    /// Stops every track. Idempotent.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

#[async_trait::async_trait]
pub trait DeviceCamera: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the platform exposes a camera capability at all.
    fn is_supported(&self) -> bool;

    async fn query_permission(&self) -> Result<PermissionState, AcquireError>;

    async fn acquire_stream(
        &self,
        constraints: &Constraints,
    ) -> Result<Box<dyn MediaStream>, AcquireError>;
}
