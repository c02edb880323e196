//! File-backed camera device.
//!
//! The camera is "pointed at" a scene image: loaded from disk on the first
//! acquisition or replaced at runtime with [`StillCamera::load_scene`]. Every
//! frame of a stream is that scene, scaled to the stream's constraints.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use super::{AcquireError, Constraints, DeviceCamera, FacingMode, MediaStream, PermissionState};
use crate::config::StillCameraConfig;

type Scene = Arc<RwLock<Option<DynamicImage>>>;

pub struct StillCamera {
    config: StillCameraConfig,
    scene: Scene,
    /// Set while a stream is open; the device is exclusive.
    open: Arc<AtomicBool>,
}

impl StillCamera {
    pub fn new(config: StillCameraConfig) -> Self {
        Self {
            config,
            scene: Arc::new(RwLock::new(None)),
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the scene with an encoded image. Returns its dimensions.
    pub fn load_scene(&self, data: &[u8]) -> Result<(u32, u32)> {
        let image = image::load_from_memory(data).context("Scene is not a decodable image")?;
        let dims = (image.width(), image.height());
        self.set_scene(image);
        info!("StillCamera: scene replaced ({}x{})", dims.0, dims.1);
        Ok(dims)
    }

    pub fn set_scene(&self, image: DynamicImage) {
        *self.scene.write().unwrap_or_else(PoisonError::into_inner) = Some(image);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn has_scene(&self) -> bool {
        self.scene
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Load the configured scene file if nothing has been loaded yet.
    fn ensure_scene(&self) -> Result<(), AcquireError> {
        if self.has_scene() {
            return Ok(());
        }
        let Some(path) = &self.config.scene_path else {
            return Ok(());
        };
        if !path.exists() {
            return Err(AcquireError::NotFound);
        }
        let image = image::open(path)
            .map_err(|e| AcquireError::Other(format!("{}: {}", path.display(), e)))?;
        debug!(
            "StillCamera: loaded scene {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        self.set_scene(image);
        Ok(())
    }
}

#[async_trait::async_trait]
impl DeviceCamera for StillCamera {
    fn name(&self) -> &str {
        "still"
    }

    fn is_supported(&self) -> bool {
        self.config.enabled
    }

    async fn query_permission(&self) -> Result<PermissionState, AcquireError> {
        if !self.config.enabled {
            return Ok(PermissionState::Unsupported);
        }
        Ok(self.config.permission)
    }

    async fn acquire_stream(
        &self,
        constraints: &Constraints,
    ) -> Result<Box<dyn MediaStream>, AcquireError> {
        if !self.config.enabled {
            return Err(AcquireError::Other("camera capability unavailable".to_string()));
        }

        let allowed = match self.config.permission {
            PermissionState::Granted => true,
            PermissionState::Prompt => self.config.prompt_answer,
            PermissionState::Denied | PermissionState::Unsupported => false,
        };
        if !allowed {
            return Err(AcquireError::NotAllowed);
        }

        let bounds = match constraints {
            Constraints::Preferred {
                width,
                height,
                facing,
            } => {
                if *width == 0 || *height == 0 {
                    return Err(AcquireError::TypeError);
                }
                if *facing == FacingMode::Environment && self.config.facing == FacingMode::User {
                    return Err(AcquireError::Overconstrained);
                }
                Some((*width, *height))
            }
            Constraints::Minimal => None,
        };

        self.ensure_scene()?;

        if self.open.swap(true, Ordering::SeqCst) {
            return Err(AcquireError::NotReadable);
        }

        debug!("StillCamera: stream opened with {:?}", constraints);
        Ok(Box::new(StillStream {
            scene: self.scene.clone(),
            open: self.open.clone(),
            bounds,
            active: true,
        }))
    }
}

struct StillStream {
    scene: Scene,
    open: Arc<AtomicBool>,
    /// Frames are scaled down to fit these bounds, keeping aspect ratio.
    bounds: Option<(u32, u32)>,
    active: bool,
}

impl StillStream {
    fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        match self.bounds {
            Some((max_w, max_h)) => fit_within(width, height, max_w, max_h),
            None => (width, height),
        }
    }
}

#[async_trait::async_trait]
impl MediaStream for StillStream {
    async fn wait_ready(&mut self) -> Result<()> {
        if !self.active {
            anyhow::bail!("stream already stopped");
        }
        Ok(())
    }

    fn frame_dimensions(&self) -> (u32, u32) {
        if !self.active {
            return (0, 0);
        }
        let scene = self.scene.read().unwrap_or_else(PoisonError::into_inner);
        match scene.as_ref() {
            Some(image) => self.output_size(image.width(), image.height()),
            None => (0, 0),
        }
    }

    fn grab_frame(&self) -> Result<RgbImage> {
        if !self.active {
            anyhow::bail!("stream stopped");
        }
        let scene = self.scene.read().unwrap_or_else(PoisonError::into_inner);
        let image = scene.as_ref().context("no scene in front of the camera")?;
        let (width, height) = self.output_size(image.width(), image.height());
        if (width, height) == (image.width(), image.height()) {
            return Ok(image.to_rgb8());
        }
        Ok(image
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8())
    }

    fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.open.store(false, Ordering::SeqCst);
            debug!("StillCamera: stream stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for StillStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Largest size with the same aspect ratio that fits the bounds. Never upscales.
fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width <= max_w && height <= max_h {
        return (width, height);
    }
    let scale = f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}
