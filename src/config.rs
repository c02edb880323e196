//! Scanner configuration.
//!
//! Everything is read from the environment (a `.env` file is loaded first by
//! `main`). Every variable has a default so the server starts with no setup.

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::camera::{FacingMode, PermissionState};

const DEFAULT_OCR_SERVICE_URL: &str = "http://lagoinhasm-ocrrr.qwyqnc.easypanel.host";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Base URL of the OCR service; the extraction path is appended to it.
    pub ocr_service_url: String,
    pub bind_addr: SocketAddr,
    /// JPEG quality for captured stills, 1-100.
    pub jpeg_quality: u8,
    pub camera: StillCameraConfig,
}

/// Settings of the file-backed camera device.
#[derive(Debug, Clone, PartialEq)]
pub struct StillCameraConfig {
    /// When false the camera capability is reported as absent.
    pub enabled: bool,
    pub permission: PermissionState,
    /// How a `prompt` permission is answered when a stream is requested.
    pub prompt_answer: bool,
    pub facing: FacingMode,
    /// Image the camera is pointed at on start-up.
    pub scene_path: Option<PathBuf>,
}

impl Default for StillCameraConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            permission: PermissionState::Granted,
            prompt_answer: true,
            facing: FacingMode::Environment,
            scene_path: None,
        }
    }
}

impl ScannerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let ocr_service_url = lookup("OCR_SERVICE_URL")
            .unwrap_or_else(|| DEFAULT_OCR_SERVICE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        let jpeg_quality = match lookup("JPEG_QUALITY") {
            Some(raw) => parse_quality(&raw)?,
            None => DEFAULT_JPEG_QUALITY,
        };

        let defaults = StillCameraConfig::default();
        let camera = StillCameraConfig {
            enabled: match lookup("CAMERA_ENABLED") {
                Some(raw) => parse_bool("CAMERA_ENABLED", &raw)?,
                None => defaults.enabled,
            },
            permission: match lookup("CAMERA_PERMISSION") {
                Some(raw) => parse_permission(&raw)?,
                None => defaults.permission,
            },
            prompt_answer: match lookup("CAMERA_PROMPT_ANSWER") {
                Some(raw) => parse_bool("CAMERA_PROMPT_ANSWER", &raw)?,
                None => defaults.prompt_answer,
            },
            facing: match lookup("CAMERA_FACING") {
                Some(raw) => FacingMode::parse(&raw)
                    .with_context(|| format!("Unknown CAMERA_FACING: {}", raw))?,
                None => defaults.facing,
            },
            scene_path: lookup("CAMERA_SCENE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        };

        Ok(Self {
            ocr_service_url,
            bind_addr,
            jpeg_quality,
            camera,
        })
    }
}

/// Accepts a decimal fraction up to 1 (`0.8` → 80, `1.0` → 100) or a
/// percentage above 1 up to 100.
fn parse_quality(raw: &str) -> Result<u8> {
    let raw = raw.trim();
    let value: f64 = raw
        .parse()
        .with_context(|| format!("JPEG_QUALITY is not a number: {}", raw))?;
    let percent = if value <= 1.0 { value * 100.0 } else { value };
    if !(1.0..=100.0).contains(&percent) {
        bail!("JPEG_QUALITY out of range: {}", raw);
    }
    Ok(percent.round() as u8)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("{} is not a boolean: {}", key, raw),
    }
}

fn parse_permission(raw: &str) -> Result<PermissionState> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "granted" => Ok(PermissionState::Granted),
        "denied" => Ok(PermissionState::Denied),
        "prompt" => Ok(PermissionState::Prompt),
        _ => bail!("Unknown CAMERA_PERMISSION: {}", raw),
    }
}
