//! Turning a preview frame into a compressed still.

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};
use tracing::debug;

use crate::camera::MediaStream;
use crate::data_url::{data_url, decode_data_url};
use crate::error::ScanError;

pub const JPEG_MIME: &str = "image/jpeg";

/// A captured photo, kept as a `data:` URL the way a preview element shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    data_url: String,
    width: u32,
    height: u32,
}

impl CapturedImage {
    /// Encode a frame as JPEG at `quality` (1-100).
    pub fn encode(frame: &RgbImage, quality: u8) -> Result<Self, ScanError> {
        let (width, height) = frame.dimensions();
        let jpeg = encode_jpeg(frame, quality)?;
        debug!(
            "Captured {}x{} still ({} bytes, quality {})",
            width,
            height,
            jpeg.len(),
            quality
        );
        Ok(Self {
            data_url: data_url(JPEG_MIME, &jpeg),
            width,
            height,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Decode the stored representation into the upload payload.
    pub fn to_jpeg_bytes(&self) -> Result<Vec<u8>, ScanError> {
        let (_, bytes) = decode_data_url(&self.data_url)
            .map_err(|e| ScanError::CaptureFailed(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ScanError::NoImage);
        }
        Ok(bytes)
    }
}

/// Draw the stream's current frame onto a surface of the frame's native size.
pub fn render_frame(stream: &dyn MediaStream) -> Result<RgbImage, ScanError> {
    let (width, height) = stream.frame_dimensions();
    if width == 0 || height == 0 {
        return Err(ScanError::FrameNotReady);
    }

    let frame = stream
        .grab_frame()
        .map_err(|e| ScanError::CaptureFailed(e.to_string()))?;
    if frame.dimensions() == (width, height) {
        return Ok(frame);
    }

    Ok(image::imageops::resize(
        &frame,
        width,
        height,
        image::imageops::FilterType::Triangle,
    ))
}

pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, ScanError> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(ScanError::CaptureFailed(
            "Falha ao capturar imagem da câmera".to_string(),
        ));
    }

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode(frame.as_raw(), width, height, ColorType::Rgb8)
        .map_err(|e| ScanError::CaptureFailed(e.to_string()))?;

    if buf.is_empty() {
        return Err(ScanError::CaptureFailed(
            "Falha ao capturar imagem da câmera".to_string(),
        ));
    }
    Ok(buf)
}
