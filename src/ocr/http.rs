//! HTTP OCR service client.

use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use super::{OcrResponse, OcrService};
use crate::capture::JPEG_MIME;
use crate::error::ScanError;

const EXTRACT_PATH: &str = "/extrair-valor/?debug=false";
const UPLOAD_FIELD: &str = "file";
const UPLOAD_FILENAME: &str = "cupom.jpg";

pub struct HttpOcrService {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpOcrService {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), EXTRACT_PATH),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl OcrService for HttpOcrService {
    fn name(&self) -> &str {
        "http"
    }

    async fn extract_total(&self, jpeg: Vec<u8>) -> Result<OcrResponse, ScanError> {
        info!(
            "HttpOcrService: uploading {} ({} bytes) to {}",
            UPLOAD_FILENAME,
            jpeg.len(),
            self.endpoint
        );

        let part = Part::bytes(jpeg)
            .file_name(UPLOAD_FILENAME)
            .mime_str(JPEG_MIME)
            .map_err(|e| ScanError::Network(e.to_string()))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ScanError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            debug!("HttpOcrService: error body ({}): {}", status, error_text);
            return Err(ScanError::ServiceStatus {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScanError::Network(e.to_string()))?;
        debug!(
            "HttpOcrService: raw response ({} bytes): {}",
            body.len(),
            body.chars().take(500).collect::<String>()
        );

        OcrResponse::from_json(&body)
    }
}
