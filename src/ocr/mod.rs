//! OCR service abstraction.
//!
//! Defines the [`OcrService`] trait and the response it yields, so the
//! controller does not care how the total is extracted.

pub mod http;

use serde_json::Value;

use crate::error::ScanError;

/// Total as sent by the service.
#[derive(Debug, Clone, PartialEq)]
pub enum TotalValue {
    Number(f64),
    /// Passed through untouched.
    Text(String),
}

/// Parsed body of a successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResponse {
    pub total: TotalValue,
    pub establishment: Option<String>,
}

impl OcrResponse {
    /// Parse a response body. `valor_total` must be a number or a string.
    pub fn from_json(body: &str) -> Result<Self, ScanError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| ScanError::MalformedResponse(e.to_string()))?;

        let total = match value.get("valor_total") {
            Some(Value::Number(n)) => n
                .as_f64()
                .map(TotalValue::Number)
                .ok_or(ScanError::MissingTotal)?,
            Some(Value::String(s)) => TotalValue::Text(s.clone()),
            _ => return Err(ScanError::MissingTotal),
        };

        let establishment = value
            .get("estabelecimento")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            total,
            establishment,
        })
    }
}

/// Async trait implemented by each OCR backend.
#[async_trait::async_trait]
pub trait OcrService: Send + Sync {
    fn name(&self) -> &str;

    /// Upload a JPEG receipt and extract its total. One attempt, no retry.
    async fn extract_total(&self, jpeg: Vec<u8>) -> Result<OcrResponse, ScanError>;
}
