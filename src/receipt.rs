//! Display-ready extraction result.

use chrono::NaiveDate;
use serde::Serialize;

use crate::ocr::{OcrResponse, TotalValue};

pub const UNIDENTIFIED_ESTABLISHMENT: &str = "Não identificado";

/// pt-BR day/month/year.
const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedResult {
    pub total_amount: String,
    pub establishment_name: String,
    /// Local date of processing, not reported by the service.
    pub capture_date: String,
}

impl ExtractedResult {
    pub fn from_response(response: OcrResponse, today: NaiveDate) -> Self {
        let total_amount = match response.total {
            TotalValue::Number(value) => format_total(value),
            TotalValue::Text(text) if text.is_empty() => format_total(0.0),
            TotalValue::Text(text) => text,
        };

        Self {
            total_amount,
            establishment_name: response
                .establishment
                .unwrap_or_else(|| UNIDENTIFIED_ESTABLISHMENT.to_string()),
            capture_date: today.format(DATE_FORMAT).to_string(),
        }
    }
}

/// Two decimals with a decimal comma: `12.5` → `"12,50"`.
pub fn format_total(value: f64) -> String {
    format!("{:.2}", value).replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn test_format_total() {
        assert_eq!(format_total(12.5), "12,50");
        assert_eq!(format_total(7.0), "7,00");
        assert_eq!(format_total(1234.567), "1234,57");
        assert_eq!(format_total(0.0), "0,00");
    }

    #[test]
    fn test_numeric_total_and_establishment() {
        let result = ExtractedResult::from_response(
            OcrResponse {
                total: TotalValue::Number(12.5),
                establishment: Some("Mercado X".to_string()),
            },
            day(),
        );
        assert_eq!(result.total_amount, "12,50");
        assert_eq!(result.establishment_name, "Mercado X");
        assert_eq!(result.capture_date, "07/03/2024");
    }

    #[test]
    fn test_text_total_passes_through_with_placeholder() {
        let result = ExtractedResult::from_response(
            OcrResponse {
                total: TotalValue::Text("7.00".to_string()),
                establishment: None,
            },
            day(),
        );
        assert_eq!(result.total_amount, "7.00");
        assert_eq!(result.establishment_name, UNIDENTIFIED_ESTABLISHMENT);
    }

    #[test]
    fn test_empty_text_total_reads_as_zero() {
        let result = ExtractedResult::from_response(
            OcrResponse {
                total: TotalValue::Text(String::new()),
                establishment: Some("Padaria".to_string()),
            },
            day(),
        );
        assert_eq!(result.total_amount, "0,00");
        assert_eq!(result.establishment_name, "Padaria");
    }
}
