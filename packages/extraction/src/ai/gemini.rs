//! Gemini implementation of the AiExtractor trait.

use async_trait::async_trait;
use gemini_client::{GeminiClient, GeminiError};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{AiError, AiResult};
use crate::parsing::normalize_amount;
use crate::security::AiCredentials;
use crate::traits::ai::{AiExtractor, AiFigures, ConfidenceLevel};

const EXTRACTION_PROMPT: &str = r#"You are reading a US nonprofit tax filing (IRS Form 990).

Extract:
1. Total revenue for the tax year (Part I, line 12 on the current form; line 12 of the legacy form).
2. Total compensation paid to current officers, directors, trustees and key employees (Part VII on the current form; Part V on the legacy form). Sum the reportable compensation of every listed person.

Return ONLY a JSON object with these keys:
{
  "total_revenue": number or null,
  "total_executive_compensation": number or null,
  "confidence_level": "high" | "medium" | "low",
  "notes": string or null
}

Use plain numbers without currency symbols or thousands separators. Use null when a figure is not stated in the document."#;

/// Shape of the model's reply. Figures arrive as numbers or as strings like
/// "$1,234,567", so they are read as raw JSON values first.
#[derive(Debug, Deserialize)]
struct RawFigures {
    #[serde(default)]
    total_revenue: Value,
    #[serde(default)]
    total_executive_compensation: Value,
    #[serde(default)]
    confidence_level: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl From<RawFigures> for AiFigures {
    fn from(raw: RawFigures) -> Self {
        Self {
            total_revenue: figure(&raw.total_revenue),
            total_executive_compensation: figure(&raw.total_executive_compensation),
            confidence: raw
                .confidence_level
                .as_deref()
                .map(ConfidenceLevel::parse)
                .unwrap_or_default(),
            notes: raw.notes.filter(|n| !n.trim().is_empty()),
        }
    }
}

fn figure(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => normalize_amount(s),
        _ => None,
    }
}

/// Document extractor backed by Gemini's inline PDF support.
///
/// # Example
///
/// ```rust,ignore
/// use filing_extraction::ai::GeminiExtractor;
/// use filing_extraction::security::AiCredentials;
///
/// let creds = AiCredentials::require(std::env::var("GOOGLE_AI_API_KEY").ok(), "gemini-2.5-flash")?;
/// let ai = GeminiExtractor::from_credentials(&creds);
/// let figures = ai.extract(&pdf_bytes).await?;
/// ```
#[derive(Clone)]
pub struct GeminiExtractor {
    client: GeminiClient,
}

impl GeminiExtractor {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    pub fn from_credentials(credentials: &AiCredentials) -> Self {
        let mut client =
            GeminiClient::new(credentials.api_key.expose()).with_model(&credentials.model);
        if let Some(url) = &credentials.base_url {
            client = client.with_base_url(url);
        }
        Self::new(client)
    }
}

#[async_trait]
impl AiExtractor for GeminiExtractor {
    async fn extract(&self, document: &[u8]) -> AiResult<AiFigures> {
        debug!(model = %self.client.model(), bytes = document.len(), "AI document extraction");

        let raw: RawFigures = self
            .client
            .extract_from_pdf(EXTRACTION_PROMPT, document)
            .await
            .map_err(map_error)?;

        Ok(raw.into())
    }
}

fn map_error(error: GeminiError) -> AiError {
    match error {
        GeminiError::Api { status, message } => AiError::Service {
            status: Some(status),
            message,
        },
        GeminiError::Network(message) => AiError::Network(message),
        GeminiError::Parse(message) => AiError::Malformed(message),
        GeminiError::Config(message) => AiError::Service {
            status: None,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_with_string_figures() {
        let raw: RawFigures = serde_json::from_str(
            r#"{"total_revenue": "$1,234,567", "total_executive_compensation": 250000,
                "confidence_level": "HIGH", "notes": ""}"#,
        )
        .unwrap();
        let figures = AiFigures::from(raw);

        assert_eq!(figures.total_revenue, Some(1_234_567.0));
        assert_eq!(figures.total_executive_compensation, Some(250_000.0));
        assert_eq!(figures.confidence, ConfidenceLevel::High);
        assert!(figures.notes.is_none());
    }

    #[test]
    fn test_reply_with_nulls_is_still_figures() {
        let raw: RawFigures =
            serde_json::from_str(r#"{"total_revenue": null, "confidence_level": "unsure"}"#)
                .unwrap();
        let figures = AiFigures::from(raw);

        assert_eq!(figures.total_revenue, None);
        assert_eq!(figures.total_executive_compensation, None);
        assert_eq!(figures.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_quota_error_is_rate_limit() {
        let err = map_error(GeminiError::Api {
            status: 429,
            message: "Resource has been exhausted (e.g. check quota).".into(),
        });
        assert!(err.is_rate_limit());

        let err = map_error(GeminiError::Parse("Could not find a JSON object".into()));
        assert!(!err.is_rate_limit());
    }
}
