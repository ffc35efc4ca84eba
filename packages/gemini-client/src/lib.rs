//! Pure Gemini REST API client
//!
//! A minimal client for Google's Generative Language API with no
//! domain-specific logic. Supports `generateContent` with text and inline
//! document parts, plus lenient JSON extraction from model replies.
//!
//! # Example
//!
//! ```rust,ignore
//! use gemini_client::{GeminiClient, GenerateRequest, Part};
//!
//! let client = GeminiClient::from_env()?;
//!
//! let request = GenerateRequest::user(vec![
//!     Part::text("Summarize this filing"),
//!     Part::pdf(&pdf_bytes),
//! ]);
//! let response = client.generate_content(&request).await?;
//! println!("{}", response.text().unwrap_or_default());
//! ```

pub mod error;
pub mod types;

pub use error::{GeminiError, Result};
pub use types::*;

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Pure Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    /// Client whose every request carries the given timeout.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create from environment variable `GOOGLE_AI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_AI_API_KEY")
            .map_err(|_| GeminiError::Config("GOOGLE_AI_API_KEY not set".into()))?;
        if api_key.trim().is_empty() {
            return Err(GeminiError::Config("GOOGLE_AI_API_KEY is empty".into()));
        }
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for proxies, test servers, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model used for generation.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom HTTP client.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Call `generateContent` on the configured model.
    pub async fn generate_content(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Gemini request failed");
                GeminiError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<types::ErrorEnvelope>(&error_text)
                .map(|env| match env.error.status {
                    Some(code) => format!("{} ({})", env.error.message, code),
                    None => env.error.message,
                })
                .unwrap_or(error_text);
            warn!(status = %status, error = %message, "Gemini API error");
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::Parse(e.to_string()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis(),
            "Gemini generateContent"
        );

        Ok(parsed)
    }

    /// Send a prompt plus a PDF document and deserialize the JSON object in
    /// the reply.
    ///
    /// The reply is scanned for its outermost `{...}` span, so prose around
    /// the object is tolerated. A reply without one is a parse error.
    pub async fn extract_from_pdf<T: DeserializeOwned>(
        &self,
        prompt: &str,
        pdf_bytes: &[u8],
    ) -> Result<T> {
        let request = GenerateRequest::user(vec![Part::text(prompt), Part::pdf(pdf_bytes)])
            .json_output();
        let response = self.generate_content(&request).await?;
        let text = response
            .text()
            .ok_or_else(|| GeminiError::Parse("No text in Gemini response".into()))?;
        debug!(response = %text, "Gemini raw reply");
        parse_json_object(&text)
    }
}

/// Deserialize the outermost JSON object found in `text`.
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T> {
    let text = text.trim();
    let (start, end) = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => (start, end),
        _ => {
            return Err(GeminiError::Parse(
                "Could not find a JSON object in response".into(),
            ))
        }
    };
    serde_json::from_str(&text[start..=end])
        .map_err(|e| GeminiError::Parse(format!("Failed to deserialize response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Figures {
        total_revenue: Option<f64>,
        notes: Option<String>,
    }

    #[test]
    fn parse_json_object_ignores_surrounding_prose() {
        let text = "Here you go:\n```json\n{\"total_revenue\": 1200.5, \"notes\": \"ok\"}\n```";
        let figures: Figures = parse_json_object(text).unwrap();
        assert_eq!(figures.total_revenue, Some(1200.5));
        assert_eq!(figures.notes.as_deref(), Some("ok"));
    }

    #[test]
    fn parse_json_object_rejects_missing_object() {
        let err = parse_json_object::<Figures>("no json here").unwrap_err();
        assert!(matches!(err, GeminiError::Parse(_)));
    }

    #[test]
    fn parse_json_object_rejects_malformed_object() {
        let err = parse_json_object::<Figures>("{\"total_revenue\": }").unwrap_err();
        assert!(matches!(err, GeminiError::Parse(_)));
    }

    #[test]
    fn api_error_display_carries_status() {
        let err = GeminiError::Api {
            status: 429,
            message: "Resource has been exhausted (e.g. check quota).".into(),
        };
        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota"));
    }

    #[tokio::test]
    async fn unresponsive_host_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = GeminiClient::with_timeout("key", Duration::from_millis(200))
            .with_base_url(format!("http://{addr}"));
        let request = GenerateRequest::user(vec![Part::text("Summarize this filing")]);
        let result = tokio::time::timeout(Duration::from_secs(5), client.generate_content(&request))
            .await
            .expect("request outlived its timeout");

        assert!(matches!(result, Err(GeminiError::Network(_))));
    }

    #[test]
    fn builder_overrides() {
        let client = GeminiClient::new("key")
            .with_base_url("http://localhost:9999")
            .with_model("gemini-test");
        assert_eq!(client.base_url(), "http://localhost:9999");
        assert_eq!(client.model(), "gemini-test");
    }
}
