//! Typed errors for the extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. None of these cross the
//! organization boundary: the pipeline folds them into an
//! [`ErrorKind`](crate::types::result::ErrorKind) on the result record.

use thiserror::Error;

/// Errors from the nonprofit registry (search and detail lookups).
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Registry signalled too many requests
    #[error("registry rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// Request did not complete within its timeout
    #[error("registry request timed out")]
    Timeout,

    /// Connection-level failure
    #[error("registry transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("registry API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Organization does not exist
    #[error("organization not found")]
    NotFound,

    /// Response body could not be decoded
    #[error("registry response could not be decoded: {0}")]
    Decode(String),
}

/// Errors that can occur while downloading a filing document.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Access denied, even after retrying with alternate headers
    #[error("download forbidden: {url}")]
    Forbidden { url: String },

    /// Host signalled too many requests
    #[error("download rate limited: {url}")]
    RateLimited { url: String },

    /// Any other non-success status
    #[error("download failed with HTTP {status}: {url}")]
    Status { url: String, status: u16 },

    /// Body does not start with the PDF signature
    #[error("downloaded content is not a PDF: {url}")]
    NotPdf { url: String },

    /// Connection timeout
    #[error("timeout downloading: {url}")]
    Timeout { url: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),
}

/// Failure reported by the AI extraction collaborator.
///
/// The message is kept verbatim; the fallback chain classifies it by
/// vocabulary (see [`AiError::is_rate_limit`]).
#[derive(Debug, Clone, Error)]
pub enum AiError {
    /// Service answered with an error
    #[error("AI service error: {message}")]
    Service { status: Option<u16>, message: String },

    /// Reply was missing or not the expected JSON
    #[error("AI response malformed: {0}")]
    Malformed(String),

    /// Request never reached the service
    #[error("AI network error: {0}")]
    Network(String),
}

impl AiError {
    /// Whether the failure text reads as quota exhaustion or throttling.
    pub fn is_rate_limit(&self) -> bool {
        if let Self::Service {
            status: Some(429), ..
        } = self
        {
            return true;
        }
        let text = self.to_string().to_lowercase();
        RATE_LIMIT_VOCABULARY.iter().any(|term| text.contains(term))
    }
}

const RATE_LIMIT_VOCABULARY: &[&str] = &[
    "rate limit",
    "rate-limit",
    "ratelimit",
    "rate exceeded",
    "quota",
    "429",
    "resource_exhausted",
    "resource has been exhausted",
    "too many requests",
];

/// Errors from recovering text out of a document.
#[derive(Debug, Clone, Error)]
pub enum TextError {
    /// The PDF could not be opened or walked
    #[error("PDF text layer unreadable: {0}")]
    Pdf(String),

    /// Image-based recognition failed
    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// Unrecoverable configuration problems. These abort a run before any work
/// is dispatched.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A credential required by the selected parsing method is absent
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// A setting is out of range
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Result type alias for document downloads.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for AI extraction.
pub type AiResult<T> = std::result::Result<T, AiError>;

/// Result type alias for text recovery.
pub type TextResult<T> = std::result::Result<T, TextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_messages_are_rate_limits() {
        let err = AiError::Service {
            status: Some(400),
            message: "Quota exceeded for quota metric 'Generate Content API requests'".into(),
        };
        assert!(err.is_rate_limit());

        let err = AiError::Service {
            status: None,
            message: "RESOURCE_EXHAUSTED".into(),
        };
        assert!(err.is_rate_limit());
    }

    #[test]
    fn status_429_is_rate_limit_regardless_of_text() {
        let err = AiError::Service {
            status: Some(429),
            message: "slow down".into(),
        };
        assert!(err.is_rate_limit());
    }

    #[test]
    fn generic_failures_are_not_rate_limits() {
        let err = AiError::Malformed("Could not find a JSON object in response".into());
        assert!(!err.is_rate_limit());

        // "generate" contains "rate" but is not throttling vocabulary
        let err = AiError::Service {
            status: Some(500),
            message: "failed to generate content".into(),
        };
        assert!(!err.is_rate_limit());
    }
}
