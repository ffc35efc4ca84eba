//! AI extraction trait.
//!
//! The AI stage reads a filing document and reports the two headline
//! figures. Its failures carry their message verbatim so the fallback
//! chain can tell quota exhaustion apart from everything else.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AiResult;

/// Self-reported certainty of an AI extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    #[default]
    Low,
}

impl ConfidenceLevel {
    /// Lenient parse; anything unrecognised is `Low`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Figures returned by the AI stage.
///
/// Either figure may be `None` when the document does not state it; a reply
/// with both absent is still a successful extraction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AiFigures {
    pub total_revenue: Option<f64>,
    pub total_executive_compensation: Option<f64>,
    pub confidence: ConfidenceLevel,
    pub notes: Option<String>,
}

/// Model-based document reader.
#[async_trait]
pub trait AiExtractor: Send + Sync {
    /// Extract revenue and executive compensation from a PDF.
    async fn extract(&self, document: &[u8]) -> AiResult<AiFigures>;
}
