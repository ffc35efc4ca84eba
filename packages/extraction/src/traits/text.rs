//! Text recovery traits.

use async_trait::async_trait;

use crate::error::TextResult;

/// Text recovered from a document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecoveredText {
    pub text: String,
    /// Whether image-based recognition produced the text.
    pub used_ocr: bool,
}

/// Turns a PDF into plain text.
///
/// Implementations read the embedded text layer and fall back to OCR when
/// the layer is too sparse to be useful.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, document: &[u8]) -> TextResult<RecoveredText>;
}

/// Image-based recognition engine.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, document: &[u8]) -> TextResult<String>;
}
