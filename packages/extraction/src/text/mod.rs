//! Text recovery from filing PDFs.
//!
//! [`PdfTextExtractor`] reads the embedded text layer with `lopdf` and hands
//! sparse or unreadable documents to an optional [`OcrEngine`].
//!
//! [`OcrEngine`]: crate::traits::text::OcrEngine

mod pdf;

pub use pdf::{PdfTextExtractor, SPARSE_TEXT_CHARS};
