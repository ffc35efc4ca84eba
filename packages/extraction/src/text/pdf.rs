//! Text-layer extraction with `lopdf`, falling back to OCR.

use async_trait::async_trait;
use lopdf::Document;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{TextError, TextResult};
use crate::traits::text::{OcrEngine, RecoveredText, TextExtractor};

/// Text layers at or below this many characters are treated as scanned
/// images and handed to OCR.
pub const SPARSE_TEXT_CHARS: usize = 200;

/// Reads a PDF's embedded text, one page at a time.
///
/// Pages are joined with `--- Page n ---` separators. When the text layer is
/// sparse or unreadable and an OCR engine is configured, the engine's output
/// is returned instead.
#[derive(Clone, Default)]
pub struct PdfTextExtractor {
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn has_ocr(&self) -> bool {
        self.ocr.is_some()
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, document: &[u8]) -> TextResult<RecoveredText> {
        let bytes = document.to_vec();
        let layer = tokio::task::spawn_blocking(move || read_text_layer(&bytes))
            .await
            .map_err(|e| TextError::Pdf(format!("text layer task failed: {e}")))?;

        let Some(ocr) = &self.ocr else {
            return layer.map(|text| RecoveredText {
                text,
                used_ocr: false,
            });
        };

        match layer {
            Ok(text) if text.trim().chars().count() > SPARSE_TEXT_CHARS => Ok(RecoveredText {
                text,
                used_ocr: false,
            }),
            Ok(text) => {
                debug!(chars = text.trim().len(), "Sparse text layer, running OCR");
                recognize(ocr.as_ref(), document).await
            }
            Err(e) => {
                debug!(error = %e, "Unreadable text layer, running OCR");
                recognize(ocr.as_ref(), document).await
            }
        }
    }
}

async fn recognize(ocr: &dyn OcrEngine, document: &[u8]) -> TextResult<RecoveredText> {
    let text = ocr.recognize(document).await?;
    Ok(RecoveredText {
        text,
        used_ocr: true,
    })
}

fn read_text_layer(bytes: &[u8]) -> TextResult<String> {
    let doc = Document::load_mem(bytes).map_err(|e| TextError::Pdf(e.to_string()))?;

    let mut text = String::new();
    for page in doc.get_pages().keys() {
        match doc.extract_text(&[*page]) {
            Ok(page_text) => {
                text.push_str(&format!("\n--- Page {page} ---\n"));
                text.push_str(&page_text);
            }
            // Unsupported encodings on one page shouldn't lose the rest
            Err(e) => trace!(page, error = %e, "Skipping unreadable page"),
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedOcr {
        text: String,
        calls: AtomicUsize,
    }

    impl FixedOcr {
        fn new(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn recognize(&self, _document: &[u8]) -> TextResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    /// Single-page PDF with one line of Helvetica text.
    fn make_test_pdf(text: &str) -> Vec<u8> {
        use lopdf::{dictionary, Object, Stream};

        let mut doc = Document::with_version("1.4");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", pages_id);
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[tokio::test]
    async fn test_text_layer_without_ocr() {
        let pdf = make_test_pdf("Total revenue 1,000,000");
        let recovered = PdfTextExtractor::new().extract_text(&pdf).await.unwrap();

        assert!(!recovered.used_ocr);
        assert!(recovered.text.contains("--- Page 1 ---"));
    }

    #[tokio::test]
    async fn test_sparse_layer_goes_to_ocr() {
        let ocr = FixedOcr::new("Form 990 recognized text");
        let extractor = PdfTextExtractor::new().with_ocr(ocr.clone());

        let recovered = extractor
            .extract_text(&make_test_pdf("short"))
            .await
            .unwrap();

        assert!(recovered.used_ocr);
        assert_eq!(recovered.text, "Form 990 recognized text");
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreadable_pdf() {
        let result = PdfTextExtractor::new().extract_text(b"not a pdf").await;
        assert!(matches!(result, Err(TextError::Pdf(_))));

        let ocr = FixedOcr::new("scanned");
        let recovered = PdfTextExtractor::new()
            .with_ocr(ocr)
            .extract_text(b"not a pdf")
            .await
            .unwrap();
        assert!(recovered.used_ocr);
    }
}
