use crate::document::DocumentKind;
use crate::error::IngestError;
use crate::ocr::OcrEngine;
use crate::pdf::PdfRasterizer;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Text produced by OCR along with how many pages went through the engine.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub pages: usize,
}

/// Turns a saved upload into plain text.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    ocr: OcrEngine,
    rasterizer: PdfRasterizer,
}

impl TextExtractor {
    pub fn new(ocr: OcrEngine, rasterizer: PdfRasterizer) -> Self {
        Self { ocr, rasterizer }
    }

    pub async fn extract_text(&self, path: &Path, kind: DocumentKind) -> Result<ExtractedText, IngestError> {
        let extracted = match kind {
            DocumentKind::Pdf => self.extract_pdf(path).await?,
            DocumentKind::Png | DocumentKind::Jpeg => ExtractedText {
                text: self.ocr.ocr_image(path).await?,
                pages: 1,
            },
        };

        if extracted.text.trim().is_empty() {
            warn!("OCR returned no text");
            return Err(IngestError::EmptyText);
        }

        Ok(extracted)
    }

    async fn extract_pdf(&self, path: &Path) -> Result<ExtractedText, IngestError> {
        // Page images live only as long as this directory.
        let scratch = tempfile::tempdir().map_err(|source| IngestError::Io {
            path: std::env::temp_dir(),
            source,
        })?;

        let pages = self.rasterizer.rasterize(path, scratch.path()).await?;
        let text = self.ocr_pages(&pages).await?;

        Ok(ExtractedText {
            text,
            pages: pages.len(),
        })
    }

    /// OCR rendered pages in order. A failing page fails the whole PDF.
    async fn ocr_pages(&self, pages: &[PathBuf]) -> Result<String, IngestError> {
        let mut text = String::new();
        for (i, page) in pages.iter().enumerate() {
            info!("Processing page {}...", i + 1);
            let page_text = self
                .ocr
                .ocr_image(page)
                .await
                .map_err(|e| IngestError::PdfFailed(format!("page {}: {}", i + 1, e)))?;
            text.push_str(&page_text);
            text.push_str("\n\n");
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Stand-in binaries keep these tests independent of a tesseract install.
    fn extractor_with_ocr_binary(binary: &str) -> TextExtractor {
        TextExtractor::new(
            OcrEngine::new(binary.to_string(), "eng".to_string()),
            PdfRasterizer::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_ocr_output_is_an_error() {
        let extractor = extractor_with_ocr_binary("true");

        let err = extractor
            .extract_text(Path::new("upload.png"), DocumentKind::Png)
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::EmptyText));
        assert_eq!(err.to_string(), "OCR failed to extract any text from the document.");
    }

    #[tokio::test]
    async fn test_page_ocr_failure_is_a_pdf_failure() {
        let extractor = extractor_with_ocr_binary("false");
        let pages = vec![PathBuf::from("page-1.png")];

        let err = extractor.ocr_pages(&pages).await.unwrap_err();

        assert!(matches!(err, IngestError::PdfFailed(_)));
        assert!(err.to_string().starts_with("PDF processing failed. Is poppler installed? Error: page 1:"));
    }

    #[tokio::test]
    async fn test_pages_are_joined_in_order() {
        let extractor = extractor_with_ocr_binary("echo");
        let pages = vec![PathBuf::from("page-1.png"), PathBuf::from("page-2.png")];

        let text = extractor.ocr_pages(&pages).await.unwrap();

        assert!(text.find("page-1.png").unwrap() < text.find("page-2.png").unwrap());
        assert!(text.ends_with("\n\n"));
    }

    #[tokio::test]
    async fn test_image_text_is_returned() {
        let extractor = extractor_with_ocr_binary("echo");

        let extracted = extractor
            .extract_text(Path::new("upload.jpg"), DocumentKind::Jpeg)
            .await
            .unwrap();

        assert!(extracted.text.contains("upload.jpg"));
        assert_eq!(extracted.pages, 1);
    }
}
