use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to write upload to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("PDF processing failed. Is poppler installed? Error: {0}")]
    PdfFailed(String),

    #[error("OCR failed to extract any text from the document.")]
    EmptyText,
}
