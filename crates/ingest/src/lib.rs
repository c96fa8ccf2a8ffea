pub mod document;
pub mod error;
pub mod ocr;
pub mod pdf;
pub mod reader;

pub use document::{Document, DocumentKind};
pub use error::IngestError;
pub use ocr::OcrEngine;
pub use pdf::PdfRasterizer;
pub use reader::{ExtractedText, TextExtractor};
