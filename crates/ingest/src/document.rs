use crate::error::IngestError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

/// File formats the OCR pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentKind {
    /// Classify an upload by its file extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Result<Self, IngestError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            _ => Err(IngestError::UnsupportedFormat(if extension.is_empty() {
                file_name.to_string()
            } else {
                format!(".{}", extension)
            })),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// An uploaded invoice held in memory until it is written to scratch space.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub kind: DocumentKind,
    pub fingerprint: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(file_name: String, bytes: Vec<u8>) -> Result<Self, IngestError> {
        let kind = DocumentKind::from_file_name(&file_name)?;
        let fingerprint = Self::generate_fingerprint(&bytes);

        Ok(Self {
            file_name,
            kind,
            fingerprint,
            bytes,
        })
    }

    fn generate_fingerprint(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let result = hasher.finalize();
        hex::encode(&result[..16]) // first 16 bytes (32 hex chars)
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Write the upload into `dir` as `upload.<ext>` and return its path.
    pub async fn persist(&self, dir: &Path) -> Result<PathBuf, IngestError> {
        let path = dir.join(format!("upload.{}", self.kind.extension()));
        fs::write(&path, &self.bytes)
            .await
            .map_err(|source| IngestError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(DocumentKind::from_file_name("inv.pdf").unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_file_name("scan.PNG").unwrap(), DocumentKind::Png);
        assert_eq!(DocumentKind::from_file_name("a.b.jpeg").unwrap(), DocumentKind::Jpeg);
        assert_eq!(DocumentKind::from_file_name("photo.JPG").unwrap(), DocumentKind::Jpeg);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = DocumentKind::from_file_name("notes.docx").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type: .docx");

        let err = DocumentKind::from_file_name("README").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = Document::new("a.pdf".to_string(), b"%PDF-1.4".to_vec()).unwrap();
        let b = Document::new("b.pdf".to_string(), b"%PDF-1.4".to_vec()).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint.len(), 32);
    }

    #[tokio::test]
    async fn test_persist_uses_canonical_extension() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::new("Scan.JPEG".to_string(), vec![0xff, 0xd8, 0xff]).unwrap();

        let path = doc.persist(dir.path()).await.unwrap();

        assert_eq!(path.file_name().unwrap(), "upload.jpg");
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xff, 0xd8, 0xff]);
    }
}
