use crate::error::IngestError;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Tesseract invoked through its command-line binary, which must be on PATH.
#[derive(Debug, Clone)]
pub struct OcrEngine {
    binary: String,
    language: String,
}

impl OcrEngine {
    pub fn new(binary: String, language: String) -> Self {
        Self { binary, language }
    }

    /// Recognise the text of a single image file.
    pub async fn ocr_image(&self, image: &Path) -> Result<String, IngestError> {
        debug!(image = %image.display(), lang = %self.language, "Running tesseract");

        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await
            .map_err(|e| {
                IngestError::OcrFailed(format!(
                    "could not start {}: {}. Is tesseract installed?",
                    self.binary, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::OcrFailed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
