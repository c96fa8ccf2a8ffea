use crate::error::IngestError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

const PAGE_PREFIX: &str = "page";
pub const DEFAULT_DPI: u32 = 200;

/// Renders PDF pages to PNG with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    binary: String,
    dpi: u32,
}

impl PdfRasterizer {
    pub fn new(binary: String, dpi: u32) -> Self {
        Self { binary, dpi }
    }

    /// Rasterize every page of `pdf` into `out_dir`, returning images in page order.
    pub async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
        let output = Command::new(&self.binary)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(out_dir.join(PAGE_PREFIX))
            .output()
            .await
            .map_err(|e| IngestError::PdfFailed(format!("could not start {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::PdfFailed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let pages = collect_pages(out_dir).await?;
        if pages.is_empty() {
            return Err(IngestError::PdfFailed("no pages were rendered".to_string()));
        }

        Ok(pages)
    }
}

impl Default for PdfRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm".to_string(), DEFAULT_DPI)
    }
}

/// pdftoppm names pages `page-1.png` or `page-01.png` depending on page count,
/// so order by the parsed page number rather than lexically.
async fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let io_err = |source: std::io::Error| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(io_err)?;
    let mut pages = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        if let Some(number) = page_number(&path) {
            pages.push((number, path));
        }
    }

    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

fn page_number(path: &Path) -> Option<u32> {
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .parse()
        .ok()
}
