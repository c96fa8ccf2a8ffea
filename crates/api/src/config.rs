use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    Ocr,        // Tesseract text, then the LLM reads the text
    Multimodal, // the LLM reads the document directly
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub mode: ExtractionMode,
    pub ocr_language: String,
    pub pdf_dpi: u32,
    pub ocr_text_limit: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                max_upload_bytes: 20 * 1024 * 1024,
            },
            llm: LlmConfig {
                api_key: None,
                model: extract::llm::DEFAULT_MODEL.to_string(),
                base_url: extract::llm::DEFAULT_BASE_URL.to_string(),
                timeout_secs: 60,
            },
            extraction: ExtractionConfig {
                mode: ExtractionMode::Ocr,
                ocr_language: "eng".to_string(),
                pdf_dpi: ingest::pdf::DEFAULT_DPI,
                ocr_text_limit: extract::prompt::DEFAULT_TEXT_LIMIT,
            },
            logging: LoggingConfig {
                format: LogFormat::Pretty,
            },
        }
    }
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ocr" => Ok(Self::Ocr),
            "multimodal" | "vision" => Ok(Self::Multimodal),
            other => Err(format!("unknown extraction mode: {}", other)),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparseable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or(defaults.server.host),
                port: parsed(&lookup, "PORT").unwrap_or(defaults.server.port),
                max_upload_bytes: parsed(&lookup, "MAX_UPLOAD_BYTES").unwrap_or(defaults.server.max_upload_bytes),
            },
            llm: LlmConfig {
                api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
                model: lookup("GEMINI_MODEL").unwrap_or(defaults.llm.model),
                base_url: lookup("GEMINI_BASE_URL").unwrap_or(defaults.llm.base_url),
                timeout_secs: parsed(&lookup, "LLM_TIMEOUT_SECS").unwrap_or(defaults.llm.timeout_secs),
            },
            extraction: ExtractionConfig {
                mode: parsed(&lookup, "EXTRACTION_MODE").unwrap_or(defaults.extraction.mode),
                ocr_language: lookup("OCR_LANGUAGE").unwrap_or(defaults.extraction.ocr_language),
                pdf_dpi: parsed(&lookup, "PDF_DPI").unwrap_or(defaults.extraction.pdf_dpi),
                ocr_text_limit: parsed(&lookup, "OCR_TEXT_LIMIT").unwrap_or(defaults.extraction.ocr_text_limit),
            },
            logging: LoggingConfig {
                format: parsed(&lookup, "LOG_FORMAT").unwrap_or(defaults.logging.format),
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("server", &self.server)
            .field("llm", &self.llm)
            .field("extraction", &self.extraction)
            .field("logging", &self.logging)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.extraction.mode, ExtractionMode::Ocr);
        assert_eq!(config.extraction.ocr_text_limit, 4000);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("GEMINI_API_KEY", "secret"),
            ("EXTRACTION_MODE", "Multimodal"),
            ("OCR_TEXT_LIMIT", "1200"),
            ("LOG_FORMAT", "json"),
        ]);

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(config.extraction.mode, ExtractionMode::Multimodal);
        assert_eq!(config.extraction.ocr_text_limit, 1200);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = config_from(&[("PORT", "not-a-port"), ("EXTRACTION_MODE", "telepathy"), ("GEMINI_API_KEY", "  ")]);

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.extraction.mode, ExtractionMode::Ocr);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = config_from(&[("GEMINI_API_KEY", "super-secret-key")]);
        let rendered = format!("{:?}", config);

        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
