use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Gemini AI Model is not configured or failed to initialize.")]
    NotConfigured,

    #[error("{0:#}")]
    Llm(anyhow::Error),

    #[error("Failed to parse extraction result: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
