pub mod error;
pub mod llm;
pub mod normalizer;
pub mod prompt;
pub mod schema;

pub use error::ExtractError;
pub use llm::{GeminiClient, GeminiSettings};
pub use schema::{InvoiceExtraction, LineItem, RawInvoice};

use chrono::{Local, NaiveDate};
use normalizer::DATE_FORMAT;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub ocr_text_limit: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ocr_text_limit: prompt::DEFAULT_TEXT_LIMIT,
        }
    }
}

/// Turns invoice text (or the invoice itself) into an [`InvoiceExtraction`]
/// by way of the LLM.
pub struct Extractor {
    llm_client: Option<GeminiClient>,
    config: ExtractorConfig,
}

impl Extractor {
    /// `llm_client` is `None` when no API key was available at startup.
    pub fn new(llm_client: Option<GeminiClient>, config: ExtractorConfig) -> Self {
        Self { llm_client, config }
    }

    pub fn is_configured(&self) -> bool {
        self.llm_client.is_some()
    }

    fn client(&self) -> Result<&GeminiClient, ExtractError> {
        self.llm_client.as_ref().ok_or(ExtractError::NotConfigured)
    }

    /// Extract fields from OCR text.
    ///
    /// Only a missing LLM configuration is an error; failures of the call
    /// itself come back as [`InvoiceExtraction::ai_error`].
    pub async fn extract_from_text(&self, text: &str) -> Result<InvoiceExtraction, ExtractError> {
        let client = self.client()?;
        let today = today();
        let prompt = prompt::build_extraction_prompt(
            text,
            &today.format(DATE_FORMAT).to_string(),
            self.config.ocr_text_limit,
        );

        info!("Sending text to Gemini LLM for extraction...");
        let outcome = match client.generate(&prompt).await {
            Ok(answer) => Self::parse_answer(&answer, today),
            Err(e) => Err(ExtractError::Llm(e)),
        };

        Ok(Self::settle(outcome, today))
    }

    /// Extract fields by sending the raw document to the multimodal model.
    pub async fn extract_from_document(
        &self,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<InvoiceExtraction, ExtractError> {
        let client = self.client()?;
        let today = today();
        let prompt = prompt::build_document_prompt(&today.format(DATE_FORMAT).to_string());

        info!(mime_type, bytes = bytes.len(), "Sending document to Gemini LLM for extraction...");
        let outcome = match client.generate_with_document(&prompt, mime_type, bytes).await {
            Ok(answer) => Self::parse_answer(&answer, today),
            Err(e) => Err(ExtractError::Llm(e)),
        };

        Ok(Self::settle(outcome, today))
    }

    /// Parse a model answer, tolerating a markdown fence around the JSON.
    pub fn parse_answer(answer: &str, today: NaiveDate) -> Result<InvoiceExtraction, ExtractError> {
        let json = normalizer::strip_code_fences(answer);
        let raw: RawInvoice = serde_json::from_str(json)?;
        Ok(InvoiceExtraction::from_raw(raw, today))
    }

    fn settle(outcome: Result<InvoiceExtraction, ExtractError>, today: NaiveDate) -> InvoiceExtraction {
        match outcome {
            Ok(extraction) => {
                info!(
                    vendor = %extraction.vendor_name,
                    total = extraction.total_amount,
                    "LLM extraction successful"
                );
                extraction
            }
            Err(e) => {
                error!(error = %e, "Error during LLM extraction");
                InvoiceExtraction::ai_error(&e.to_string(), today)
            }
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 2).unwrap()
    }

    fn unreachable_client() -> GeminiClient {
        let mut settings = GeminiSettings::new("test-key".to_string());
        // Port 9 (discard) is closed on test machines, so the connection is refused.
        settings.base_url = "http://127.0.0.1:9".to_string();
        settings.timeout = Duration::from_secs(5);
        GeminiClient::new(settings).unwrap()
    }

    #[test]
    fn test_parse_fenced_answer() {
        let answer = "```json\n{\"vendorName\": \"Globex\", \"totalAmount\": \"2,500.00\"}\n```";

        let extraction = Extractor::parse_answer(answer, day()).unwrap();

        assert_eq!(extraction.vendor_name, "Globex");
        assert_eq!(extraction.total_amount, 2500.0);
        assert_eq!(extraction.invoice_date, "2025-11-02");
    }

    #[test]
    fn test_parse_malformed_answer() {
        let err = Extractor::parse_answer("{\"vendorName\": ", day()).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidJson(_)));
    }

    #[test]
    fn test_parse_answer_tolerates_non_list_line_items() {
        let extraction =
            Extractor::parse_answer(r#"{"vendorName":"Acme","totalAmount":1180,"lineItems":"N/A"}"#, day()).unwrap();

        assert_eq!(extraction.vendor_name, "Acme");
        assert_eq!(extraction.total_amount, 1180.0);
        assert!(extraction.line_items.is_empty());
        assert!(!extraction.is_ai_error());
    }

    #[test]
    fn test_settle_turns_errors_into_ai_error() {
        let outcome = Extractor::parse_answer("not json", day());
        let extraction = Extractor::settle(outcome, day());

        assert!(extraction.is_ai_error());
        assert!(extraction.status.starts_with("AI Error: Failed to parse extraction result"));
    }

    #[tokio::test]
    async fn test_unconfigured_extractor_fails() {
        let extractor = Extractor::new(None, ExtractorConfig::default());

        assert!(!extractor.is_configured());
        let err = extractor.extract_from_text("INVOICE").await.unwrap_err();
        assert!(matches!(err, ExtractError::NotConfigured));
        assert_eq!(
            err.to_string(),
            "Gemini AI Model is not configured or failed to initialize."
        );
    }

    #[tokio::test]
    async fn test_llm_failure_degrades() {
        let extractor = Extractor::new(Some(unreachable_client()), ExtractorConfig::default());

        let extraction = extractor.extract_from_text("INVOICE").await.unwrap();
        assert_eq!(extraction.vendor_name, "AI Error");
        assert!(extraction.rationale.contains("Failed to send request to Gemini"));

        let extraction = extractor
            .extract_from_document("image/png", &[0x89, b'P', b'N', b'G'])
            .await
            .unwrap();
        assert!(extraction.is_ai_error());
    }
}
