pub mod config;
pub mod error;
pub mod metrics;

pub use config::{AppConfig, ExtractionMode, LogFormat};
pub use error::ApiError;
pub use metrics::{Metrics, MetricsSnapshot, TimedOperation};

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use extract::{Extractor, ExtractorConfig, GeminiClient, GeminiSettings, InvoiceExtraction};
use ingest::{Document, IngestError, OcrEngine, PdfRasterizer, TextExtractor};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Name of the multipart field that carries the invoice.
pub const UPLOAD_FIELD: &str = "invoiceFile";

pub struct AppState {
    pub extractor: Extractor,
    pub text_extractor: TextExtractor,
    pub mode: ExtractionMode,
    pub max_upload_bytes: usize,
    pub metrics: Arc<Metrics>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInvoiceResponse {
    pub status: &'static str,
    pub extracted_data: InvoiceExtraction,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub llm_configured: bool,
    pub mode: ExtractionMode,
}

impl AppState {
    /// Wire up the OCR tools and the LLM client from configuration.
    ///
    /// A missing or unusable API key is logged and leaves the extractor
    /// unconfigured; the server still starts.
    pub fn from_config(config: &AppConfig) -> Self {
        let llm_client = match &config.llm.api_key {
            Some(api_key) => {
                let mut settings = GeminiSettings::new(api_key.clone());
                settings.model = config.llm.model.clone();
                settings.base_url = config.llm.base_url.clone();
                settings.timeout = Duration::from_secs(config.llm.timeout_secs);

                match GeminiClient::new(settings) {
                    Ok(client) => {
                        info!(model = client.model(), "Gemini AI configured successfully.");
                        Some(client)
                    }
                    Err(e) => {
                        error!("Error configuring Gemini AI: {:#}", e);
                        None
                    }
                }
            }
            None => {
                error!("Error configuring Gemini AI: GEMINI_API_KEY environment variable not set.");
                None
            }
        };

        let extractor = Extractor::new(
            llm_client,
            ExtractorConfig {
                ocr_text_limit: config.extraction.ocr_text_limit,
            },
        );

        let text_extractor = TextExtractor::new(
            OcrEngine::new("tesseract".to_string(), config.extraction.ocr_language.clone()),
            PdfRasterizer::new("pdftoppm".to_string(), config.extraction.pdf_dpi),
        );

        Self {
            extractor,
            text_extractor,
            mode: config.extraction.mode,
            max_upload_bytes: config.server.max_upload_bytes,
            metrics: Metrics::new(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/process-invoice", post(process_invoice))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        llm_configured: state.extractor.is_configured(),
        mode: state.mode,
    })
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn process_invoice(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessInvoiceResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!(
        "process_invoice",
        %request_id,
        fingerprint = tracing::field::Empty
    );

    async move {
        info!("Received request at /process-invoice...");

        let result = run_pipeline(&state, multipart).await;
        state.metrics.record_request(result.is_ok());

        match result {
            Ok(extracted_data) => Ok(Json(ProcessInvoiceResponse {
                status: "Success",
                extracted_data,
            })),
            Err(e) => {
                error!(error = %e, "Error in process_invoice endpoint");
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

async fn run_pipeline(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<InvoiceExtraction, ApiError> {
    // A body that is not multipart at all has no file part either.
    let multipart = multipart.map_err(|_| ApiError::MissingFile("No file part in the request"))?;
    let (file_name, bytes) = read_upload(multipart).await?;

    let document = Document::new(file_name, bytes)?;
    tracing::Span::current().record("fingerprint", document.fingerprint.as_str());
    info!(
        file_name = %document.file_name,
        kind = ?document.kind,
        size = document.size(),
        "Upload received"
    );

    match state.mode {
        ExtractionMode::Ocr => extract_via_ocr(state, &document).await,
        ExtractionMode::Multimodal => {
            let timer = TimedOperation::start();
            let extraction = state
                .extractor
                .extract_from_document(document.kind.mime_type(), &document.bytes)
                .await?;
            state.metrics.record_llm(timer.elapsed(), extraction.is_ai_error());
            Ok(extraction)
        }
    }
}

async fn extract_via_ocr(state: &AppState, document: &Document) -> Result<InvoiceExtraction, ApiError> {
    // The upload and any rendered pages are removed when `scratch` drops.
    let scratch = tempfile::tempdir().map_err(|source| IngestError::Io {
        path: std::env::temp_dir(),
        source,
    })?;
    let path = document.persist(scratch.path()).await?;
    info!(path = %path.display(), "File saved temporarily");

    let timer = TimedOperation::start();
    let text = state.text_extractor.extract_text(&path, document.kind).await?;
    state.metrics.record_ocr(timer.elapsed(), text.pages);

    let timer = TimedOperation::start();
    let extraction = state.extractor.extract_from_text(&text.text).await?;
    state.metrics.record_llm(timer.elapsed(), extraction.is_ai_error());

    Ok(extraction)
}

/// Pull the invoice file out of the form, skipping any other fields.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().trim().to_string();
        if file_name.is_empty() {
            return Err(ApiError::MissingFile("No selected file"));
        }

        let bytes = field.bytes().await?;
        return Ok((file_name, bytes.to_vec()));
    }

    Err(ApiError::MissingFile("No file part in the request"))
}
