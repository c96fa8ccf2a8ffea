use crate::normalizer::{self, DATE_FORMAT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";
pub const NOT_AVAILABLE: &str = "N/A";
pub const DEFAULT_CURRENCY: &str = "INR";
pub const DEFAULT_CONFIDENCE: f64 = 0.5;
/// Every successful extraction waits for a human to review it.
pub const PENDING_REVIEW: &str = "Pending";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

/// Structured fields pulled out of one invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceExtraction {
    pub vendor_name: String,
    pub invoice_number: String,
    pub invoice_date: String,
    pub due_date: String,
    pub subtotal: f64,
    pub tax: f64,
    pub total_amount: f64,
    pub currency: String,
    pub line_items: Vec<LineItem>,
    pub confidence_score: f64,
    pub rationale: String,
    pub status: String,
}

/// A JSON scalar the model may hand back where we asked for a specific type.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Number(f64),
    Text(String),
    Other(Value),
}

impl Loose {
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Self::Number(n) => Some(n.to_string()),
            Self::Other(_) => None,
        }
    }

    pub fn as_amount(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(text) => normalizer::parse_amount(text),
            Self::Other(_) => None,
        }
    }
}

/// The model's answer as it arrives: any field may be missing, null or mistyped.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInvoice {
    pub vendor_name: Option<Loose>,
    pub invoice_number: Option<Loose>,
    pub invoice_date: Option<Loose>,
    pub due_date: Option<Loose>,
    pub subtotal: Option<Loose>,
    pub tax: Option<Loose>,
    pub total_amount: Option<Loose>,
    pub currency: Option<Loose>,
    /// Kept as raw JSON: the model sometimes answers `"N/A"` or a list of strings.
    pub line_items: Option<Value>,
    pub confidence_score: Option<Loose>,
    pub rationale: Option<Loose>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLineItem {
    pub description: Option<Loose>,
    pub quantity: Option<Loose>,
    pub unit_price: Option<Loose>,
    pub total: Option<Loose>,
}

fn text(field: Option<&Loose>) -> Option<String> {
    field.and_then(Loose::as_text)
}

fn amount(field: Option<&Loose>) -> f64 {
    field
        .and_then(Loose::as_amount)
        .map(normalizer::non_negative)
        .unwrap_or(0.0)
}

/// Object entries of a `lineItems` array; anything else is dropped.
fn line_items(value: Option<Value>) -> Vec<LineItem> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value::<RawLineItem>(item).ok())
        .map(LineItem::from)
        .collect()
}

fn confidence(field: Option<&Loose>) -> f64 {
    match field.and_then(Loose::as_amount) {
        Some(score) if score.is_finite() => score.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

impl From<RawLineItem> for LineItem {
    fn from(raw: RawLineItem) -> Self {
        Self {
            description: normalizer::clean_text(text(raw.description.as_ref()), NOT_AVAILABLE),
            quantity: amount(raw.quantity.as_ref()),
            unit_price: amount(raw.unit_price.as_ref()),
            total: amount(raw.total.as_ref()),
        }
    }
}

impl InvoiceExtraction {
    /// Fill defaults and normalize dates. A missing invoice date becomes
    /// `today`; a missing due date becomes the invoice date.
    pub fn from_raw(raw: RawInvoice, today: NaiveDate) -> Self {
        let today = today.format(DATE_FORMAT).to_string();
        let invoice_date = normalizer::parse_date(text(raw.invoice_date.as_ref()).as_deref(), &today);
        let due_date = normalizer::parse_date(text(raw.due_date.as_ref()).as_deref(), &invoice_date);

        Self {
            vendor_name: normalizer::clean_text(text(raw.vendor_name.as_ref()), UNKNOWN_VENDOR),
            invoice_number: normalizer::clean_text(text(raw.invoice_number.as_ref()), NOT_AVAILABLE),
            invoice_date,
            due_date,
            subtotal: amount(raw.subtotal.as_ref()),
            tax: amount(raw.tax.as_ref()),
            total_amount: amount(raw.total_amount.as_ref()),
            currency: normalizer::clean_text(text(raw.currency.as_ref()), DEFAULT_CURRENCY),
            line_items: line_items(raw.line_items),
            confidence_score: confidence(raw.confidence_score.as_ref()),
            rationale: normalizer::clean_text(text(raw.rationale.as_ref()), NOT_AVAILABLE),
            status: PENDING_REVIEW.to_string(),
        }
    }

    /// Best-effort record returned when the model could not be used.
    pub fn ai_error(message: &str, today: NaiveDate) -> Self {
        let today = today.format(DATE_FORMAT).to_string();

        Self {
            vendor_name: "AI Error".to_string(),
            invoice_number: NOT_AVAILABLE.to_string(),
            invoice_date: today.clone(),
            due_date: today,
            subtotal: 0.0,
            tax: 0.0,
            total_amount: 0.0,
            currency: DEFAULT_CURRENCY.to_string(),
            line_items: Vec::new(),
            confidence_score: 0.0,
            rationale: message.to_string(),
            status: format!("AI Error: {}", message),
        }
    }

    pub fn is_ai_error(&self) -> bool {
        self.status.starts_with("AI Error")
    }
}
