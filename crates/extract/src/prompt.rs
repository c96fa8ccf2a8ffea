/// Characters of OCR text sent to the model unless configured otherwise.
pub const DEFAULT_TEXT_LIMIT: usize = 4000;

fn schema_and_rules(today: &str) -> String {
    format!(
        r#"The JSON schema must be:
{{
  "vendorName": "Vendor's company name",
  "invoiceNumber": "The invoice ID or number",
  "invoiceDate": "YYYY-MM-DD",
  "dueDate": "YYYY-MM-DD",
  "subtotal": 0.00,
  "tax": 0.00,
  "totalAmount": 0.00,
  "currency": "e.g., 'INR', 'USD'",
  "lineItems": [
    {{ "description": "Item description", "quantity": 1, "unitPrice": 0.00, "total": 0.00 }}
  ],
  "confidenceScore": 0.0,
  "rationale": "A one-sentence explanation for your extraction."
}}

Rules:
- If a field is not found, return "N/A" for strings, 0.00 for numbers, and [] for lineItems.
- If invoiceDate is not found, use today's date: {today}.
- If dueDate is not found, use the invoiceDate.
- "totalAmount" must be the final total. "subtotal" is the total before tax.
- "lineItems" is an array of objects. Try to find at least one. If none are clear, return an empty array.
- "confidenceScore" is your estimated confidence from 0.0 (low) to 1.0 (high) that you correctly extracted the main fields.
- "rationale" is a *short* (one sentence) justification."#
    )
}

/// Prompt for the OCR path: the invoice arrives as recognised text.
pub fn build_extraction_prompt(ocr_text: &str, today: &str, text_limit: usize) -> String {
    let excerpt: String = ocr_text.chars().take(text_limit).collect();

    format!(
        r#"You are an expert financial analyst. Analyze the following OCR text from an invoice and extract the key fields.
Return your answer in a strict JSON format. Do not include any text outside of the JSON block.

{}

Here is the OCR text (first {} chars):
---
{}
---
"#,
        schema_and_rules(today),
        text_limit,
        excerpt
    )
}

/// Prompt for the multimodal path: the invoice travels as an inline attachment.
pub fn build_document_prompt(today: &str) -> String {
    format!(
        r#"You are an expert financial analyst. Read the attached invoice document and extract the key fields.
Return your answer in a strict JSON format. Do not include any text outside of the JSON block.

{}
"#,
        schema_and_rules(today)
    )
}
