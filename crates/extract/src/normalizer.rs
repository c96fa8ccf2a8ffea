use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Canonical output format for every date in an extraction.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Tried in order; the first format that consumes the whole input wins.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",  // 2025-11-02
    "%m/%d/%Y",  // 11/02/2025
    "%d/%m/%Y",  // 02/11/2025
    "%m-%d-%Y",  // 11-02-2025
    "%d-%m-%Y",  // 02-11-2025
    "%d.%m.%Y",  // 02.11.2025
    "%m.%d.%Y",  // 11.02.2025
    "%b %d, %Y", // Nov 02, 2025
    "%d %b %Y",  // 02 Nov 2025
];

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d(?:[\d.,'\s]*\d)?").expect("amount pattern is valid"));

/// Normalize a date to `YYYY-MM-DD`, falling back to `default` when the input
/// is absent, `n/a`, or in none of the known formats.
pub fn parse_date(input: Option<&str>, default: &str) -> String {
    let Some(raw) = input.map(str::trim) else {
        return default.to_string();
    };
    if raw.is_empty() || raw.eq_ignore_ascii_case("n/a") {
        return default.to_string();
    }

    // chrono's %Y takes one to four digits; only four-digit years count.
    let parsed = DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .find(|date| (1000..=9999).contains(&date.year()));
    if let Some(date) = parsed {
        return date.format(DATE_FORMAT).to_string();
    }

    warn!("Could not parse date: {}. Defaulting.", raw);
    default.to_string()
}

/// Parse a money amount written the way invoices write them:
/// `"$1,234.50"`, `"1.234,50 €"`, `"INR 12 000"`, `"(45.00)"`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let text = text.trim();
    let token = AMOUNT_RE.find(text)?;

    let negative = text[..token.start()].contains('-')
        || (text.starts_with('(') && text.ends_with(')'));

    let compact: String = token
        .as_str()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect();

    let canonical = match (compact.rfind('.'), compact.rfind(',')) {
        // Both separators present: whichever comes last is the decimal point.
        (Some(dot), Some(comma)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (None, Some(comma)) => {
            let decimals = compact.len() - comma - 1;
            if compact.matches(',').count() == 1 && decimals <= 2 {
                compact.replace(',', ".")
            } else {
                compact.replace(',', "")
            }
        }
        (Some(_), None) if compact.matches('.').count() > 1 => compact.replace('.', ""),
        _ => compact,
    };

    let value: f64 = canonical.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Clamp to a finite, non-negative value.
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Trim a model-provided string, substituting `default` when it is missing or blank.
pub fn clean_text(value: Option<String>, default: &str) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Peel a markdown code fence (and any chatter around it) off a JSON answer.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest)
            .trim_start();
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest.trim_end();
    }

    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: &str = "2000-01-01";

    #[test]
    fn test_every_supported_date_format() {
        let cases = [
            ("2025-11-02", "2025-11-02"),
            ("11/02/2025", "2025-11-02"),
            ("25/12/2025", "2025-12-25"),
            ("11-02-2025", "2025-11-02"),
            ("25-12-2025", "2025-12-25"),
            ("02.11.2025", "2025-11-02"),
            ("12.25.2025", "2025-12-25"),
            ("Nov 02, 2025", "2025-11-02"),
            ("02 Nov 2025", "2025-11-02"),
        ];

        for (input, expected) in cases {
            assert_eq!(parse_date(Some(input), DEFAULT), expected, "input: {input}");
        }
    }

    #[test]
    fn test_ambiguous_dates_prefer_month_first() {
        // Slash and dash forms try month-first before day-first.
        assert_eq!(parse_date(Some("02/11/2025"), DEFAULT), "2025-02-11");
        assert_eq!(parse_date(Some("13/02/2025"), DEFAULT), "2025-02-13");
        // Dotted forms are day-first.
        assert_eq!(parse_date(Some("03.04.2025"), DEFAULT), "2025-04-03");
    }

    #[test]
    fn test_absent_or_unparseable_dates_return_default() {
        assert_eq!(parse_date(None, DEFAULT), DEFAULT);
        assert_eq!(parse_date(Some(""), DEFAULT), DEFAULT);
        assert_eq!(parse_date(Some("   "), DEFAULT), DEFAULT);
        assert_eq!(parse_date(Some("N/A"), DEFAULT), DEFAULT);
        assert_eq!(parse_date(Some("n/a"), DEFAULT), DEFAULT);
        assert_eq!(parse_date(Some("next Tuesday"), DEFAULT), DEFAULT);
        assert_eq!(parse_date(Some("2025-13-45"), DEFAULT), DEFAULT);
        assert_eq!(parse_date(Some("not a date"), "whatever"), "whatever");
    }

    #[test]
    fn test_short_years_return_default() {
        assert_eq!(parse_date(Some("11/02/25"), DEFAULT), DEFAULT);
        assert_eq!(parse_date(Some("5-6-24"), DEFAULT), DEFAULT);
        assert_eq!(parse_date(Some("Nov 02, 25"), DEFAULT), DEFAULT);
    }

    #[test]
    fn test_dates_are_trimmed() {
        assert_eq!(parse_date(Some("  2024-02-29 "), DEFAULT), "2024-02-29");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1234.50"), Some(1234.5));
        assert_eq!(parse_amount("$1,234.50"), Some(1234.5));
        assert_eq!(parse_amount("1.234,50 €"), Some(1234.5));
        assert_eq!(parse_amount("INR 12 000"), Some(12000.0));
        assert_eq!(parse_amount("1,234,567"), Some(1234567.0));
        assert_eq!(parse_amount("12,5"), Some(12.5));
        assert_eq!(parse_amount("1.234.567"), Some(1234567.0));
        assert_eq!(parse_amount("-45.00"), Some(-45.0));
        assert_eq!(parse_amount("(45.00)"), Some(-45.0));
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(non_negative(12.5), 12.5);
        assert_eq!(non_negative(-3.0), 0.0);
        assert_eq!(non_negative(f64::NAN), 0.0);
        assert_eq!(non_negative(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(Some("  Acme Ltd \n".to_string()), "N/A"), "Acme Ltd");
        assert_eq!(clean_text(Some("   ".to_string()), "N/A"), "N/A");
        assert_eq!(clean_text(None, "Unknown Vendor"), "Unknown Vendor");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(
            strip_code_fences("Here is the JSON:\n{\"a\": {\"b\": 2}}\nThanks"),
            "{\"a\": {\"b\": 2}}"
        );
        assert_eq!(strip_code_fences("no json here"), "no json here");
    }
}
