//! Normalization of loosely formatted model output.

use chrono::NaiveDate;

const DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d", "%Y.%m.%d"];

/// Rewrites a date to `DD-MM-YYYY`. Anything unparseable becomes empty.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(|date| date.format("%d-%m-%Y").to_string())
        .unwrap_or_default()
}

/// Whole currency units from a printed amount, truncating any fraction.
///
/// Handles both `1,234.56` and `1.234,56` conventions, spaces as thousands
/// separators, and trailing currency markers such as `kr`, `SEK` or `:-`.
/// Returns 0 when no digits are present.
pub fn parse_cost(raw: &str) -> i64 {
    let negative = raw.trim_start().starts_with('-');
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let kept = kept.trim_matches(|c: char| c == ',' || c == '.');
    if kept.is_empty() {
        return 0;
    }

    let integer_part = match decimal_separator(kept) {
        Some(idx) => &kept[..idx],
        None => kept,
    };
    let digits: String = integer_part.chars().filter(char::is_ascii_digit).collect();
    let value = digits.parse::<i64>().unwrap_or(0);
    if negative {
        -value
    } else {
        value
    }
}

/// Byte index of the decimal separator, if the amount has a fractional part.
///
/// The last separator is decimal when both kinds appear. A lone separator kind
/// is decimal only when it appears once and is followed by one or two digits;
/// otherwise it groups thousands.
fn decimal_separator(amount: &str) -> Option<usize> {
    let last_comma = amount.rfind(',');
    let last_dot = amount.rfind('.');
    match (last_comma, last_dot) {
        (Some(c), Some(d)) => Some(c.max(d)),
        (Some(idx), None) | (None, Some(idx)) => {
            let sep = amount.as_bytes()[idx];
            let occurrences = amount.bytes().filter(|b| *b == sep).count();
            let tail = amount.len() - idx - 1;
            (occurrences == 1 && (1..=2).contains(&tail)).then_some(idx)
        }
        (None, None) => None,
    }
}
