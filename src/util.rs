// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" CSV/number handling so the rest of
// the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Strips thousands separators like `","` before parsing.
/// - Accepts exponent notation such as `1.5E-3`.
/// - Returns `None` for anything that cannot be safely parsed, including
///   placeholders such as `-` or `*` and the non-finite `NaN` / `inf`.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Strip a UTF-8 byte-order mark that some exports put on the first header.
pub fn strip_bom(s: &str) -> &str {
    s.trim_start_matches('\u{feff}')
}

pub fn average(v: &[f64]) -> Option<f64> {
    // Arithmetic mean; `None` for an empty slice so callers can tell
    // "no data" apart from a real zero.
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Mean over the present values only, like a dataframe `mean()` that skips NaN.
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let present: Vec<f64> = values.into_iter().flatten().collect();
    average(&present)
}

pub fn round_to(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (n * factor).round() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// `format_number` for optional values; missing renders as an empty cell.
pub fn format_opt(n: Option<f64>, decimals: usize) -> String {
    n.map(|v| format_number(v, decimals)).unwrap_or_default()
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `1,020 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_f64_safe_handles_placeholders() {
        assert_eq!(parse_f64_safe(Some(" 12.5 ")), Some(12.5));
        assert_eq!(parse_f64_safe(Some("1,234")), Some(1234.0));
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("-")), None);
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("inf")), None);
        assert_eq!(parse_f64_safe(Some("-Infinity")), None);
        assert_eq!(parse_f64_safe(Some("측정불가")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parse_f64_safe_reads_exponent_notation() {
        assert_eq!(parse_f64_safe(Some("1.5E-3")), Some(0.0015));
        assert_eq!(parse_f64_safe(Some("2e1")), Some(20.0));
        assert_eq!(parse_f64_safe(Some("1e400")), None);
    }

    #[test]
    fn mean_present_skips_missing() {
        assert_eq!(mean_present(vec![Some(10.0), None, Some(20.0)]), Some(15.0));
        assert_eq!(mean_present(vec![None, None]), None);
    }

    #[test]
    fn format_number_inserts_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-5.0, 1), "-5.0");
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_opt(None, 2), "");
    }

    #[test]
    fn strip_bom_only_touches_leading_mark() {
        assert_eq!(strip_bom("\u{feff}구분(1)"), "구분(1)");
        assert_eq!(strip_bom("province"), "province");
    }
}
