//! Numeric extraction helpers for instrument responses.
//!
//! Instruments answer measurement queries in a variety of shapes: a bare
//! number (`"5"`), SCPI scientific notation (`"+1.23E-04"`), a value with a
//! unit suffix (`"3.300V"`), or a value embedded in an echoed header
//! (`"C1:PAVA PKPK,1.23E+00V"`). The helpers here pull numbers out of all
//! of these without failing the measurement session on one odd reply.

use std::sync::LazyLock;

use regex::Regex;

// A number must not be glued to a word character on its left, so the
// channel digit in headers like `C1:` or `CH2` is never picked up.
static SCIENTIFIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w.+-])([+-]?\d+(?:\.\d+)?[Ee][+-]?\d+)").expect("valid scientific regex")
});
static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w.+-])([+-]?\d+\.\d+)").expect("valid decimal regex")
});
static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w.+-])([+-]?\d+)").expect("valid integer regex"));

/// Parse every number in an instrument response.
///
/// Tries, in order: a direct float parse of the whole (trimmed) response,
/// then all scientific-notation matches, then all decimal matches, then
/// all integer matches. The first strategy that yields anything wins.
/// Returns `None` if the response contains no number at all.
///
/// # Example
///
/// ```
/// use benchlib_core::parse_numbers;
///
/// assert_eq!(parse_numbers("+1.23E-04"), Some(vec![1.23e-4]));
/// assert_eq!(parse_numbers("C1:PAVA PKPK,2.50E+00V"), Some(vec![2.5]));
/// assert_eq!(parse_numbers("VOLT 12.5,CURR 0.25"), Some(vec![12.5, 0.25]));
/// assert_eq!(parse_numbers("VOLT,DC,AUTO"), None);
/// ```
pub fn parse_numbers(response: &str) -> Option<Vec<f64>> {
    let trimmed = response.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        if value.is_finite() {
            return Some(vec![value]);
        }
    }

    [&*SCIENTIFIC, &*DECIMAL, &*INTEGER]
        .into_iter()
        .map(|pattern| {
            pattern
                .captures_iter(trimmed)
                .filter_map(|caps| caps.get(1))
                .filter_map(|m| m.as_str().parse::<f64>().ok())
                .collect::<Vec<f64>>()
        })
        .find(|values| !values.is_empty())
}

/// Extract numbers from a response, falling back to `[0.0]`.
///
/// A reply with no numeric content logs a warning and yields a single
/// zero, so one malformed reading does not abort a long test run.
///
/// # Example
///
/// ```
/// use benchlib_core::extract_numbers;
///
/// assert_eq!(extract_numbers("5"), vec![5.0]);
/// assert_eq!(extract_numbers("VOLT,DC,AUTO"), vec![0.0]);
/// ```
pub fn extract_numbers(response: &str) -> Vec<f64> {
    match parse_numbers(response) {
        Some(values) => values,
        None => {
            tracing::warn!(
                response = %response,
                "No numeric value found in instrument response, using 0.0"
            );
            vec![0.0]
        }
    }
}

/// First number in a response, or `0.0` (with a warning) if there is none.
pub fn extract_number(response: &str) -> f64 {
    extract_numbers(response).first().copied().unwrap_or(0.0)
}
