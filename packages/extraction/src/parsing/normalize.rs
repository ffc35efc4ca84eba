//! Monetary value normalization.

/// Amounts at or beyond this magnitude are treated as OCR noise.
pub const MAX_PLAUSIBLE_AMOUNT: f64 = 1e12;

/// Turn a captured monetary string into a number.
///
/// Accounting parentheses mark a negative amount. Dollar signs, thousands
/// separators and interior whitespace are dropped. Returns `None` for
/// empty or unparseable input and for magnitudes above
/// [`MAX_PLAUSIBLE_AMOUNT`].
///
/// ```rust
/// use filing_extraction::parsing::normalize_amount;
///
/// assert_eq!(normalize_amount("$1,234,567"), Some(1234567.0));
/// assert_eq!(normalize_amount("(1,234)"), Some(-1234.0));
/// assert_eq!(normalize_amount("9999999999999"), None);
/// ```
pub fn normalize_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    // Only plain decimal notation; rejects "inf", "NaN" and exponents
    let digits = cleaned.strip_prefix('-').unwrap_or(&cleaned);
    if digits.is_empty()
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        || digits.chars().filter(|c| *c == '.').count() > 1
        || !digits.chars().any(|c| c.is_ascii_digit())
    {
        return None;
    }

    let value: f64 = cleaned.parse().ok()?;
    let value = if negative { -value } else { value };

    if !value.is_finite() || value.abs() > MAX_PLAUSIBLE_AMOUNT {
        return None;
    }
    Some(value)
}
