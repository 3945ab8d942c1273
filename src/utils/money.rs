// Validação de valores monetários vindos do checkout

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is required")]
    Empty,
    #[error("amount must be a number")]
    NotNumeric,
    #[error("amount must be greater than zero")]
    NotPositive,
}

pub fn parse_amount(raw: &str) -> Result<Decimal, AmountError> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Err(AmountError::Empty);
    }

    let value = Decimal::from_str(cleaned)
        .or_else(|_| Decimal::from_scientific(cleaned))
        .map_err(|_| AmountError::NotNumeric)?;

    if value <= Decimal::ZERO {
        return Err(AmountError::NotPositive);
    }
    Ok(value)
}

/// Checks the amount and returns the text to forward. The caller's rendering is
/// kept as-is so the processor sees what the page showed.
pub fn validate_amount(raw: &str) -> Result<String, AmountError> {
    parse_amount(raw)?;
    Ok(raw.trim().to_string())
}

/// Renders a JSON number amount the way a browser's `Number#toString` would:
/// `100.0` and `1e2` both become `100`. Unparseable input is returned untouched
/// and left for `validate_amount` to refuse.
pub fn format_number_amount(raw: &str) -> String {
    match Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)) {
        Ok(value) => value.normalize().to_string(),
        Err(_) => raw.to_string(),
    }
}
