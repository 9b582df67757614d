use axum::extract::FromRequest;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer};

use crate::error::AppError;

/// `axum::Json` whose rejection is a 400 envelope instead of plain text
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Largest value a `NUMERIC(10, 2)` column holds: 99999999.99, whose
/// mantissa 9_999_999_999 spans the low two 32-bit words
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Path ids must be positive integers
pub fn parse_id(raw: &str, what: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::ValidationError(format!("{} must be a positive integer", what)))
}

/// Accepts an id sent either as a JSON number or a numeric string
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    let id = match RawId::deserialize(deserializer)? {
        RawId::Number(n) => i32::try_from(n).map_err(|_| de::Error::custom("id out of range"))?,
        RawId::Text(s) => s
            .trim()
            .parse::<i32>()
            .map_err(|_| de::Error::custom(format!("invalid id '{}'", s)))?,
    };

    if id <= 0 {
        return Err(de::Error::custom("id must be a positive integer"));
    }
    Ok(id)
}

/// Distances, weights and rates: non-negative, at most two decimal places
pub fn check_amount(field: &str, value: Decimal) -> Result<(), AppError> {
    if value < Decimal::ZERO {
        return Err(AppError::ValidationError(format!("{} must not be negative", field)));
    }
    if value.normalize().scale() > 2 {
        return Err(AppError::ValidationError(format!(
            "{} must have at most 2 decimal places",
            field
        )));
    }
    if value > MAX_AMOUNT {
        return Err(AppError::ValidationError(format!("{} is too large", field)));
    }
    Ok(())
}
