//! Lenient decoding of loosely-typed input (form fields, spreadsheet cells).
//!
//! Nothing here fails: malformed numbers become zero and malformed JSON
//! becomes the type's default, with a warning logged.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::catalog::{Variation, DEFAULT_VARIATION_TYPE};

/// Parse a locale-formatted price.
///
/// * both `.` and `,` present: `.` is a thousands separator, `,` the decimal
///   separator (`"1.200,50"` is 1200.50);
/// * only `,` present: `,` is the decimal separator (`"214,29"`);
/// * otherwise the string is parsed as-is (`"199.99"`).
///
/// Missing, unparseable, and negative input yields zero.
#[must_use]
pub fn parse_price(raw: &str) -> Decimal {
    let s = raw.trim();
    let normalized = if s.contains('.') && s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else if s.contains(',') {
        s.replace(',', ".")
    } else {
        s.to_string()
    };
    Decimal::from_str(&normalized)
        .ok()
        .filter(|d| !d.is_sign_negative())
        .unwrap_or(Decimal::ZERO)
}

/// Like [`parse_price`] but distinguishes an absent or blank value.
#[must_use]
pub fn parse_price_opt(raw: Option<&str>) -> Option<Decimal> {
    raw.filter(|s| !s.trim().is_empty()).map(parse_price)
}

/// Parse a stock quantity. Fractional input is truncated; missing,
/// unparseable, and negative input yields zero.
#[must_use]
pub fn parse_stock(raw: &str) -> i32 {
    let s = raw.trim();
    let value = s.parse::<i64>().ok().or_else(|| {
        Decimal::from_str(&s.replace(',', "."))
            .ok()
            .and_then(|d| d.trunc().to_i64())
    });
    value
        .map(|v| v.clamp(0, i64::from(i32::MAX)))
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(0)
}

/// `"true"`, `"1"`, `"on"`, and `"yes"` (any case) are true; anything else is false.
#[must_use]
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

/// Decode a JSON-encoded form field, falling back to `T::default()`.
#[must_use]
pub fn parse_json_or_default<T>(field: &str, raw: Option<&str>) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return T::default();
    };
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(field, error = %e, "malformed JSON form field; using empty default");
            T::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct VariationInput {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    value: String,
    price: Option<serde_json::Value>,
    stock: Option<serde_json::Value>,
    #[serde(default)]
    sku: String,
}

/// Decode a JSON-encoded variations list. Variations without a price take
/// `parent_price`; prices and stock may be numbers or strings.
#[must_use]
pub fn parse_variations(raw: Option<&str>, parent_price: Decimal) -> Vec<Variation> {
    let inputs: Vec<VariationInput> = parse_json_or_default("variations", raw);
    inputs
        .into_iter()
        .map(|v| Variation {
            kind: v
                .kind
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| DEFAULT_VARIATION_TYPE.to_string()),
            value: v.value.trim().to_string(),
            price: v
                .price
                .as_ref()
                .and_then(json_scalar)
                .and_then(|s| parse_price_opt(Some(&s)))
                .unwrap_or(parent_price),
            stock: v
                .stock
                .as_ref()
                .and_then(json_scalar)
                .map_or(0, |s| parse_stock(&s)),
            sku: v.sku.trim().to_string(),
        })
        .collect()
}

fn json_scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
