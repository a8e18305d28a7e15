//! Parsing utilities for Noren payloads.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::consts::{NOREN_DATETIME_FORMAT, NOREN_KEY_DELIMITER, NOREN_STAT_OK};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Whether the payload is an object carrying `"stat": "Ok"`.
#[must_use]
pub fn is_stat_ok(value: &Value) -> bool {
    value.get("stat").and_then(Value::as_str) == Some(NOREN_STAT_OK)
}

/// Error message of a rejected call (`emsg`), if any.
#[must_use]
pub fn extract_emsg(value: &Value) -> Option<String> {
    value
        .get("emsg")
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

/// Encodes a request body in the `jData=<json>[&jKey=<token>]` form expected by the OMS.
///
/// # Errors
///
/// Returns [`ParseError::InvalidJson`] if `payload` cannot be serialized.
pub fn encode_jdata<T: Serialize + ?Sized>(
    payload: &T,
    jkey: Option<&str>,
) -> Result<String, ParseError> {
    let json = serde_json::to_string(payload).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    Ok(match jkey {
        Some(key) => format!("jData={json}&jKey={key}"),
        None => format!("jData={json}"),
    })
}

#[must_use]
pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Builds an instrument key such as `NSE|22`.
#[must_use]
pub fn make_instrument_key(exchange: &str, token: &str) -> String {
    format!("{exchange}{NOREN_KEY_DELIMITER}{token}")
}

/// Splits an instrument key into exchange and token.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] when either half is missing.
pub fn split_instrument_key(key: &str) -> Result<(&str, &str), ParseError> {
    match key.split_once(NOREN_KEY_DELIMITER) {
        Some((exchange, token)) if !exchange.is_empty() && !token.is_empty() => {
            Ok((exchange, token))
        }
        _ => Err(ParseError::InvalidValue(format!(
            "instrument key '{key}' is not EXCHANGE|TOKEN"
        ))),
    }
}

/// Rolls a weekend date back to the preceding Friday. Weekdays are returned unchanged.
#[must_use]
pub fn last_business_day(date: NaiveDate) -> NaiveDate {
    let back = match date.weekday() {
        Weekday::Sat => 1,
        Weekday::Sun => 2,
        _ => 0,
    };
    date - Days::new(back)
}

/// Seconds since the Unix epoch of midnight on `date`, read as UTC.
#[must_use]
pub fn epoch_seconds_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Formats a datetime in the `dd-MM-yyyy HH:mm:ss` layout used by the OMS.
#[must_use]
pub fn format_noren_datetime(datetime: &NaiveDateTime) -> String {
    datetime.format(NOREN_DATETIME_FORMAT).to_string()
}

/// Parses a `dd-MM-yyyy HH:mm:ss` datetime.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] when the text does not match the layout.
pub fn parse_noren_datetime(text: &str) -> Result<NaiveDateTime, ParseError> {
    NaiveDateTime::parse_from_str(text.trim(), NOREN_DATETIME_FORMAT)
        .map_err(|e| ParseError::InvalidValue(format!("'{text}': {e}")))
}
