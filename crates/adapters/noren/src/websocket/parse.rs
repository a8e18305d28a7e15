//! Parsing of incoming Noren feed frames.

use serde_json::Value;

use crate::websocket::{error::NorenWsError, messages::NorenWsMessage};

/// Parses a text frame into a [`NorenWsMessage`].
///
/// Frames with an unrecognised `t` are returned as [`NorenWsMessage::Unknown`].
///
/// # Errors
///
/// Returns [`NorenWsError::ParseError`] if the text is not JSON or a known frame is malformed.
pub fn parse_ws_message(text: &str) -> Result<NorenWsMessage, NorenWsError> {
    let value: Value = serde_json::from_str(text)?;
    parse_ws_value(value)
}

pub fn parse_ws_value(value: Value) -> Result<NorenWsMessage, NorenWsError> {
    let Some(kind) = value.get("t").and_then(Value::as_str).map(str::to_string) else {
        return Ok(NorenWsMessage::Unknown(value));
    };

    let message = match kind.as_str() {
        "ck" => NorenWsMessage::ConnectAck(serde_json::from_value(value)?),
        "tk" => NorenWsMessage::TouchlineAck(serde_json::from_value(value)?),
        "tf" => NorenWsMessage::TouchlineFeed(serde_json::from_value(value)?),
        "dk" => NorenWsMessage::DepthAck(serde_json::from_value(value)?),
        "df" => NorenWsMessage::DepthFeed(serde_json::from_value(value)?),
        "ok" => NorenWsMessage::OrdersAck(value),
        "om" => NorenWsMessage::OrderUpdate(serde_json::from_value(value)?),
        "uk" | "udk" | "uok" => NorenWsMessage::UnsubscribeAck {
            kind,
            payload: value,
        },
        _ => NorenWsMessage::Unknown(value),
    };
    Ok(message)
}
