//! WebSocket message types for the Noren feed.
//!
//! Every frame is a JSON object whose `t` field names its kind. Requests use single letters
//! (`c`, `t`, `d`, `o`...), acknowledgements append `k` and feed updates append `f`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use ustr::Ustr;

use crate::common::{
    consts::{NOREN_SOURCE, NOREN_WS_KEY_SEPARATOR},
    parse::make_instrument_key,
    session::SessionAuth,
};
use crate::websocket::subscription::NorenChannel;

/// Frames sent to the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "t")]
pub enum NorenWsRequest {
    #[serde(rename = "c")]
    Connect {
        uid: String,
        actid: String,
        source: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        susertoken: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        accesstoken: Option<String>,
    },
    #[serde(rename = "t")]
    Touchline { k: String },
    #[serde(rename = "u")]
    TouchlineUnsubscribe { k: String },
    #[serde(rename = "d")]
    Depth { k: String },
    #[serde(rename = "ud")]
    DepthUnsubscribe { k: String },
    #[serde(rename = "o")]
    Orders { actid: String },
    #[serde(rename = "uo")]
    OrdersUnsubscribe { actid: String },
}

impl NorenWsRequest {
    /// Connect frame authenticating with a session token or an OAuth access token.
    #[must_use]
    pub fn connect(auth: &SessionAuth) -> Self {
        let (susertoken, accesstoken) = match auth {
            SessionAuth::Session { susertoken, .. } => (Some(susertoken.clone()), None),
            SessionAuth::OAuth { access_token, .. } => (None, Some(access_token.clone())),
        };
        Self::Connect {
            uid: auth.uid().to_string(),
            actid: auth.actid().to_string(),
            source: NOREN_SOURCE.to_string(),
            susertoken,
            accesstoken,
        }
    }

    /// Joins instrument keys into the `k` value of a subscription frame (`NSE|22#NSE|2885`).
    #[must_use]
    pub fn join_keys<S: AsRef<str>>(keys: &[S]) -> String {
        keys.iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(&NOREN_WS_KEY_SEPARATOR.to_string())
    }

    /// Frames subscribing `keys` on `channel`. Instrument channels take one frame for all keys,
    /// order updates take one frame per account.
    #[must_use]
    pub fn subscribe<S: AsRef<str>>(channel: NorenChannel, keys: &[S]) -> Vec<Self> {
        Self::frames(channel, keys, true)
    }

    #[must_use]
    pub fn unsubscribe<S: AsRef<str>>(channel: NorenChannel, keys: &[S]) -> Vec<Self> {
        Self::frames(channel, keys, false)
    }

    fn frames<S: AsRef<str>>(channel: NorenChannel, keys: &[S], subscribe: bool) -> Vec<Self> {
        if keys.is_empty() {
            return Vec::new();
        }
        match (channel, subscribe) {
            (NorenChannel::Touchline, true) => vec![Self::Touchline {
                k: Self::join_keys(keys),
            }],
            (NorenChannel::Touchline, false) => vec![Self::TouchlineUnsubscribe {
                k: Self::join_keys(keys),
            }],
            (NorenChannel::Depth, true) => vec![Self::Depth {
                k: Self::join_keys(keys),
            }],
            (NorenChannel::Depth, false) => vec![Self::DepthUnsubscribe {
                k: Self::join_keys(keys),
            }],
            (NorenChannel::Orders, true) => keys
                .iter()
                .map(|actid| Self::Orders {
                    actid: actid.as_ref().to_string(),
                })
                .collect(),
            (NorenChannel::Orders, false) => keys
                .iter()
                .map(|actid| Self::OrdersUnsubscribe {
                    actid: actid.as_ref().to_string(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Connect acknowledgement (`ck`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NorenConnectAck {
    /// `OK` on success.
    pub s: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub actid: Option<String>,
}

impl NorenConnectAck {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.s.eq_ignore_ascii_case("OK")
    }
}

/// Touchline snapshot (`tk`) or update (`tf`). Updates only carry changed fields.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NorenTouchline {
    /// Exchange.
    pub e: Ustr,
    /// Token.
    pub tk: Ustr,
    #[serde(default)]
    pub ts: Option<Ustr>,
    /// Last traded price.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub lp: Option<f64>,
    /// Percentage change.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub pc: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub v: Option<u64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub o: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub h: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub l: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub c: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub bp1: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub sp1: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub bq1: Option<u64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub sq1: Option<u64>,
    /// Feed time, seconds since the epoch.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub ft: Option<i64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl NorenTouchline {
    /// Instrument key (`NSE|22`) this frame belongs to.
    #[must_use]
    pub fn key(&self) -> String {
        make_instrument_key(&self.e, &self.tk)
    }
}

/// Market depth snapshot (`dk`) or update (`df`). Levels live in `bp1..bp5`, `bq1..bq5`,
/// `sp1..sp5`, `sq1..sq5` and are read through [`Self::bid`] and [`Self::ask`].
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NorenDepth {
    pub e: Ustr,
    pub tk: Ustr,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub lp: Option<f64>,
    #[serde(flatten)]
    pub levels: HashMap<String, Value>,
}

impl NorenDepth {
    #[must_use]
    pub fn key(&self) -> String {
        make_instrument_key(&self.e, &self.tk)
    }

    /// Price and quantity of bid `level` (1 to 5), when present in this frame.
    #[must_use]
    pub fn bid(&self, level: u8) -> Option<(f64, u64)> {
        self.level("bp", "bq", level)
    }

    #[must_use]
    pub fn ask(&self, level: u8) -> Option<(f64, u64)> {
        self.level("sp", "sq", level)
    }

    fn level(&self, price_prefix: &str, qty_prefix: &str, level: u8) -> Option<(f64, u64)> {
        let price = lenient_f64(self.levels.get(&format!("{price_prefix}{level}"))?)?;
        let qty = lenient_f64(self.levels.get(&format!("{qty_prefix}{level}"))?)?;
        Some((price, qty as u64))
    }
}

fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Order update (`om`).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NorenOrderUpdate {
    pub norenordno: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reporttype: Option<String>,
    #[serde(default)]
    pub exch: Option<Ustr>,
    #[serde(default)]
    pub tsym: Option<Ustr>,
    #[serde(default)]
    pub trantype: Option<String>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub qty: Option<u64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub prc: Option<f64>,
    #[serde(default)]
    pub rejreason: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Parsed incoming frame.
#[derive(Debug, Clone)]
pub enum NorenWsMessage {
    ConnectAck(NorenConnectAck),
    TouchlineAck(NorenTouchline),
    TouchlineFeed(NorenTouchline),
    DepthAck(NorenDepth),
    DepthFeed(NorenDepth),
    /// Acknowledgement of an order update subscription (`ok`).
    OrdersAck(Value),
    OrderUpdate(NorenOrderUpdate),
    /// `uk`, `udk` or `uok`.
    UnsubscribeAck { kind: String, payload: Value },
    Unknown(Value),
}

impl NorenWsMessage {
    /// The `t` code of the frame, or `?` for untyped payloads.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            NorenWsMessage::ConnectAck(_) => "ck",
            NorenWsMessage::TouchlineAck(_) => "tk",
            NorenWsMessage::TouchlineFeed(_) => "tf",
            NorenWsMessage::DepthAck(_) => "dk",
            NorenWsMessage::DepthFeed(_) => "df",
            NorenWsMessage::OrdersAck(_) => "ok",
            NorenWsMessage::OrderUpdate(_) => "om",
            NorenWsMessage::UnsubscribeAck { kind, .. } => kind.as_str(),
            NorenWsMessage::Unknown(value) => value.get("t").and_then(Value::as_str).unwrap_or("?"),
        }
    }
}
