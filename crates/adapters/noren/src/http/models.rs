// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Data models for Noren REST API responses.
//!
//! The OMS answers every call with a JSON object carrying `stat`:
//! - Success: `{"stat": "Ok", ...fields}`
//! - Error: `{"stat": "Not_Ok", "emsg": "error message"}`
//!
//! List endpoints (books, `TPSeries`) return a bare JSON array on success. Numbers usually come
//! as strings, so numeric fields accept both forms. Fields not modelled here are kept in `extra`.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use ustr::Ustr;

use crate::common::parse::{parse_noren_datetime, ParseError};

/// `QuickAuth` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub stat: String,
    /// Session token, sent back as `jKey` on every later call.
    #[serde(default)]
    pub susertoken: Option<String>,
    #[serde(default)]
    pub actid: Option<String>,
    #[serde(default)]
    pub uname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub brkname: Option<String>,
    #[serde(default)]
    pub lastaccesstime: Option<String>,
    #[serde(default)]
    pub request_time: Option<String>,
    /// Exchanges enabled for the account.
    #[serde(default)]
    pub exarr: Vec<Ustr>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Access token issued by `GenAcsTok` in exchange for an authorization code.
#[serde_as]
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthTokenInfo {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default, alias = "UID")]
    pub uid: String,
    #[serde(default, alias = "ACTID")]
    pub actid: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub expires_in: Option<u64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl std::fmt::Debug for OAuthTokenInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokenInfo")
            .field("uid", &self.uid)
            .field("actid", &self.actid)
            .field("has_access_token", &self.access_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScripValue {
    pub exch: Ustr,
    pub tsym: Ustr,
    pub token: Ustr,
    /// Price precision.
    #[serde(default)]
    pub pp: Option<String>,
    /// Tick size.
    #[serde(default)]
    pub ti: Option<String>,
    /// Lot size.
    #[serde(default)]
    pub ls: Option<String>,
    #[serde(default)]
    pub cname: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchScripResponse {
    pub stat: String,
    #[serde(default)]
    pub values: Vec<ScripValue>,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub stat: String,
    pub exch: Ustr,
    pub tsym: Ustr,
    pub token: Ustr,
    /// Last traded price.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub lp: Option<f64>,
    /// Previous close.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub c: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub o: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub h: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub l: Option<f64>,
    /// Volume.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub v: Option<u64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub bp1: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub sp1: Option<f64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsResponse {
    pub stat: String,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub cash: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub payin: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub marginused: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub brkcollamt: Option<f64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderResponse {
    pub stat: String,
    pub norenordno: String,
    #[serde(default)]
    pub request_time: Option<String>,
}

/// Response to `ModifyOrder` and `CancelOrder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderActionResponse {
    pub stat: String,
    /// Order number the action applied to.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub request_time: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketMarginResponse {
    pub stat: String,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub marginused: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub marginusedtrade: Option<f64>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// One candle of a `TPSeries` response.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePriceBar {
    #[serde(default)]
    pub stat: Option<String>,
    /// Bar start in `dd-MM-yyyy HH:mm:ss`.
    pub time: String,
    /// Bar start in seconds since the epoch.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub ssboe: Option<i64>,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub into: f64,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub inth: f64,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub intl: f64,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub intc: f64,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub intvwap: Option<f64>,
    /// Interval volume.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub intv: Option<u64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub intoi: Option<u64>,
}

impl TimePriceBar {
    /// Parses [`Self::time`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] if the time is not in the OMS layout.
    pub fn datetime(&self) -> Result<NaiveDateTime, ParseError> {
        parse_noren_datetime(&self.time)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn test_login_response_keeps_unknown_fields() {
        let resp: LoginResponse = serde_json::from_value(json!({
            "stat": "Ok",
            "susertoken": "2fe3a1b2",
            "actid": "FA12345",
            "uname": "TEST USER",
            "exarr": ["NSE", "NFO"],
            "prarr": [{"prd": "C", "s_prdt_ali": "CNC"}],
        }))
        .unwrap();

        assert_eq!(resp.susertoken.as_deref(), Some("2fe3a1b2"));
        assert_eq!(resp.exarr, vec![Ustr::from("NSE"), Ustr::from("NFO")]);
        assert!(resp.extra.contains_key("prarr"));
    }

    #[rstest]
    fn test_quote_response_numbers_as_strings() {
        let resp: QuoteResponse = serde_json::from_value(json!({
            "stat": "Ok",
            "exch": "NSE",
            "tsym": "ACC-EQ",
            "token": "22",
            "lp": "2265.05",
            "c": 2250.1,
            "v": "120034",
            "ls": "1",
        }))
        .unwrap();

        assert_eq!(resp.lp, Some(2265.05));
        assert_eq!(resp.c, Some(2250.1));
        assert_eq!(resp.v, Some(120_034));
        assert_eq!(resp.o, None);
        assert_eq!(resp.extra.get("ls"), Some(&json!("1")));
    }

    #[rstest]
    fn test_search_response() {
        let resp: SearchScripResponse = serde_json::from_value(json!({
            "stat": "Ok",
            "values": [
                {"exch": "NSE", "tsym": "REL50-EQ", "token": "3045", "pp": "2", "ti": "0.05", "ls": "1"},
            ],
        }))
        .unwrap();
        assert_eq!(resp.values.len(), 1);
        assert_eq!(resp.values[0].token, "3045");
    }

    #[rstest]
    fn test_time_price_bar() {
        let bar: TimePriceBar = serde_json::from_value(json!({
            "stat": "Ok",
            "time": "18-01-2023 09:15:00",
            "ssboe": "1674013500",
            "into": "520.00",
            "inth": "521.50",
            "intl": "519.10",
            "intc": "520.75",
            "intvwap": "520.43",
            "intv": "1452",
            "intoi": "0",
        }))
        .unwrap();

        assert_eq!(bar.intc, 520.75);
        assert_eq!(bar.ssboe, Some(1_674_013_500));
        assert_eq!(bar.datetime().unwrap().to_string(), "2023-01-18 09:15:00");
    }

    #[rstest]
    fn test_oauth_token_info_debug_hides_token() {
        let info: OAuthTokenInfo = serde_json::from_value(json!({
            "access_token": "eyJhbGciOi",
            "uid": "USER1",
            "actid": "USER1",
            "expires_in": "3600",
        }))
        .unwrap();

        assert_eq!(info.expires_in, Some(3600));
        assert!(!format!("{info:?}").contains("eyJhbGciOi"));
    }
}
