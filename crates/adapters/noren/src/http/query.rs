//! Request parameter structs for the Noren REST API.
//!
//! Field names serialize to the short keys the OMS expects. Numbers are sent as strings.
//! The client adds `uid`/`actid` from the active session, so they never appear here.

use derive_builder::Builder;
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};
use ustr::Ustr;

use crate::common::{
    consts::{NOREN_APK_VERSION, NOREN_SOURCE},
    credential::NorenCredential,
    enums::{NorenPriceType, NorenProductType, NorenRetention, NorenTransactionType},
};

/// `QuickAuth` body, built from a [`NorenCredential`].
#[derive(Clone, Debug, Serialize)]
pub struct LoginParams {
    pub source: &'static str,
    pub apkversion: &'static str,
    pub uid: String,
    pub pwd: String,
    pub factor2: String,
    pub vc: String,
    pub appkey: String,
    pub imei: String,
}

impl From<&NorenCredential> for LoginParams {
    fn from(cred: &NorenCredential) -> Self {
        Self {
            source: NOREN_SOURCE,
            apkversion: NOREN_APK_VERSION,
            uid: cred.user_id.clone(),
            pwd: cred.password_hash(),
            factor2: cred.factor2.clone(),
            vc: cred.vendor_code.clone(),
            appkey: cred.app_key(),
            imei: cred.imei.clone(),
        }
    }
}

/// `GenAcsTok` body exchanging an authorization code for an access token.
#[derive(Clone, Debug, Serialize)]
pub struct AccessTokenRequest {
    pub code: String,
    pub checksum: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ForgotPasswordOtpParams {
    pub uid: String,
    pub pan: String,
}

#[derive(Clone, Debug, Serialize, Builder)]
#[builder(setter(into))]
pub struct SearchScripParams {
    #[serde(rename = "exch")]
    pub exchange: Ustr,
    /// Free text matched against trading symbols.
    #[serde(rename = "stext")]
    pub search_text: String,
}

#[derive(Clone, Debug, Serialize, Builder)]
#[builder(setter(into))]
pub struct QuoteParams {
    #[serde(rename = "exch")]
    pub exchange: Ustr,
    pub token: Ustr,
}

#[derive(Clone, Debug, Default, Serialize, Builder)]
#[builder(setter(into, strip_option), default)]
pub struct LimitsParams {
    #[serde(rename = "prd")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<NorenProductType>,
    #[serde(rename = "seg")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(rename = "exch")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<Ustr>,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Builder)]
#[builder(setter(into, strip_option), build_fn(validate = "Self::validate"))]
pub struct PlaceOrderParams {
    #[serde(rename = "trantype")]
    pub transaction_type: NorenTransactionType,
    #[serde(rename = "prd")]
    pub product_type: NorenProductType,
    #[serde(rename = "exch")]
    pub exchange: Ustr,
    #[serde(rename = "tsym")]
    pub trading_symbol: Ustr,
    #[serde_as(as = "DisplayFromStr")]
    pub qty: u64,
    #[serde(rename = "dscqty")]
    #[serde_as(as = "DisplayFromStr")]
    #[builder(default)]
    pub disclosed_qty: u64,
    #[serde(rename = "prctyp")]
    pub price_type: NorenPriceType,
    #[serde(rename = "prc")]
    #[serde_as(as = "DisplayFromStr")]
    #[builder(default)]
    pub price: f64,
    #[serde(rename = "trgprc")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
    #[serde(rename = "ret")]
    #[builder(default)]
    pub retention: NorenRetention,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// After market order flag, sent as `Yes` when set.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amo: Option<String>,
    /// Stop loss leg of a bracket/cover order.
    #[serde(rename = "blprc")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookloss_price: Option<f64>,
    /// Target leg of a bracket order.
    #[serde(rename = "bpprc")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookprofit_price: Option<f64>,
    #[serde(rename = "trailprc")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trail_price: Option<f64>,
}

impl PlaceOrderParamsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.qty == Some(0) {
            return Err("qty must be greater than zero".to_string());
        }
        if let Some(price_type) = self.price_type {
            let has_trigger = matches!(self.trigger_price, Some(Some(_)));
            if price_type.requires_trigger() && !has_trigger {
                return Err(format!("{price_type} orders require a trigger price"));
            }
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Builder)]
#[builder(setter(into, strip_option))]
pub struct ModifyOrderParams {
    #[serde(rename = "norenordno")]
    pub order_id: String,
    #[serde(rename = "exch")]
    pub exchange: Ustr,
    #[serde(rename = "tsym")]
    pub trading_symbol: Ustr,
    #[serde_as(as = "DisplayFromStr")]
    pub qty: u64,
    #[serde(rename = "prctyp")]
    pub price_type: NorenPriceType,
    #[serde(rename = "prc")]
    #[serde_as(as = "DisplayFromStr")]
    #[builder(default)]
    pub price: f64,
    #[serde(rename = "trgprc")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
    #[serde(rename = "ret")]
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<NorenRetention>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CancelOrderParams {
    #[serde(rename = "norenordno")]
    pub order_id: String,
}

impl CancelOrderParams {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SingleOrderHistoryParams {
    #[serde(rename = "norenordno")]
    pub order_id: String,
}

/// One leg of a basket margin request.
#[serde_as]
#[derive(Clone, Debug, Serialize, Builder)]
#[builder(setter(into, strip_option))]
pub struct BasketItem {
    #[serde(rename = "exch")]
    pub exchange: Ustr,
    #[serde(rename = "tsym")]
    pub trading_symbol: Ustr,
    #[serde_as(as = "DisplayFromStr")]
    pub qty: u64,
    #[serde(rename = "prc")]
    #[serde_as(as = "DisplayFromStr")]
    #[builder(default)]
    pub price: f64,
    #[serde(rename = "prd")]
    pub product_type: NorenProductType,
    #[serde(rename = "trantype")]
    pub transaction_type: NorenTransactionType,
    #[serde(rename = "prctyp")]
    pub price_type: NorenPriceType,
    #[serde(rename = "trgprc")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
}

/// `GetBasketMargin` body: the first leg is sent inline, the rest under `basketlists`.
#[derive(Clone, Debug, Serialize)]
pub struct BasketMarginParams {
    #[serde(flatten)]
    primary: BasketItem,
    #[serde(rename = "basketlists", skip_serializing_if = "Vec::is_empty")]
    others: Vec<BasketItem>,
}

impl BasketMarginParams {
    /// Returns `None` for an empty basket.
    #[must_use]
    pub fn new(mut items: Vec<BasketItem>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        let primary = items.remove(0);
        Some(Self {
            primary,
            others: items,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.others.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Builder)]
#[builder(setter(into, strip_option))]
pub struct TimePriceSeriesParams {
    #[serde(rename = "exch")]
    pub exchange: Ustr,
    pub token: Ustr,
    /// Start, seconds since the Unix epoch.
    #[serde(rename = "st")]
    #[serde_as(as = "DisplayFromStr")]
    pub start_time: i64,
    /// End, seconds since the Unix epoch. The OMS defaults to now.
    #[serde(rename = "et")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Candle interval in minutes. The OMS defaults to one minute.
    #[serde(rename = "intrv")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
}
