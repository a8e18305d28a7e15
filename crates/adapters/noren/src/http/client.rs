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

//! REST client for the Noren OMS.
//!
//! Every endpoint is a `POST` whose body is `jData=<json>`, followed by `&jKey=<susertoken>`
//! for session logins. OAuth sessions send the same body without `jKey` and authenticate with
//! an `Authorization: Bearer` header instead.
//!
//! This module provides:
//! - `NorenHttpInnerClient`: low-level client owning the connection pool and the session.
//! - `NorenHttpClient`: clonable wrapper exposing one method per endpoint.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{
    common::{
        consts::{NOREN_SOURCE, NOREN_USER_AGENT},
        credential::NorenCredential,
        enums::NorenProductType,
        parse::{encode_jdata, extract_emsg, is_stat_ok},
        session::{NorenSession, SessionAuth},
        urls::{NorenRoute, NorenUrl},
    },
    config::NorenConfig,
    http::{
        error::NorenHttpError,
        models::{
            BasketMarginResponse, LimitsResponse, LoginResponse, OAuthTokenInfo,
            OrderActionResponse, PlaceOrderResponse, QuoteResponse, SearchScripResponse,
            TimePriceBar,
        },
        query::{
            BasketMarginParams, CancelOrderParams, ForgotPasswordOtpParams, LimitsParams,
            LoginParams, ModifyOrderParams, PlaceOrderParams, QuoteParams, SearchScripParams,
            SingleOrderHistoryParams, TimePriceSeriesParams,
        },
    },
};

/// Builds the `reqwest` client shared by the REST and OAuth calls.
pub(crate) fn build_http_client(config: &NorenConfig) -> Result<reqwest::Client, NorenHttpError> {
    let mut builder = reqwest::Client::builder().timeout(config.http_timeout());
    if let Some(proxy) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy.as_str())
            .map_err(|e| NorenHttpError::InvalidRequestError(format!("proxy '{proxy}': {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| NorenHttpError::ConnectionError(e.to_string()))
}

/// Posts a `jData` body to `url` and returns the decoded JSON response.
pub(crate) async fn post_jdata<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: String,
    payload: &T,
    auth: Option<&SessionAuth>,
) -> Result<Value, NorenHttpError> {
    let body = encode_jdata(payload, auth.and_then(SessionAuth::jkey))?;

    let mut request = client
        .post(&url)
        .header(USER_AGENT, NOREN_USER_AGENT)
        .header(CONTENT_TYPE, "text/plain")
        .body(body);
    if let Some(bearer) = auth.and_then(SessionAuth::bearer) {
        request = request.header(AUTHORIZATION, bearer);
    }

    let started = Instant::now();
    let resp = request.send().await?;
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    tracing::debug!(
        url = %url,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Noren response"
    );

    if !(200..300).contains(&status) {
        return Err(NorenHttpError::from_http_status(status, text));
    }

    serde_json::from_str(&text)
        .map_err(|e| NorenHttpError::JsonDecodeError(format!("Invalid JSON response: {e}")))
}

/// Returns the response when `stat` is `Ok`, otherwise the mapped `emsg`.
fn expect_ok(value: Value) -> Result<Value, NorenHttpError> {
    if is_stat_ok(&value) {
        Ok(value)
    } else {
        let emsg = extract_emsg(&value).unwrap_or_else(|| format!("unexpected response: {value}"));
        Err(NorenHttpError::from_emsg(emsg))
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, NorenHttpError> {
    Ok(serde_json::from_value(expect_ok(value)?)?)
}

/// List endpoints return an array on success and a `Not_Ok` object when there is nothing to
/// report. The latter becomes `None`. Expired sessions are still surfaced as errors.
fn decode_list(route: NorenRoute, value: Value) -> Result<Option<Vec<Value>>, NorenHttpError> {
    match value {
        Value::Array(items) => Ok(Some(items)),
        other => {
            let emsg = extract_emsg(&other).unwrap_or_default();
            if let err @ NorenHttpError::AuthenticationError(_) = NorenHttpError::from_emsg(emsg) {
                return Err(err);
            }
            tracing::debug!(route = %route, response = %other, "No data");
            Ok(None)
        }
    }
}

/// Serializes `payload` into an object and adds the session identity fields.
fn with_identity<T: Serialize + ?Sized>(
    payload: &T,
    auth: &SessionAuth,
    include_actid: bool,
) -> Result<Value, NorenHttpError> {
    let mut object = match serde_json::to_value(payload)? {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(NorenHttpError::InvalidRequestError(format!(
                "payload must be an object, was {other}"
            )));
        }
    };
    object.insert("uid".to_string(), Value::String(auth.uid().to_string()));
    if include_actid {
        object.insert("actid".to_string(), Value::String(auth.actid().to_string()));
    }
    Ok(Value::Object(object))
}

/// Low-level Noren HTTP client.
#[derive(Debug)]
pub struct NorenHttpInnerClient {
    url: NorenUrl,
    client: reqwest::Client,
    session: NorenSession,
    is_connected: AtomicBool,
}

impl NorenHttpInnerClient {
    /// Creates a new [`NorenHttpInnerClient`] sharing `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy is invalid or the HTTP client cannot be built.
    pub fn new(config: &NorenConfig, session: NorenSession) -> Result<Self, NorenHttpError> {
        Ok(Self {
            url: NorenUrl::new(config.base_url.clone()),
            client: build_http_client(config)?,
            session,
            is_connected: AtomicBool::new(false),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    fn set_connected(&self, connected: bool) {
        self.is_connected.store(connected, Ordering::SeqCst);
    }

    async fn require_session(&self, route: NorenRoute) -> Result<SessionAuth, NorenHttpError> {
        self.session.get().await.ok_or_else(|| {
            NorenHttpError::AuthenticationError(format!("{route} requires a logged in session"))
        })
    }

    /// Posts to `route`. Public routes go out as-is. Every other route checks the session
    /// before any I/O and gets the identity fields added.
    async fn post<T: Serialize + ?Sized>(
        &self,
        route: NorenRoute,
        payload: &T,
        include_actid: bool,
    ) -> Result<Value, NorenHttpError> {
        let url = self.url.route_url(route);
        if route.is_public() {
            tracing::debug!(route = %route, "POST");
            return post_jdata(&self.client, url, payload, None).await;
        }

        let auth = self.require_session(route).await?;
        let body = with_identity(payload, &auth, include_actid)?;
        tracing::debug!(route = %route, uid = auth.uid(), "POST");
        post_jdata(&self.client, url, &body, Some(&auth)).await
    }

    pub async fn http_login(
        &self,
        credential: &NorenCredential,
    ) -> Result<LoginResponse, NorenHttpError> {
        let params = LoginParams::from(credential);
        let value = self.post(NorenRoute::QuickAuth, &params, false).await?;
        let resp: LoginResponse = decode(value)?;

        let susertoken = resp.susertoken.clone().ok_or_else(|| {
            NorenHttpError::AuthenticationError("login response has no susertoken".to_string())
        })?;
        let actid = resp
            .actid
            .clone()
            .unwrap_or_else(|| credential.user_id.clone());

        self.session
            .set(SessionAuth::Session {
                uid: credential.user_id.clone(),
                actid,
                susertoken,
            })
            .await;
        self.set_connected(true);
        tracing::info!(uid = %credential.user_id, "Logged in");

        Ok(resp)
    }

    pub async fn http_logout(&self) -> Result<Value, NorenHttpError> {
        let value = self
            .post(NorenRoute::Logout, &Value::Null, false)
            .await?;
        let value = expect_ok(value)?;
        self.session.clear().await;
        self.set_connected(false);
        tracing::info!("Logged out");
        Ok(value)
    }

    pub async fn http_forgot_password_otp(
        &self,
        params: &ForgotPasswordOtpParams,
    ) -> Result<Value, NorenHttpError> {
        let value = self
            .post(NorenRoute::ForgotPasswordOtp, params, false)
            .await?;
        expect_ok(value)
    }

    pub async fn http_search_scrip(
        &self,
        params: &SearchScripParams,
    ) -> Result<SearchScripResponse, NorenHttpError> {
        let value = self
            .post(NorenRoute::SearchScrip, params, false)
            .await?;
        decode(value)
    }

    pub async fn http_get_quotes(
        &self,
        params: &QuoteParams,
    ) -> Result<QuoteResponse, NorenHttpError> {
        let value = self
            .post(NorenRoute::GetQuotes, params, false)
            .await?;
        decode(value)
    }

    pub async fn http_get_limits(
        &self,
        params: &LimitsParams,
    ) -> Result<LimitsResponse, NorenHttpError> {
        let value = self.post(NorenRoute::Limits, params, true).await?;
        decode(value)
    }

    pub async fn http_place_order(
        &self,
        params: &PlaceOrderParams,
    ) -> Result<PlaceOrderResponse, NorenHttpError> {
        let mut body = serde_json::to_value(params)?;
        if let Value::Object(map) = &mut body {
            map.insert(
                "ordersource".to_string(),
                Value::String(NOREN_SOURCE.to_string()),
            );
        }
        let value = self
            .post(NorenRoute::PlaceOrder, &body, true)
            .await?;
        let resp: PlaceOrderResponse = decode(value)?;
        tracing::info!(order_id = %resp.norenordno, tsym = %params.trading_symbol, "Order placed");
        Ok(resp)
    }

    pub async fn http_modify_order(
        &self,
        params: &ModifyOrderParams,
    ) -> Result<OrderActionResponse, NorenHttpError> {
        let value = self
            .post(NorenRoute::ModifyOrder, params, false)
            .await?;
        decode(value)
    }

    pub async fn http_cancel_order(
        &self,
        params: &CancelOrderParams,
    ) -> Result<OrderActionResponse, NorenHttpError> {
        let value = self
            .post(NorenRoute::CancelOrder, params, false)
            .await?;
        decode(value)
    }

    pub async fn http_get_basket_margin(
        &self,
        params: &BasketMarginParams,
    ) -> Result<BasketMarginResponse, NorenHttpError> {
        let value = self
            .post(NorenRoute::BasketMargin, params, true)
            .await?;
        decode(value)
    }

    async fn http_list(
        &self,
        route: NorenRoute,
        payload: &Value,
        include_actid: bool,
    ) -> Result<Option<Vec<Value>>, NorenHttpError> {
        let value = self.post(route, payload, include_actid).await?;
        decode_list(route, value)
    }

    pub async fn http_get_order_book(&self) -> Result<Option<Vec<Value>>, NorenHttpError> {
        self.http_list(NorenRoute::OrderBook, &Value::Null, false)
            .await
    }

    pub async fn http_get_trade_book(&self) -> Result<Option<Vec<Value>>, NorenHttpError> {
        self.http_list(NorenRoute::TradeBook, &Value::Null, true)
            .await
    }

    pub async fn http_get_position_book(&self) -> Result<Option<Vec<Value>>, NorenHttpError> {
        self.http_list(NorenRoute::PositionBook, &Value::Null, true)
            .await
    }

    pub async fn http_get_holdings(
        &self,
        product_type: NorenProductType,
    ) -> Result<Option<Vec<Value>>, NorenHttpError> {
        let payload = serde_json::json!({ "prd": product_type });
        self.http_list(NorenRoute::Holdings, &payload, true).await
    }

    pub async fn http_single_order_history(
        &self,
        params: &SingleOrderHistoryParams,
    ) -> Result<Option<Vec<Value>>, NorenHttpError> {
        let payload = serde_json::to_value(params)?;
        self.http_list(NorenRoute::SingleOrderHistory, &payload, false)
            .await
    }

    pub async fn http_get_time_price_series(
        &self,
        params: &TimePriceSeriesParams,
    ) -> Result<Option<Vec<TimePriceBar>>, NorenHttpError> {
        let payload = serde_json::to_value(params)?;
        let Some(items) = self
            .http_list(NorenRoute::TimePriceSeries, &payload, false)
            .await?
        else {
            return Ok(None);
        };

        let bars = items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<TimePriceBar>, _>>()?;
        Ok(Some(bars))
    }
}

/// Clonable Noren REST client.
#[derive(Debug, Clone)]
pub struct NorenHttpClient {
    inner: Arc<NorenHttpInnerClient>,
}

impl NorenHttpClient {
    /// Creates a client with no session. Call [`Self::login`] before private endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &NorenConfig) -> Result<Self, NorenHttpError> {
        Self::with_session(config, NorenSession::new())
    }

    /// Creates a client sharing an existing session, e.g. with a WebSocket client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_session(config: &NorenConfig, session: NorenSession) -> Result<Self, NorenHttpError> {
        let inner = NorenHttpInnerClient::new(config, session)?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Creates a client authenticated by an OAuth access token.
    ///
    /// # Errors
    ///
    /// Returns [`NorenHttpError::AuthenticationError`] if `token` carries no access token.
    pub fn from_oauth(config: &NorenConfig, token: &OAuthTokenInfo) -> Result<Self, NorenHttpError> {
        let access_token = token.access_token.clone().ok_or_else(|| {
            NorenHttpError::AuthenticationError("token response has no access_token".to_string())
        })?;
        let actid = if token.actid.is_empty() {
            token.uid.clone()
        } else {
            token.actid.clone()
        };
        let session = NorenSession::with_auth(SessionAuth::OAuth {
            uid: token.uid.clone(),
            actid,
            access_token,
        });

        let client = Self::with_session(config, session)?;
        client.inner.set_connected(true);
        Ok(client)
    }

    /// Session shared with this client.
    #[must_use]
    pub fn session(&self) -> NorenSession {
        self.inner.session.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub async fn login(&self, credential: &NorenCredential) -> Result<LoginResponse, NorenHttpError> {
        self.inner.http_login(credential).await
    }

    pub async fn logout(&self) -> Result<Value, NorenHttpError> {
        self.inner.http_logout().await
    }

    /// Requests a password reset OTP for `uid`, identified by PAN.
    pub async fn forgot_password_otp(
        &self,
        uid: impl Into<String>,
        pan: impl Into<String>,
    ) -> Result<Value, NorenHttpError> {
        let params = ForgotPasswordOtpParams {
            uid: uid.into(),
            pan: pan.into(),
        };
        self.inner.http_forgot_password_otp(&params).await
    }

    pub async fn search_scrip(
        &self,
        params: &SearchScripParams,
    ) -> Result<SearchScripResponse, NorenHttpError> {
        self.inner.http_search_scrip(params).await
    }

    pub async fn get_quotes(&self, params: &QuoteParams) -> Result<QuoteResponse, NorenHttpError> {
        self.inner.http_get_quotes(params).await
    }

    pub async fn get_limits(&self, params: &LimitsParams) -> Result<LimitsResponse, NorenHttpError> {
        self.inner.http_get_limits(params).await
    }

    pub async fn place_order(
        &self,
        params: &PlaceOrderParams,
    ) -> Result<PlaceOrderResponse, NorenHttpError> {
        self.inner.http_place_order(params).await
    }

    pub async fn modify_order(
        &self,
        params: &ModifyOrderParams,
    ) -> Result<OrderActionResponse, NorenHttpError> {
        self.inner.http_modify_order(params).await
    }

    pub async fn cancel_order(
        &self,
        order_id: impl Into<String>,
    ) -> Result<OrderActionResponse, NorenHttpError> {
        self.inner
            .http_cancel_order(&CancelOrderParams::new(order_id))
            .await
    }

    pub async fn get_basket_margin(
        &self,
        params: &BasketMarginParams,
    ) -> Result<BasketMarginResponse, NorenHttpError> {
        self.inner.http_get_basket_margin(params).await
    }

    /// Orders of the day, or `None` when there are none.
    pub async fn get_order_book(&self) -> Result<Option<Vec<Value>>, NorenHttpError> {
        self.inner.http_get_order_book().await
    }

    pub async fn get_trade_book(&self) -> Result<Option<Vec<Value>>, NorenHttpError> {
        self.inner.http_get_trade_book().await
    }

    pub async fn get_position_book(&self) -> Result<Option<Vec<Value>>, NorenHttpError> {
        self.inner.http_get_position_book().await
    }

    pub async fn get_holdings(
        &self,
        product_type: NorenProductType,
    ) -> Result<Option<Vec<Value>>, NorenHttpError> {
        self.inner.http_get_holdings(product_type).await
    }

    /// State transitions of one order, newest first.
    pub async fn single_order_history(
        &self,
        order_id: impl Into<String>,
    ) -> Result<Option<Vec<Value>>, NorenHttpError> {
        let params = SingleOrderHistoryParams {
            order_id: order_id.into(),
        };
        self.inner.http_single_order_history(&params).await
    }

    /// Intraday candles between `st` and `et`, or `None` when the OMS has no data.
    pub async fn get_time_price_series(
        &self,
        params: &TimePriceSeriesParams,
    ) -> Result<Option<Vec<TimePriceBar>>, NorenHttpError> {
        self.inner.http_get_time_price_series(params).await
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn session_auth() -> SessionAuth {
        SessionAuth::Session {
            uid: "USER1".to_string(),
            actid: "ACC1".to_string(),
            susertoken: "tok".to_string(),
        }
    }

    #[rstest]
    fn test_with_identity_adds_uid_and_actid() {
        let body = with_identity(&json!({"exch": "NSE"}), &session_auth(), true).unwrap();
        assert_eq!(body, json!({"exch": "NSE", "uid": "USER1", "actid": "ACC1"}));

        let body = with_identity(&Value::Null, &session_auth(), false).unwrap();
        assert_eq!(body, json!({"uid": "USER1"}));
    }

    #[rstest]
    fn test_with_identity_rejects_non_object() {
        let result = with_identity(&json!([1, 2]), &session_auth(), false);
        assert!(matches!(result, Err(NorenHttpError::InvalidRequestError(_))));
    }

    #[rstest]
    fn test_expect_ok_maps_emsg() {
        assert!(expect_ok(json!({"stat": "Ok"})).is_ok());

        let err = expect_ok(json!({"stat": "Not_Ok", "emsg": "Invalid Input"})).unwrap_err();
        assert!(matches!(err, NorenHttpError::ApiError(msg) if msg == "Invalid Input"));
    }

    #[rstest]
    fn test_decode_list() {
        let items = decode_list(NorenRoute::OrderBook, json!([{"norenordno": "1"}])).unwrap();
        assert_eq!(items.unwrap().len(), 1);

        let none = decode_list(
            NorenRoute::OrderBook,
            json!({"stat": "Not_Ok", "emsg": "no data"}),
        )
        .unwrap();
        assert!(none.is_none());
    }

    #[rstest]
    fn test_decode_list_surfaces_expired_session() {
        let result = decode_list(
            NorenRoute::TradeBook,
            json!({"stat": "Not_Ok", "emsg": "Session Expired :  Invalid Session Key"}),
        );
        assert!(matches!(result, Err(NorenHttpError::AuthenticationError(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_private_call_without_session_fails_before_io() {
        // Nothing listens on this port; the session check must fail first.
        let config = NorenConfig::with_urls("http://127.0.0.1:9/NorenWClient/", "ws://127.0.0.1:9/");
        let client = NorenHttpClient::new(&config).unwrap();

        let result = client.get_order_book().await;
        assert!(matches!(result, Err(NorenHttpError::AuthenticationError(_))));
        assert!(!client.is_connected());
    }

    #[rstest]
    fn test_from_oauth_requires_access_token() {
        let config = NorenConfig::default();
        let token: OAuthTokenInfo =
            serde_json::from_value(json!({"uid": "USER1", "actid": "USER1"})).unwrap();
        assert!(NorenHttpClient::from_oauth(&config, &token).is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn test_from_oauth_sets_bearer_session() {
        let config = NorenConfig::default();
        let token: OAuthTokenInfo =
            serde_json::from_value(json!({"access_token": "abc", "uid": "USER1"})).unwrap();
        let client = NorenHttpClient::from_oauth(&config, &token).unwrap();

        let auth = client.session().get().await.unwrap();
        assert_eq!(auth.bearer().as_deref(), Some("Bearer abc"));
        assert_eq!(auth.actid(), "USER1");
        assert!(client.is_connected());
    }
}
