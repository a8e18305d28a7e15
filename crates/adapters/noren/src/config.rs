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

//! Configuration for the Noren adapter.
//!
//! `NorenConfig` describes the REST and WebSocket endpoints together with timeouts and
//! reconnection settings. User credentials are carried separately by `NorenCredential`
//! (session login) or `OAuthCredential` (OAuth flow), see `common/credential.rs`.

use std::{env, str::FromStr, time::Duration};

use nautilus_network::backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    common::consts::{
        DEFAULT_HEARTBEAT_SECS, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MAX_RECONNECT_ATTEMPTS,
        DEFAULT_RECONNECT_DELAY_MAX_MS, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_RECONNECT_JITTER_MS,
        DEFAULT_WS_TIMEOUT_SECS, NOREN_UAT_BASE_URL, NOREN_UAT_WS_URL, RECONNECT_BACKOFF_FACTOR,
    },
    error::{NorenError, NorenResult},
};

/// Main configuration for the Noren adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NorenConfig {
    /// The base URL for the Noren REST API (trailing slash optional).
    pub base_url: String,
    /// The WebSocket URL for Noren streaming.
    pub ws_url: String,
    /// HTTP timeout in seconds.
    pub http_timeout: u64,
    /// WebSocket connect and handshake timeout in seconds.
    pub ws_timeout: u64,
    /// Interval between WebSocket heartbeats in seconds.
    pub heartbeat_secs: u64,
    /// Number of reconnection attempts before the feed gives up.
    pub max_reconnect_attempts: u32,
    /// Initial reconnection delay in milliseconds, doubled on every attempt.
    pub reconnect_delay_ms: u64,
    /// Upper bound for the reconnection delay in milliseconds.
    pub reconnect_delay_max_ms: u64,
    /// Random jitter added to each reconnection delay, in milliseconds.
    pub reconnect_jitter_ms: u64,
    /// Optional proxy URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl Default for NorenConfig {
    fn default() -> Self {
        Self {
            base_url: NOREN_UAT_BASE_URL.to_string(),
            ws_url: NOREN_UAT_WS_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            ws_timeout: DEFAULT_WS_TIMEOUT_SECS,
            heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            reconnect_delay_max_ms: DEFAULT_RECONNECT_DELAY_MAX_MS,
            reconnect_jitter_ms: DEFAULT_RECONNECT_JITTER_MS,
            proxy: None,
        }
    }
}

impl NorenConfig {
    /// Creates a new configuration pointing at the given endpoints.
    pub fn with_urls(base_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ws_url: ws_url.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration from the defaults overridden by `NOREN_*` environment variables.
    ///
    /// Recognised variables are `NOREN_BASE_URL`, `NOREN_WS_URL`, `NOREN_HTTP_TIMEOUT`,
    /// `NOREN_WS_TIMEOUT` and `NOREN_PROXY`.
    ///
    /// # Errors
    ///
    /// Returns [`NorenError::ConfigError`] if a timeout is not an integer or a URL is invalid.
    pub fn from_env() -> NorenResult<Self> {
        let mut config = Self::default();

        if let Ok(base_url) = env::var("NOREN_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(ws_url) = env::var("NOREN_WS_URL") {
            config.ws_url = ws_url;
        }
        if let Some(timeout) = parse_env_var::<u64>("NOREN_HTTP_TIMEOUT")? {
            config.http_timeout = timeout;
        }
        if let Some(timeout) = parse_env_var::<u64>("NOREN_WS_TIMEOUT")? {
            config.ws_timeout = timeout;
        }
        if let Ok(proxy) = env::var("NOREN_PROXY") {
            config.proxy = Some(proxy);
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that both endpoints parse and use the expected schemes.
    ///
    /// # Errors
    ///
    /// Returns [`NorenError::ConfigError`] describing the first offending field.
    pub fn validate(&self) -> NorenResult<()> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| NorenError::ConfigError(format!("base_url '{}': {e}", self.base_url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(NorenError::ConfigError(format!(
                "base_url must be http(s), was '{}'",
                base.scheme()
            )));
        }

        let ws = Url::parse(&self.ws_url)
            .map_err(|e| NorenError::ConfigError(format!("ws_url '{}': {e}", self.ws_url)))?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(NorenError::ConfigError(format!(
                "ws_url must be ws(s), was '{}'",
                ws.scheme()
            )));
        }

        if self.http_timeout == 0 || self.ws_timeout == 0 {
            return Err(NorenError::ConfigError(
                "timeouts must be greater than zero".to_string(),
            ));
        }

        if self.reconnect_delay_max_ms < self.reconnect_delay_ms {
            return Err(NorenError::ConfigError(format!(
                "reconnect_delay_max_ms ({}) is below reconnect_delay_ms ({})",
                self.reconnect_delay_max_ms, self.reconnect_delay_ms
            )));
        }
        self.reconnect_backoff()?;

        Ok(())
    }

    /// Backoff driving the feed reconnect delays, starting at `reconnect_delay_ms` and capped
    /// at `reconnect_delay_max_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`NorenError::ConfigError`] if the delays or jitter are out of range.
    pub fn reconnect_backoff(&self) -> NorenResult<ExponentialBackoff> {
        ExponentialBackoff::new(
            Duration::from_millis(self.reconnect_delay_ms),
            Duration::from_millis(self.reconnect_delay_max_ms),
            RECONNECT_BACKOFF_FACTOR,
            self.reconnect_jitter_ms,
            false,
        )
        .map_err(|e| NorenError::ConfigError(format!("reconnect backoff: {e}")))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    pub fn ws_timeout(&self) -> Duration {
        Duration::from_secs(self.ws_timeout)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

fn parse_env_var<T: FromStr>(key: &str) -> NorenResult<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| NorenError::ConfigError(format!("{key} is not a valid value: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_config_default() {
        let config = NorenConfig::default();
        assert_eq!(config.base_url, NOREN_UAT_BASE_URL);
        assert_eq!(config.ws_url, NOREN_UAT_WS_URL);
        assert_eq!(config.http_timeout, 30);
        assert_eq!(config.proxy, None);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    fn test_config_with_urls() {
        let config = NorenConfig::with_urls("http://localhost:9959/", "ws://localhost:9657/");
        assert_eq!(config.base_url, "http://localhost:9959/");
        assert_eq!(config.ws_url, "ws://localhost:9657/");
        assert_eq!(config.heartbeat_secs, DEFAULT_HEARTBEAT_SECS);
    }

    #[rstest]
    #[case("ftp://host/", "ws://host/")]
    #[case("http://host/", "http://host/")]
    #[case("not a url", "ws://host/")]
    fn test_config_validate_rejects(#[case] base: &str, #[case] ws: &str) {
        let config = NorenConfig::with_urls(base, ws);
        assert!(matches!(config.validate(), Err(NorenError::ConfigError(_))));
    }

    #[rstest]
    fn test_reconnect_backoff_is_capped() {
        let config = NorenConfig {
            reconnect_delay_ms: 1_000,
            reconnect_delay_max_ms: 5_000,
            reconnect_jitter_ms: 0,
            ..NorenConfig::default()
        };
        let mut backoff = config.reconnect_backoff().unwrap();

        let delays: Vec<Duration> = (0..10).map(|_| backoff.next_duration()).collect();
        assert_eq!(delays[0], Duration::from_millis(1_000));
        assert_eq!(delays[1], Duration::from_millis(2_000));
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(5_000)));
        assert_eq!(delays[9], Duration::from_millis(5_000));
    }

    #[rstest]
    fn test_config_validate_rejects_inverted_reconnect_delays() {
        let config = NorenConfig {
            reconnect_delay_ms: 2_000,
            reconnect_delay_max_ms: 500,
            ..NorenConfig::default()
        };
        assert!(matches!(config.validate(), Err(NorenError::ConfigError(_))));
    }

    #[rstest]
    fn test_config_deserialize_partial() {
        let config: NorenConfig =
            serde_json::from_str(r#"{"base_url":"https://api.example.com/NorenWClientTP/"}"#)
                .unwrap();
        assert_eq!(config.base_url, "https://api.example.com/NorenWClientTP/");
        assert_eq!(config.ws_url, NOREN_UAT_WS_URL);
    }
}
