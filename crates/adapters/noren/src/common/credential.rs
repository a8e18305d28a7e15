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

//! Credentials for Noren connections.
//!
//! Two flows are supported:
//!
//! - Session login (`QuickAuth`) with a [`NorenCredential`]: the password and the app key are
//!   sent as SHA-256 digests, never in clear.
//! - OAuth with an [`OAuthCredential`] loaded from a `.properties` file: the user authorizes in
//!   a browser, and the returned code is exchanged for an access token.

use std::{collections::HashMap, env, fmt, fs, path::Path};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

use super::parse::sha256_hex;
use crate::error::{NorenError, NorenResult};

/// Session login credentials.
#[derive(Clone, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct NorenCredential {
    pub user_id: String,
    pub password: String,
    /// Second factor: OTP, TOTP or date of birth depending on the broker setup.
    pub factor2: String,
    pub vendor_code: String,
    /// API secret issued with the vendor code. Hashed with the user id to form the app key.
    pub api_secret: String,
    #[builder(default = "String::from(\"abc1234\")")]
    pub imei: String,
}

impl fmt::Debug for NorenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NorenCredential")
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .field("factor2", &"<redacted>")
            .field("vendor_code", &self.vendor_code)
            .field("api_secret", &"<redacted>")
            .field("imei", &self.imei)
            .finish()
    }
}

impl NorenCredential {
    pub fn builder() -> NorenCredentialBuilder {
        NorenCredentialBuilder::default()
    }

    /// Loads credentials from environment variables sharing `prefix`.
    ///
    /// With prefix `NOREN` the variables are `NOREN_USER_ID`, `NOREN_PASSWORD`,
    /// `NOREN_FACTOR2`, `NOREN_VENDOR_CODE`, `NOREN_API_SECRET` and optionally `NOREN_IMEI`.
    ///
    /// # Errors
    ///
    /// Returns [`NorenError::ConfigError`] naming the first missing variable.
    pub fn from_env(prefix: &str) -> NorenResult<Self> {
        let var = |name: &str| {
            let key = format!("{prefix}_{name}");
            env::var(&key).map_err(|_| NorenError::ConfigError(format!("{key} not set")))
        };

        let mut builder = Self::builder();
        builder
            .user_id(var("USER_ID")?)
            .password(var("PASSWORD")?)
            .factor2(var("FACTOR2")?)
            .vendor_code(var("VENDOR_CODE")?)
            .api_secret(var("API_SECRET")?);
        if let Ok(imei) = var("IMEI") {
            builder.imei(imei);
        }

        builder
            .build()
            .map_err(|e| NorenError::ConfigError(e.to_string()))
    }

    /// SHA-256 digest of the password, as expected by `QuickAuth`.
    #[must_use]
    pub fn password_hash(&self) -> String {
        sha256_hex(&self.password)
    }

    /// App key: SHA-256 digest of `<user_id>|<api_secret>`.
    #[must_use]
    pub fn app_key(&self) -> String {
        sha256_hex(&format!("{}|{}", self.user_id, self.api_secret))
    }
}

/// OAuth client credentials and endpoints, usually read from `cred.properties`.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthCredential {
    pub client_id: String,
    pub secret_code: String,
    /// Authorization page the user is sent to.
    pub oauth_url: String,
    /// REST base URL used once the access token is issued.
    pub base_url: String,
    /// WebSocket URL used once the access token is issued.
    pub ws_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredential")
            .field("client_id", &self.client_id)
            .field("secret_code", &"<redacted>")
            .field("oauth_url", &self.oauth_url)
            .field("base_url", &self.base_url)
            .field("ws_url", &self.ws_url)
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

impl OAuthCredential {
    /// Reads a `.properties` file.
    ///
    /// # Errors
    ///
    /// Returns [`NorenError::IoError`] when the file cannot be read and
    /// [`NorenError::ConfigError`] when a required key is missing.
    pub fn from_properties_file(path: impl AsRef<Path>) -> NorenResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_properties_str(&content)
    }

    /// Parses `key=value` (or `key: value`) lines. Blank lines and lines starting with `#` or
    /// `!` are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`NorenError::ConfigError`] when a required key is missing or empty.
    pub fn from_properties_str(content: &str) -> NorenResult<Self> {
        let props = parse_properties(content);
        let required = |key: &str| {
            props
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| NorenError::ConfigError(format!("missing '{key}' in credentials")))
        };

        Ok(Self {
            client_id: required("client_id")?,
            secret_code: required("secret_code")?,
            oauth_url: required("oauth_url")?,
            base_url: required("base_url")?,
            ws_url: required("ws_url")?,
            redirect_url: props.get("redirect_url").filter(|v| !v.is_empty()).cloned(),
        })
    }

    /// Builds the authorization URL the user opens in a browser.
    ///
    /// # Errors
    ///
    /// Returns [`NorenError::ConfigError`] if `oauth_url` is not a valid URL.
    pub fn authorization_url(&self) -> NorenResult<String> {
        let mut url = Url::parse(&self.oauth_url)
            .map_err(|e| NorenError::ConfigError(format!("oauth_url '{}': {e}", self.oauth_url)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.client_id);
            if let Some(redirect) = &self.redirect_url {
                query.append_pair("redirect_uri", redirect);
            }
        }
        Ok(url.into())
    }

    /// Checksum proving possession of the client secret: SHA-256 of
    /// `<client_id><secret_code><code>`.
    #[must_use]
    pub fn checksum(&self, code: &str) -> String {
        sha256_hex(&format!("{}{}{}", self.client_id, self.secret_code, code))
    }
}

fn parse_properties(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let idx = line.find(['=', ':'])?;
            let (key, value) = line.split_at(idx);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}
