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

//! HTTP error types for the Noren adapter.

use thiserror::Error;

use crate::{common::parse::ParseError, error::NorenError};

#[derive(Error, Debug)]
pub enum NorenHttpError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("HTTP error: {0} - {1}")]
    HttpError(u16, String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Invalid request: {0}")]
    InvalidRequestError(String),

    #[error("Resource not found: {0}")]
    NotFoundError(String),

    /// The OMS answered `stat: Not_Ok`.
    #[error("API error: {0}")]
    ApiError(String),

    #[error("JSON decode error: {0}")]
    JsonDecodeError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl NorenHttpError {
    /// Determines if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NorenHttpError::ConnectionError(_)
                | NorenHttpError::ServerError(_)
                | NorenHttpError::TimeoutError(_)
                | NorenHttpError::RateLimitError(_)
                | NorenHttpError::NetworkError(_)
        )
    }

    /// Determines if the error is fatal for the session (a new login is needed)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NorenHttpError::AuthenticationError(_) | NorenHttpError::AuthorizationError(_)
        )
    }

    /// Maps HTTP status codes to appropriate error variants
    pub fn from_http_status(status: u16, message: String) -> Self {
        match status {
            400 => NorenHttpError::InvalidRequestError(message),
            401 => NorenHttpError::AuthenticationError(message),
            403 => NorenHttpError::AuthorizationError(message),
            404 => NorenHttpError::NotFoundError(message),
            429 => NorenHttpError::RateLimitError(message),
            500..=599 => NorenHttpError::ServerError(message),
            _ => NorenHttpError::HttpError(status, message),
        }
    }

    /// Maps an `emsg` from a `Not_Ok` response. Expired sessions become authentication errors.
    pub fn from_emsg(emsg: String) -> Self {
        if emsg.contains("Session Expired") || emsg.contains("Invalid Session Key") {
            NorenHttpError::AuthenticationError(emsg)
        } else {
            NorenHttpError::ApiError(emsg)
        }
    }
}

impl From<reqwest::Error> for NorenHttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NorenHttpError::TimeoutError(err.to_string())
        } else if err.is_connect() {
            NorenHttpError::ConnectionError(err.to_string())
        } else if err.is_decode() {
            NorenHttpError::JsonDecodeError(err.to_string())
        } else {
            NorenHttpError::NetworkError(err.to_string())
        }
    }
}

impl From<ParseError> for NorenHttpError {
    fn from(err: ParseError) -> Self {
        NorenHttpError::JsonDecodeError(err.to_string())
    }
}

impl From<serde_json::Error> for NorenHttpError {
    fn from(err: serde_json::Error) -> Self {
        NorenHttpError::JsonDecodeError(err.to_string())
    }
}

impl From<NorenHttpError> for NorenError {
    fn from(err: NorenHttpError) -> Self {
        match err {
            NorenHttpError::AuthenticationError(msg) => NorenError::AuthenticationError(msg),
            NorenHttpError::AuthorizationError(msg) => NorenError::AuthenticationError(msg),
            NorenHttpError::RateLimitError(_) => NorenError::RateLimitError,
            NorenHttpError::TimeoutError(_) => NorenError::TimeoutError,
            NorenHttpError::JsonDecodeError(_) => NorenError::SerializationError(err.to_string()),
            _ => NorenError::HttpError(err.to_string()),
        }
    }
}
