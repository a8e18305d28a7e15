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

//! Error types for the Noren adapter.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NorenError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Connection timeout")]
    TimeoutError,

    #[error("Rate limit exceeded")]
    RateLimitError,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for NorenError {
    fn from(err: serde_json::Error) -> Self {
        NorenError::SerializationError(err.to_string())
    }
}

pub type NorenResult<T> = Result<T, NorenError>;
