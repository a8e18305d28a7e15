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

//! WebSocket error types for the Noren adapter.

use thiserror::Error;

use crate::error::NorenError;

#[derive(Error, Debug, Clone)]
pub enum NorenWsError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Send error: {0}")]
    SendError(String),

    #[error("Receive error: {0}")]
    ReceiveError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Timeout error: {0}")]
    TimeoutError(String),
}

pub type NorenWsResult<T> = Result<T, NorenWsError>;

impl From<tokio_tungstenite::tungstenite::Error> for NorenWsError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        NorenWsError::ConnectionError(err.to_string())
    }
}

impl From<serde_json::Error> for NorenWsError {
    fn from(err: serde_json::Error) -> Self {
        NorenWsError::ParseError(err.to_string())
    }
}

impl From<NorenWsError> for NorenError {
    fn from(err: NorenWsError) -> Self {
        match err {
            NorenWsError::AuthenticationError(msg) => NorenError::AuthenticationError(msg),
            NorenWsError::TimeoutError(_) => NorenError::TimeoutError,
            NorenWsError::ParseError(_) => NorenError::SerializationError(err.to_string()),
            _ => NorenError::WebSocketError(err.to_string()),
        }
    }
}
