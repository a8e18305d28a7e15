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

//! Client adapter for the Noren OMS trading platform.
//!
//! The crate is split the same way as the other venue adapters:
//!
//! - [`http`]: REST client for session login, OAuth token exchange, market data lookups,
//!   order entry and account books.
//! - [`websocket`]: streaming client for touchline, depth and order update feeds.
//! - [`common`]: credentials, routes, enums and parsing helpers shared by both.
//! - [`config`]: endpoint and timeout configuration.

pub mod common;
pub mod config;
pub mod error;
pub mod http;
pub mod websocket;

pub use common::{NorenCredential, NorenSession, OAuthCredential, SessionAuth};
pub use config::NorenConfig;
pub use error::{NorenError, NorenResult};
pub use http::{NorenHttpClient, OAuthHandler};
pub use websocket::{LoggingCallback, NorenWebSocketClient, NorenWsCallback, NorenWsMessage};
