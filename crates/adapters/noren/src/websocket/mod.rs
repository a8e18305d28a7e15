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

//! WebSocket client for the Noren touchline, depth and order update feeds.

pub mod client;
pub mod error;
pub mod handler;
pub mod messages;
pub mod parse;
pub mod subscription;

pub use client::NorenWebSocketClient;
pub use error::{NorenWsError, NorenWsResult};
pub use handler::{LoggingCallback, NorenWsCallback};
pub use messages::{
    NorenConnectAck, NorenDepth, NorenOrderUpdate, NorenTouchline, NorenWsMessage, NorenWsRequest,
};
pub use subscription::{NorenChannel, NorenSubscriptions, SubscriptionState};
