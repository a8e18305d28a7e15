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

//! WebSocket client for the Noren market data and order update feed.
//!
//! [`NorenWebSocketClient::start`] authenticates with the session shared with the REST client
//! and hands the socket to a background task. Subscription calls only queue frames for that
//! task, so they are synchronous and never block on the network.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use super::{
    error::{NorenWsError, NorenWsResult},
    handler::{connect_and_login, send_subscriptions, FeedHandler, HandlerCommand},
    subscription::{NorenChannel, NorenSubscriptions},
    NorenWsCallback,
};
use crate::{
    common::{enums::ConnectionStatus, parse::split_instrument_key, NorenSession},
    config::NorenConfig,
};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct NorenWebSocketClient {
    config: NorenConfig,
    session: NorenSession,
    subscriptions: NorenSubscriptions,
    cmd_tx: Option<mpsc::UnboundedSender<HandlerCommand>>,
    status_rx: watch::Receiver<ConnectionStatus>,
    task_handle: Option<JoinHandle<()>>,
    cancellation_token: CancellationToken,
    actid: Option<String>,
}

impl std::fmt::Debug for NorenWebSocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(NorenWebSocketClient))
            .field("ws_url", &self.config.ws_url)
            .field("status", &self.status())
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}

impl NorenWebSocketClient {
    #[must_use]
    pub fn new(config: NorenConfig, session: NorenSession) -> Self {
        let (_status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            config,
            session,
            subscriptions: NorenSubscriptions::new(),
            cmd_tx: None,
            status_rx,
            task_handle: None,
            cancellation_token: CancellationToken::new(),
            actid: None,
        }
    }

    /// Connects, authenticates and spawns the feed task.
    ///
    /// Subscriptions left over from an earlier run are replayed.
    ///
    /// # Errors
    ///
    /// Returns [`NorenWsError::AuthenticationError`] without a session or when the server rejects
    /// the connect frame, and a connection or timeout error if the socket cannot be opened.
    pub async fn start(&mut self, callback: Arc<dyn NorenWsCallback>) -> NorenWsResult<()> {
        if self.is_active() {
            return Err(NorenWsError::InvalidRequest(
                "feed is already running".to_string(),
            ));
        }

        let auth = self.session.get().await.ok_or_else(|| {
            NorenWsError::AuthenticationError("no session, log in first".to_string())
        })?;

        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
        self.status_rx = status_rx;

        tracing::info!(url = %self.config.ws_url, uid = auth.uid(), "Connecting to Noren feed");
        let mut stream =
            match connect_and_login(&self.config.ws_url, &auth, self.config.ws_timeout()).await {
                Ok(stream) => stream,
                Err(e) => {
                    status_tx.send_replace(ConnectionStatus::Error);
                    return Err(e);
                }
            };

        let replay = self.subscriptions.mark_all_pending();
        if let Err(e) = send_subscriptions(&mut stream, &replay).await {
            status_tx.send_replace(ConnectionStatus::Error);
            return Err(e);
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        self.cancellation_token = CancellationToken::new();
        let handler = FeedHandler::new(
            self.config.clone(),
            self.session.clone(),
            callback,
            self.subscriptions.clone(),
            cmd_rx,
            status_tx,
            self.cancellation_token.clone(),
        );

        self.actid = Some(auth.actid().to_string());
        self.cmd_tx = Some(cmd_tx);
        self.task_handle = Some(tokio::spawn(handler.run(stream, replay)));
        Ok(())
    }

    /// Subscribes to touchline updates for `EXCHANGE|TOKEN` keys.
    ///
    /// # Errors
    ///
    /// Returns [`NorenWsError::NotConnected`] before [`Self::start`] or once the feed task has
    /// stopped, and [`NorenWsError::InvalidRequest`] for malformed keys.
    pub fn subscribe<S: AsRef<str>>(&self, keys: &[S]) -> NorenWsResult<()> {
        self.update_subscription(NorenChannel::Touchline, keys, true)
    }

    /// # Errors
    ///
    /// See [`Self::subscribe`].
    pub fn unsubscribe<S: AsRef<str>>(&self, keys: &[S]) -> NorenWsResult<()> {
        self.update_subscription(NorenChannel::Touchline, keys, false)
    }

    /// # Errors
    ///
    /// See [`Self::subscribe`].
    pub fn subscribe_depth<S: AsRef<str>>(&self, keys: &[S]) -> NorenWsResult<()> {
        self.update_subscription(NorenChannel::Depth, keys, true)
    }

    /// # Errors
    ///
    /// See [`Self::subscribe`].
    pub fn unsubscribe_depth<S: AsRef<str>>(&self, keys: &[S]) -> NorenWsResult<()> {
        self.update_subscription(NorenChannel::Depth, keys, false)
    }

    /// Subscribes to order updates for the logged-in account.
    ///
    /// # Errors
    ///
    /// Returns [`NorenWsError::NotConnected`] before [`Self::start`].
    pub fn subscribe_orders(&self) -> NorenWsResult<()> {
        let actid = self.actid.as_deref().ok_or(NorenWsError::NotConnected)?;
        self.update_subscription(NorenChannel::Orders, &[actid], true)
    }

    /// # Errors
    ///
    /// Returns [`NorenWsError::NotConnected`] before [`Self::start`].
    pub fn unsubscribe_orders(&self) -> NorenWsResult<()> {
        let actid = self.actid.as_deref().ok_or(NorenWsError::NotConnected)?;
        self.update_subscription(NorenChannel::Orders, &[actid], false)
    }

    /// Sender to the feed task, if it is still running.
    fn live_cmd_tx(&self) -> NorenWsResult<&mpsc::UnboundedSender<HandlerCommand>> {
        self.cmd_tx
            .as_ref()
            .filter(|tx| !tx.is_closed())
            .ok_or(NorenWsError::NotConnected)
    }

    fn update_subscription<S: AsRef<str>>(
        &self,
        channel: NorenChannel,
        keys: &[S],
        subscribe: bool,
    ) -> NorenWsResult<()> {
        let cmd_tx = self.live_cmd_tx()?;
        if keys.is_empty() {
            return Err(NorenWsError::InvalidRequest("no keys given".to_string()));
        }
        if channel != NorenChannel::Orders {
            for key in keys {
                split_instrument_key(key.as_ref())
                    .map_err(|e| NorenWsError::InvalidRequest(e.to_string()))?;
            }
        }
        let keys: Vec<String> = keys.iter().map(|key| key.as_ref().to_string()).collect();

        if subscribe {
            // Tracked before queueing: acks for untracked keys are dropped.
            let fresh: Vec<String> = keys
                .into_iter()
                .filter(|key| self.subscriptions.mark_subscribe(channel, key))
                .collect();
            if fresh.is_empty() {
                return Ok(());
            }
            let cmd = HandlerCommand::Subscribe {
                channel,
                keys: fresh.clone(),
            };
            if cmd_tx.send(cmd).is_err() {
                for key in &fresh {
                    self.subscriptions.mark_unsubscribe(channel, key);
                }
                return Err(NorenWsError::NotConnected);
            }
            tracing::info!(%channel, keys = ?fresh, "Subscribed");
        } else {
            let cmd = HandlerCommand::Unsubscribe {
                channel,
                keys: keys.clone(),
            };
            cmd_tx.send(cmd).map_err(|_| NorenWsError::NotConnected)?;
            for key in &keys {
                self.subscriptions.mark_unsubscribe(channel, key);
            }
            tracing::info!(%channel, ?keys, "Unsubscribed");
        }
        Ok(())
    }

    /// Stops the feed task and closes the socket.
    pub async fn close(&mut self) {
        if let Some(cmd_tx) = self.cmd_tx.take() {
            let _ = cmd_tx.send(HandlerCommand::Disconnect);
        }
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.take() {
            let abort_handle = handle.abort_handle();
            match tokio::time::timeout(CLOSE_TIMEOUT, handle).await {
                Ok(Ok(())) => tracing::debug!("Noren feed task stopped"),
                Ok(Err(e)) => tracing::error!("Noren feed task failed: {e}"),
                Err(_) => {
                    tracing::warn!("Timed out stopping Noren feed task, aborting");
                    abort_handle.abort();
                }
            }
        }
        self.actid = None;
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Whether the feed task is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of confirmed subscriptions across all channels.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.confirmed_count()
    }

    #[must_use]
    pub fn subscriptions(&self) -> &NorenSubscriptions {
        &self.subscriptions
    }

    /// Receiver notified on every connection status change.
    #[must_use]
    pub fn status_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }
}

impl Drop for NorenWebSocketClient {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
