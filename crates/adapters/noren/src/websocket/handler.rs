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

//! Feed task for the Noren WebSocket.
//!
//! The task owns the socket. It forwards parsed frames to the user callback, tracks
//! subscription acks, pings the server and reconnects when the connection drops.

use std::{collections::HashSet, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
    time::MissedTickBehavior,
};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;

use super::{
    error::{NorenWsError, NorenWsResult},
    messages::{NorenWsMessage, NorenWsRequest},
    parse::parse_ws_message,
    subscription::{NorenChannel, NorenSubscriptions},
};
use crate::{
    common::{enums::ConnectionStatus, session::SessionAuth, NorenSession},
    config::NorenConfig,
};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Receiver of feed events.
///
/// Methods are called from the feed task and must not block.
pub trait NorenWsCallback: Send + Sync {
    /// Called once the connect frame is acknowledged, including after a reconnect.
    fn handle_open(&self) {}

    fn handle_message(&self, message: NorenWsMessage);

    fn handle_error(&self, error: &NorenWsError) {
        tracing::error!("Noren feed error: {error}");
    }

    /// Called when the connection is lost or closed.
    fn handle_close(&self) {}
}

/// Callback that logs every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCallback;

impl NorenWsCallback for LoggingCallback {
    fn handle_open(&self) {
        tracing::info!("Noren feed open");
    }

    fn handle_message(&self, message: NorenWsMessage) {
        tracing::info!(kind = message.kind(), "{message:?}");
    }

    fn handle_close(&self) {
        tracing::info!("Noren feed closed");
    }
}

/// Commands sent from the outer client to the feed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HandlerCommand {
    Subscribe {
        channel: NorenChannel,
        keys: Vec<String>,
    },
    Unsubscribe {
        channel: NorenChannel,
        keys: Vec<String>,
    },
    Disconnect,
}

enum ConnectionEnd {
    Stopped,
    Lost(String),
}

/// Opens the socket and authenticates with the connect frame.
///
/// # Errors
///
/// Returns [`NorenWsError::TimeoutError`] if either the handshake or the `ck` ack take longer
/// than `timeout`, and [`NorenWsError::AuthenticationError`] if the ack is not `OK`.
pub(crate) async fn connect_and_login(
    url: &str,
    auth: &SessionAuth,
    timeout: Duration,
) -> NorenWsResult<WsStream> {
    let (mut stream, _response) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| NorenWsError::TimeoutError(format!("connecting to {url}")))??;

    let frame = NorenWsRequest::connect(auth).to_json()?;
    stream
        .send(Message::Text(frame.into()))
        .await
        .map_err(|e| NorenWsError::SendError(e.to_string()))?;

    tokio::time::timeout(timeout, wait_for_connect_ack(&mut stream))
        .await
        .map_err(|_| NorenWsError::TimeoutError("waiting for connect ack".to_string()))??;

    tracing::info!(uid = auth.uid(), "Noren feed authenticated");
    Ok(stream)
}

async fn wait_for_connect_ack(stream: &mut WsStream) -> NorenWsResult<()> {
    while let Some(frame) = stream.next().await {
        match frame? {
            Message::Text(text) => match parse_ws_message(text.as_str())? {
                NorenWsMessage::ConnectAck(ack) if ack.is_ok() => return Ok(()),
                NorenWsMessage::ConnectAck(ack) => {
                    return Err(NorenWsError::AuthenticationError(format!(
                        "connect rejected with s={}",
                        ack.s
                    )));
                }
                other => tracing::debug!(kind = other.kind(), "Frame before connect ack"),
            },
            Message::Close(frame) => {
                return Err(NorenWsError::ConnectionError(format!(
                    "closed before connect ack: {frame:?}"
                )));
            }
            _ => {}
        }
    }
    Err(NorenWsError::ConnectionError(
        "stream ended before connect ack".to_string(),
    ))
}

/// Sends a subscribe frame for every group.
pub(crate) async fn send_subscriptions(
    stream: &mut WsStream,
    groups: &[(NorenChannel, Vec<String>)],
) -> NorenWsResult<()> {
    for (channel, keys) in groups {
        for frame in NorenWsRequest::subscribe(*channel, keys) {
            let payload = frame.to_json()?;
            stream
                .send(Message::Text(payload.into()))
                .await
                .map_err(|e| NorenWsError::SendError(e.to_string()))?;
        }
        tracing::debug!(%channel, count = keys.len(), "Replayed subscriptions");
    }
    Ok(())
}

pub(crate) struct FeedHandler {
    config: NorenConfig,
    session: NorenSession,
    callback: Arc<dyn NorenWsCallback>,
    subscriptions: NorenSubscriptions,
    cmd_rx: mpsc::UnboundedReceiver<HandlerCommand>,
    status_tx: watch::Sender<ConnectionStatus>,
    cancel: CancellationToken,
    /// Keys subscribed on the current connection.
    sent: HashSet<(NorenChannel, String)>,
}

impl FeedHandler {
    pub(crate) fn new(
        config: NorenConfig,
        session: NorenSession,
        callback: Arc<dyn NorenWsCallback>,
        subscriptions: NorenSubscriptions,
        cmd_rx: mpsc::UnboundedReceiver<HandlerCommand>,
        status_tx: watch::Sender<ConnectionStatus>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            session,
            callback,
            subscriptions,
            cmd_rx,
            status_tx,
            cancel,
            sent: HashSet::new(),
        }
    }

    /// Drives an authenticated stream until stopped or until reconnecting gives up.
    ///
    /// `replayed` lists the subscriptions already sent on `stream`.
    pub(crate) async fn run(
        mut self,
        stream: WsStream,
        replayed: Vec<(NorenChannel, Vec<String>)>,
    ) {
        let mut stream = stream;
        self.reset_sent(&replayed);
        self.set_status(ConnectionStatus::Connected);
        self.callback.handle_open();

        loop {
            match self.run_connection(stream).await {
                ConnectionEnd::Stopped => {
                    self.set_status(ConnectionStatus::Disconnected);
                    self.callback.handle_close();
                    break;
                }
                ConnectionEnd::Lost(reason) => {
                    tracing::warn!(%reason, "Noren feed connection lost");
                    self.callback.handle_close();

                    match self.reconnect().await {
                        Ok(Some(new_stream)) => {
                            stream = new_stream;
                            self.set_status(ConnectionStatus::Connected);
                            self.callback.handle_open();
                        }
                        Ok(None) => {
                            self.set_status(ConnectionStatus::Disconnected);
                            break;
                        }
                        Err(e) => {
                            tracing::error!("Giving up on Noren feed: {e}");
                            self.set_status(ConnectionStatus::Error);
                            self.callback.handle_error(&e);
                            break;
                        }
                    }
                }
            }
        }
        tracing::debug!("Noren feed task finished");
    }

    async fn run_connection(&mut self, stream: WsStream) -> ConnectionEnd {
        let (mut writer, mut reader) = stream.split();
        let period = self.config.heartbeat_interval();
        let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = writer.send(Message::Close(None)).await;
                    return ConnectionEnd::Stopped;
                }
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(HandlerCommand::Disconnect) | None => {
                        let _ = writer.send(Message::Close(None)).await;
                        return ConnectionEnd::Stopped;
                    }
                    Some(cmd) => {
                        for frame in self.frames_for(cmd) {
                            let payload = match frame.to_json() {
                                Ok(payload) => payload,
                                Err(e) => {
                                    self.callback.handle_error(&NorenWsError::from(e));
                                    continue;
                                }
                            };
                            tracing::debug!(%payload, "Sending frame");
                            if let Err(e) = writer.send(Message::Text(payload.into())).await {
                                return ConnectionEnd::Lost(format!("send failed: {e}"));
                            }
                        }
                    }
                },
                frame = reader.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        return ConnectionEnd::Lost(format!("closed by server: {frame:?}"));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return ConnectionEnd::Lost(e.to_string()),
                    None => return ConnectionEnd::Lost("stream ended".to_string()),
                },
                _ = heartbeat.tick() => {
                    if let Err(e) = writer.send(Message::Ping(Vec::new().into())).await {
                        return ConnectionEnd::Lost(format!("heartbeat failed: {e}"));
                    }
                }
            }
        }
    }

    /// Frames for a subscription command on the current connection.
    ///
    /// Keys already subscribed on this connection (for example by a reconnect replay) and keys
    /// dropped from the table since the command was queued are skipped.
    fn frames_for(&mut self, cmd: HandlerCommand) -> Vec<NorenWsRequest> {
        match cmd {
            HandlerCommand::Subscribe { channel, keys } => {
                let fresh: Vec<String> = keys
                    .into_iter()
                    .filter(|key| self.subscriptions.state(channel, key).is_some())
                    .filter(|key| self.sent.insert((channel, key.clone())))
                    .collect();
                if fresh.is_empty() {
                    tracing::debug!(%channel, "Nothing new to subscribe on this connection");
                }
                NorenWsRequest::subscribe(channel, &fresh)
            }
            HandlerCommand::Unsubscribe { channel, keys } => {
                for key in &keys {
                    self.sent.remove(&(channel, key.clone()));
                }
                NorenWsRequest::unsubscribe(channel, &keys)
            }
            HandlerCommand::Disconnect => Vec::new(),
        }
    }

    fn reset_sent(&mut self, groups: &[(NorenChannel, Vec<String>)]) {
        self.sent = groups
            .iter()
            .flat_map(|(channel, keys)| keys.iter().map(move |key| (*channel, key.clone())))
            .collect();
    }

    fn handle_text(&self, text: &str) {
        match parse_ws_message(text) {
            Ok(message) => {
                self.track_ack(&message);
                self.callback.handle_message(message);
            }
            Err(e) => {
                tracing::warn!(frame = text, "Unparseable frame: {e}");
                self.callback.handle_error(&e);
            }
        }
    }

    fn track_ack(&self, message: &NorenWsMessage) {
        match message {
            NorenWsMessage::TouchlineAck(touchline) => {
                self.subscriptions
                    .confirm(NorenChannel::Touchline, &touchline.key());
            }
            NorenWsMessage::DepthAck(depth) => {
                self.subscriptions.confirm(NorenChannel::Depth, &depth.key());
            }
            NorenWsMessage::OrdersAck(_) => self.subscriptions.confirm_channel(NorenChannel::Orders),
            _ => {}
        }
    }

    /// Returns `Ok(None)` when cancelled while reconnecting.
    async fn reconnect(&mut self) -> NorenWsResult<Option<WsStream>> {
        self.set_status(ConnectionStatus::Reconnecting);
        self.subscriptions.mark_all_pending();

        let mut backoff = self
            .config
            .reconnect_backoff()
            .map_err(|e| NorenWsError::ConnectionError(e.to_string()))?;
        let mut last_error =
            NorenWsError::ConnectionError("reconnect attempts exhausted".to_string());

        for attempt in 1..=self.config.max_reconnect_attempts {
            let delay = backoff.next_duration();
            tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
            tokio::select! {
                () = self.cancel.cancelled() => return Ok(None),
                () = tokio::time::sleep(delay) => {}
            }

            let Some(auth) = self.session.get().await else {
                return Err(NorenWsError::AuthenticationError(
                    "session cleared while reconnecting".to_string(),
                ));
            };

            let connected = tokio::select! {
                () = self.cancel.cancelled() => return Ok(None),
                result = connect_and_login(&self.config.ws_url, &auth, self.config.ws_timeout()) => result,
            };

            match connected {
                Ok(mut stream) => {
                    let replay = self.subscriptions.mark_all_pending();
                    match send_subscriptions(&mut stream, &replay).await {
                        Ok(()) => {
                            self.reset_sent(&replay);
                            tracing::info!(attempt, replayed = self.subscriptions.len(), "Reconnected");
                            return Ok(Some(stream));
                        }
                        Err(e) => {
                            tracing::warn!(attempt, "Replay failed: {e}");
                            last_error = e;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt, "Reconnect failed: {e}");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status_tx.send_replace(status);
    }
}
