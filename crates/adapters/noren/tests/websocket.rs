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

//! Integration tests for the Noren WebSocket client using a mock feed server.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use nautilus_adapters_noren::{
    common::ConnectionStatus,
    websocket::{NorenChannel, NorenWsError, NorenWsMessage},
    NorenConfig, NorenSession, NorenWebSocketClient, NorenWsCallback, SessionAuth,
};
use nautilus_common::testing::wait_until_async;
use rstest::rstest;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct FeedState {
    connections: Arc<AtomicUsize>,
    frames: Arc<Mutex<Vec<(usize, Value)>>>,
    pings: Arc<AtomicUsize>,
    reject_login: Arc<AtomicBool>,
    drop_after_subscribe: Arc<AtomicBool>,
}

impl FeedState {
    fn frames_of(&self, kind: &str) -> Vec<(usize, Value)> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, frame)| frame["t"] == kind)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct RecordingCallback {
    messages: Mutex<Vec<NorenWsMessage>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    errors: AtomicUsize,
}

impl RecordingCallback {
    fn kinds(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.kind().to_string())
            .collect()
    }
}

impl NorenWsCallback for RecordingCallback {
    fn handle_open(&self) {
        self.opens.fetch_add(1, Ordering::SeqCst);
    }

    fn handle_message(&self, message: NorenWsMessage) {
        self.messages.lock().unwrap().push(message);
    }

    fn handle_error(&self, _error: &NorenWsError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn handle_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

async fn handle_websocket(ws: WebSocketUpgrade, State(state): State<FeedState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

fn replies(frame: &Value, state: &FeedState) -> Vec<Value> {
    let keys = || {
        frame["k"]
            .as_str()
            .unwrap_or_default()
            .split('#')
            .filter_map(|key| key.split_once('|'))
            .map(|(e, tk)| (e.to_string(), tk.to_string()))
            .collect::<Vec<_>>()
    };

    match frame["t"].as_str() {
        Some("c") => {
            let rejected = state.reject_login.load(Ordering::SeqCst)
                || frame["susertoken"] == "bad"
                || frame["accesstoken"] == "bad";
            if rejected {
                vec![json!({"t": "ck", "s": "NOT_OK"})]
            } else {
                vec![json!({"t": "ck", "s": "OK", "uid": frame["uid"]})]
            }
        }
        Some("t") => keys()
            .into_iter()
            .flat_map(|(e, tk)| {
                [
                    json!({"t": "tk", "e": e, "tk": tk, "ts": "ACC-EQ", "lp": "2265.05", "v": "100"}),
                    json!({"t": "tf", "e": e, "tk": tk, "lp": "2266.10"}),
                ]
            })
            .collect(),
        Some("d") => keys()
            .into_iter()
            .map(|(e, tk)| json!({"t": "dk", "e": e, "tk": tk, "bp1": "2265.00", "bq1": "10"}))
            .collect(),
        Some("u") => vec![json!({"t": "uk", "k": frame["k"]})],
        Some("ud") => vec![json!({"t": "udk", "k": frame["k"]})],
        Some("o") => vec![
            json!({"t": "ok"}),
            json!({"t": "om", "norenordno": "24011800000001", "status": "OPEN", "actid": frame["actid"]}),
        ],
        Some("uo") => vec![json!({"t": "uok"})],
        _ => Vec::new(),
    }
}

async fn handle_socket(mut socket: WebSocket, state: FeedState) {
    let connection = state.connections.fetch_add(1, Ordering::SeqCst) + 1;

    while let Some(Ok(msg)) = socket.recv().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Ping(_) => {
                state.pings.fetch_add(1, Ordering::SeqCst);
                continue;
            }
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        state
            .frames
            .lock()
            .unwrap()
            .push((connection, frame.clone()));

        for reply in replies(&frame, &state) {
            if socket
                .send(Message::Text(reply.to_string().into()))
                .await
                .is_err()
            {
                return;
            }
        }

        if frame["t"] == "t" && state.drop_after_subscribe.swap(false, Ordering::SeqCst) {
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    }
}

async fn start_feed_server() -> (SocketAddr, FeedState) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = FeedState::default();
    let router = Router::new()
        .route("/NorenWS/", get(handle_websocket))
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, state)
}

fn config(addr: SocketAddr) -> NorenConfig {
    NorenConfig {
        ws_timeout: 2,
        heartbeat_secs: 30,
        reconnect_delay_ms: 50,
        reconnect_delay_max_ms: 200,
        reconnect_jitter_ms: 0,
        max_reconnect_attempts: 3,
        ..NorenConfig::with_urls(
            format!("http://{addr}/NorenWClient/"),
            format!("ws://{addr}/NorenWS/"),
        )
    }
}

fn session(token: &str) -> NorenSession {
    NorenSession::with_auth(SessionAuth::Session {
        uid: "USER1".to_string(),
        actid: "ACC1".to_string(),
        susertoken: token.to_string(),
    })
}

async fn wait_for_status(client: &NorenWebSocketClient, expected: ConnectionStatus) {
    wait_until_async(
        || {
            let reached = client.status() == expected;
            async move { reached }
        },
        Duration::from_secs(5),
    )
    .await;
}

async fn wait_for_confirmed(client: &NorenWebSocketClient, expected: usize) {
    wait_until_async(
        || {
            let confirmed = client.subscription_count() == expected;
            async move { confirmed }
        },
        Duration::from_secs(5),
    )
    .await;
}

async fn wait_for_kind(callback: &RecordingCallback, kind: &str, count: usize) {
    wait_until_async(
        || {
            let seen = callback.kinds().iter().filter(|k| *k == kind).count() >= count;
            async move { seen }
        },
        Duration::from_secs(2),
    )
    .await;
}

async fn wait_for_connections(state: &FeedState, expected: usize) {
    wait_until_async(
        || {
            let state = state.clone();
            async move { state.connections.load(Ordering::SeqCst) == expected }
        },
        Duration::from_secs(5),
    )
    .await;
}

fn frames_on(state: &FeedState, connection: usize) -> Vec<Value> {
    state
        .frames
        .lock()
        .unwrap()
        .iter()
        .filter(|(conn, _)| *conn == connection)
        .map(|(_, frame)| frame.clone())
        .collect()
}

#[rstest]
#[tokio::test]
async fn test_start_sends_connect_frame() {
    let (addr, state) = start_feed_server().await;
    let callback = Arc::new(RecordingCallback::default());
    let mut client = NorenWebSocketClient::new(config(addr), session("tok"));

    client.start(callback.clone()).await.unwrap();

    assert!(client.is_active());
    let connects = state.frames_of("c");
    assert_eq!(connects.len(), 1);
    assert_eq!(
        connects[0].1,
        json!({"t": "c", "uid": "USER1", "actid": "ACC1", "source": "API", "susertoken": "tok"})
    );
    wait_for_status(&client, ConnectionStatus::Connected).await;
    assert_eq!(callback.opens.load(Ordering::SeqCst), 1);

    client.close().await;
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
    assert!(!client.is_active());
    assert_eq!(callback.closes.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn test_rejected_login() {
    let (addr, _state) = start_feed_server().await;
    let mut client = NorenWebSocketClient::new(config(addr), session("bad"));

    let result = client
        .start(Arc::new(RecordingCallback::default()))
        .await;

    assert!(matches!(result, Err(NorenWsError::AuthenticationError(_))));
    assert!(!client.is_active());
    assert_eq!(client.status(), ConnectionStatus::Error);
}

#[rstest]
#[tokio::test]
async fn test_oauth_connect_uses_access_token() {
    let (addr, state) = start_feed_server().await;
    let session = NorenSession::with_auth(SessionAuth::OAuth {
        uid: "USER1".to_string(),
        actid: "USER1".to_string(),
        access_token: "acc-xyz".to_string(),
    });
    let mut client = NorenWebSocketClient::new(config(addr), session);

    client
        .start(Arc::new(RecordingCallback::default()))
        .await
        .unwrap();

    let connect = &state.frames_of("c")[0].1;
    assert_eq!(connect["accesstoken"], "acc-xyz");
    assert!(connect.get("susertoken").is_none());
    client.close().await;
}

#[rstest]
#[tokio::test]
async fn test_touchline_subscribe_and_unsubscribe() {
    let (addr, state) = start_feed_server().await;
    let callback = Arc::new(RecordingCallback::default());
    let mut client = NorenWebSocketClient::new(config(addr), session("tok"));
    client.start(callback.clone()).await.unwrap();

    client.subscribe(&["NSE|22", "NSE|2885"]).unwrap();
    wait_for_confirmed(&client, 2).await;

    let subscribes = state.frames_of("t");
    assert_eq!(subscribes.len(), 1);
    assert_eq!(subscribes[0].1, json!({"t": "t", "k": "NSE|22#NSE|2885"}));
    wait_for_kind(&callback, "tf", 2).await;

    client.unsubscribe(&["NSE|22"]).unwrap();
    wait_for_kind(&callback, "uk", 1).await;
    assert_eq!(state.frames_of("u")[0].1, json!({"t": "u", "k": "NSE|22"}));
    assert_eq!(client.subscriptions().len(), 1);
    assert_eq!(client.subscription_count(), 1);

    let messages = callback.messages.lock().unwrap().clone();
    let first_ack = messages.iter().find_map(|m| match m {
        NorenWsMessage::TouchlineAck(t) => Some(t.clone()),
        _ => None,
    });
    let ack = first_ack.unwrap();
    assert_eq!(ack.lp, Some(2265.05));
    assert_eq!(ack.v, Some(100));

    client.close().await;
}

#[rstest]
#[tokio::test]
async fn test_depth_and_order_updates() {
    let (addr, state) = start_feed_server().await;
    let callback = Arc::new(RecordingCallback::default());
    let mut client = NorenWebSocketClient::new(config(addr), session("tok"));
    client.start(callback.clone()).await.unwrap();

    client.subscribe_depth(&["NSE|22"]).unwrap();
    client.subscribe_orders().unwrap();
    wait_for_confirmed(&client, 2).await;

    assert_eq!(state.frames_of("d")[0].1, json!({"t": "d", "k": "NSE|22"}));
    assert_eq!(state.frames_of("o")[0].1, json!({"t": "o", "actid": "ACC1"}));
    wait_for_kind(&callback, "om", 1).await;

    let depth = callback
        .messages
        .lock()
        .unwrap()
        .iter()
        .find_map(|m| match m {
            NorenWsMessage::DepthAck(d) => Some(d.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(depth.bid(1), Some((2265.0, 10)));

    client.unsubscribe_depth(&["NSE|22"]).unwrap();
    client.unsubscribe_orders().unwrap();
    wait_for_kind(&callback, "uok", 1).await;
    assert!(client.subscriptions().is_empty());

    client.close().await;
}

#[rstest]
#[tokio::test]
async fn test_reconnect_replays_subscriptions() {
    let (addr, state) = start_feed_server().await;
    state.drop_after_subscribe.store(true, Ordering::SeqCst);
    let callback = Arc::new(RecordingCallback::default());
    let mut client = NorenWebSocketClient::new(config(addr), session("tok"));
    client.start(callback.clone()).await.unwrap();

    client.subscribe(&["NSE|22"]).unwrap();

    wait_for_connections(&state, 2).await;
    wait_until_async(
        || {
            let state = state.clone();
            async move { state.frames_of("t").iter().any(|(conn, _)| *conn == 2) }
        },
        Duration::from_secs(5),
    )
    .await;
    wait_for_status(&client, ConnectionStatus::Connected).await;
    wait_for_confirmed(&client, 1).await;

    let replayed = frames_on(&state, 2);
    assert_eq!(replayed[0]["t"], "c");
    assert_eq!(replayed[1], json!({"t": "t", "k": "NSE|22"}));
    assert_eq!(callback.opens.load(Ordering::SeqCst), 2);
    assert!(callback.closes.load(Ordering::SeqCst) >= 1);

    client.close().await;
}

#[rstest]
#[tokio::test]
async fn test_subscribe_while_reconnecting_is_sent_once() {
    let (addr, state) = start_feed_server().await;
    state.drop_after_subscribe.store(true, Ordering::SeqCst);
    let config = NorenConfig {
        reconnect_delay_ms: 400,
        reconnect_delay_max_ms: 400,
        ..config(addr)
    };
    let mut client = NorenWebSocketClient::new(config, session("tok"));
    client
        .start(Arc::new(RecordingCallback::default()))
        .await
        .unwrap();

    client.subscribe(&["NSE|22"]).unwrap();
    wait_for_status(&client, ConnectionStatus::Reconnecting).await;
    client.subscribe(&["NSE|2885"]).unwrap();

    wait_for_status(&client, ConnectionStatus::Connected).await;
    wait_for_confirmed(&client, 2).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let subscribes: Vec<Value> = frames_on(&state, 2)
        .into_iter()
        .filter(|frame| frame["t"] == "t")
        .collect();
    assert_eq!(subscribes, vec![json!({"t": "t", "k": "NSE|22#NSE|2885"})]);

    client.close().await;
}

#[rstest]
#[tokio::test]
async fn test_reconnect_gives_up_after_max_attempts() {
    let (addr, state) = start_feed_server().await;
    state.drop_after_subscribe.store(true, Ordering::SeqCst);
    let callback = Arc::new(RecordingCallback::default());
    let mut client = NorenWebSocketClient::new(config(addr), session("tok"));
    client.start(callback.clone()).await.unwrap();

    state.reject_login.store(true, Ordering::SeqCst);
    client.subscribe(&["NSE|22"]).unwrap();

    wait_for_status(&client, ConnectionStatus::Error).await;
    wait_until_async(
        || {
            let stopped = !client.is_active();
            async move { stopped }
        },
        Duration::from_secs(2),
    )
    .await;

    // One initial connection plus three rejected attempts.
    assert_eq!(state.connections.load(Ordering::SeqCst), 4);
    assert_eq!(callback.errors.load(Ordering::SeqCst), 1);
    assert_eq!(client.subscriptions().pending_count(), 1);

    client.close().await;
}

#[rstest]
#[tokio::test]
async fn test_subscribe_after_feed_gave_up_is_not_connected() {
    let (addr, state) = start_feed_server().await;
    state.drop_after_subscribe.store(true, Ordering::SeqCst);
    let mut client = NorenWebSocketClient::new(config(addr), session("tok"));
    client
        .start(Arc::new(RecordingCallback::default()))
        .await
        .unwrap();

    state.reject_login.store(true, Ordering::SeqCst);
    client.subscribe(&["NSE|22"]).unwrap();
    wait_for_status(&client, ConnectionStatus::Error).await;
    wait_until_async(
        || {
            let stopped = !client.is_active();
            async move { stopped }
        },
        Duration::from_secs(2),
    )
    .await;

    assert!(matches!(
        client.subscribe(&["NSE|2885"]),
        Err(NorenWsError::NotConnected)
    ));
    assert!(matches!(
        client.subscribe_depth(&["NSE|22"]),
        Err(NorenWsError::NotConnected)
    ));
    assert_eq!(client.subscriptions().len(), 1);
    assert_eq!(
        client.subscriptions().keys(NorenChannel::Touchline),
        vec!["NSE|22"]
    );

    client.close().await;
}

#[rstest]
#[tokio::test]
async fn test_heartbeat_pings() {
    let (addr, state) = start_feed_server().await;
    let config = NorenConfig {
        heartbeat_secs: 1,
        ..config(addr)
    };
    let mut client = NorenWebSocketClient::new(config, session("tok"));
    client
        .start(Arc::new(RecordingCallback::default()))
        .await
        .unwrap();

    wait_until_async(
        || {
            let state = state.clone();
            async move { state.pings.load(Ordering::SeqCst) >= 1 }
        },
        Duration::from_secs(3),
    )
    .await;

    client.close().await;
}
