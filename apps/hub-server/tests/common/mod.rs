use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use hub_server::config::Config;
use hub_server::store::MemoryStore;
use hub_server::AppState;

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a real TCP server for WebSocket + REST testing. The server runs in
/// the background; returns its address and the shared state.
pub async fn start_server() -> (SocketAddr, AppState) {
    let state = AppState::new(Config::default(), Arc::new(MemoryStore::new()));
    let app = hub_server::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (addr, state)
}

/// Connect to the hub and join as the given user. Returns the stream after
/// the first online-users snapshot (which includes the joiner) arrives.
pub async fn connect_and_join(addr: SocketAddr, user_id: &str, user_name: &str) -> WsClient {
    let url = format!("ws://{addr}/hub");
    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");

    let join = serde_json::json!({
        "event": "join",
        "data": { "userId": user_id, "userName": user_name }
    });
    ws.send(tungstenite::Message::Text(join.to_string().into()))
        .await
        .expect("send join");

    let snapshot = wait_for_event(&mut ws, "online-users").await;
    assert!(snapshot["data"].is_array());
    ws
}

/// Send one client event frame.
pub async fn send_event(ws: &mut WsClient, event: &str, data: serde_json::Value) {
    let frame = serde_json::json!({ "event": event, "data": data });
    ws.send(tungstenite::Message::Text(frame.to_string().into()))
        .await
        .expect("send event");
}

/// Read frames until one with the given event name arrives. Panics after 5s.
pub async fn wait_for_event(ws: &mut WsClient, event: &str) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap_or_else(|_| panic!("timeout waiting for {event}"))
            .expect("stream ended")
            .expect("ws read error");
        match msg {
            tungstenite::Message::Text(text) => {
                let frame: serde_json::Value =
                    serde_json::from_str(&text).expect("parse frame");
                if frame["event"] == event {
                    return frame;
                }
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Assert no text frame arrives within a short window (relay exclusion).
pub async fn assert_silent(ws: &mut WsClient) {
    loop {
        match time::timeout(Duration::from_millis(300), ws.next()).await {
            Err(_elapsed) => return,
            Ok(Some(Ok(tungstenite::Message::Ping(_))))
            | Ok(Some(Ok(tungstenite::Message::Pong(_)))) => continue,
            Ok(Some(Ok(tungstenite::Message::Text(text)))) => {
                panic!("expected silence, got frame: {text}")
            }
            Ok(other) => panic!("expected silence, got: {other:?}"),
        }
    }
}
