//! WebSocket upgrade handler and per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time;

use crate::AppState;

use super::events::{ClientEvent, ServerEvent};
use super::fanout::BroadcastFrame;
use super::session::HubSession;

/// A connection that never joins is closed after this long.
const JOIN_TIMEOUT_SECS: u64 = 10;

/// Server-initiated ping cadence; a connection with no traffic for a full
/// interval after a ping is considered dead.
const PING_INTERVAL_SECS: u64 = 30;

pub fn router() -> Router<AppState> {
    Router::new().route("/hub", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // The connection is inert until it sends a join event.
    let join_result = time::timeout(Duration::from_secs(JOIN_TIMEOUT_SECS), async {
        while let Some(msg) = ws_rx.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(?e, "ws read error before join");
                    return Err("read error");
                }
            };

            let text = match msg {
                Message::Text(t) => t,
                Message::Close(_) => return Err("client closed"),
                Message::Ping(_) | Message::Pong(_) => continue,
                _ => continue,
            };

            return match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::Join(payload)) => Ok(payload),
                Ok(_) => Err("expected join"),
                Err(_) => Err("invalid event"),
            };
        }
        Err("connection closed before join")
    })
    .await;

    let join = match join_result {
        Ok(Ok(payload)) => payload,
        Ok(Err(reason)) => {
            tracing::debug!(%reason, "join handshake failed");
            let _ = send_close(&mut ws_tx, reason).await;
            return;
        }
        Err(_timeout) => {
            let _ = send_close(&mut ws_tx, "join timeout").await;
            return;
        }
    };

    let session = HubSession::new(join);
    let (targeted_tx, targeted_rx) = mpsc::unbounded_channel();

    // Subscribe before registering so this session cannot miss the
    // online-users frame announcing its own join.
    let broadcast_rx = state.broadcast.subscribe();
    state.registry.register(session.presence.clone(), targeted_tx);
    state
        .broadcast
        .dispatch(None, ServerEvent::OnlineUsers(state.registry.snapshot()));

    tracing::info!(
        connection_id = %session.connection_id,
        user_id = %session.user_id,
        online = state.registry.len(),
        "joined the hub"
    );

    run_session(&session, &state, ws_tx, ws_rx, broadcast_rx, targeted_rx).await;

    // Teardown: drop presence, synthesize an end for any active call, then
    // push the updated snapshot to everyone still here.
    state.registry.unregister(&session.connection_id);
    state
        .calls
        .end_for_connection(&state.registry, &session.connection_id);
    state
        .broadcast
        .dispatch(None, ServerEvent::OnlineUsers(state.registry.snapshot()));

    tracing::info!(
        connection_id = %session.connection_id,
        user_id = %session.user_id,
        online = state.registry.len(),
        "left the hub"
    );
}

/// Main session loop: dispatch client events, forward broadcasts and targeted
/// emits, and enforce liveness.
async fn run_session(
    session: &HubSession,
    state: &AppState,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut ws_rx: SplitStream<WebSocket>,
    mut broadcast_rx: broadcast::Receiver<Arc<BroadcastFrame>>,
    mut targeted_rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let mut liveness_timer = time::interval(Duration::from_secs(PING_INTERVAL_SECS));
    liveness_timer.tick().await; // First tick fires immediately; skip it.
    let mut alive = true;

    loop {
        tokio::select! {
            // Client sends us a frame.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        alive = true;
                        let event: ClientEvent = match serde_json::from_str(&text) {
                            Ok(event) => event,
                            Err(err) => {
                                // One client's malformed frame must not take
                                // the hub down, or even their own connection.
                                tracing::debug!(
                                    %err,
                                    connection_id = %session.connection_id,
                                    "unparseable event"
                                );
                                state.registry.send_to(
                                    &session.connection_id,
                                    ServerEvent::error("BAD_EVENT", "could not parse event"),
                                );
                                continue;
                            }
                        };
                        dispatch_event(session, state, event);
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        alive = true;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, connection_id = %session.connection_id, "ws read error");
                        break;
                    }
                    _ => {}
                }
            }

            // Fan-out frame from the broadcast hub.
            result = broadcast_rx.recv() => {
                match result {
                    Ok(frame) => {
                        if frame.origin.as_deref() == Some(session.connection_id.as_str()) {
                            continue;
                        }
                        if send_event(&mut ws_tx, &frame.event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            connection_id = %session.connection_id,
                            skipped = n,
                            "session lagged behind broadcast"
                        );
                        // Continue — we just drop the missed events.
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Targeted emit for this connection alone.
            event = targeted_rx.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut ws_tx, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Liveness check.
            _ = liveness_timer.tick() => {
                if !alive {
                    tracing::debug!(
                        connection_id = %session.connection_id,
                        "liveness timeout — closing connection"
                    );
                    let _ = send_close(&mut ws_tx, "liveness timeout").await;
                    break;
                }
                alive = false;
                if ws_tx.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Route one client event to the component that owns it. Call errors are
/// soft: the originating connection gets a notice, the hub keeps running.
fn dispatch_event(session: &HubSession, state: &AppState, event: ClientEvent) {
    match event {
        ClientEvent::Join(_) => {
            state.registry.send_to(
                &session.connection_id,
                ServerEvent::error("ALREADY_JOINED", "connection has already joined"),
            );
        }
        ClientEvent::StatusUpdate(payload) => {
            if state.registry.set_status(&session.connection_id, payload.status) {
                state
                    .broadcast
                    .dispatch(None, ServerEvent::OnlineUsers(state.registry.snapshot()));
            }
        }
        ClientEvent::ChatMessage(payload) => {
            state.relay.chat_message(&session.connection_id, payload);
        }
        ClientEvent::FeedPost(post) => {
            state.relay.feed_post(&session.connection_id, post);
        }
        ClientEvent::FeedVote(vote) => {
            state.relay.feed_vote(&session.connection_id, vote);
        }
        ClientEvent::PaymentNotice(payload) => {
            state.relay.payment_notice(payload);
        }
        ClientEvent::LoanNotice(loan) => {
            state.relay.loan_notice(loan);
        }
        ClientEvent::CallOffer(payload) => {
            let result = state.calls.offer(
                &state.registry,
                &session.presence,
                &payload.callee_id,
                payload.kind,
                payload.sdp_offer,
            );
            if let Err(err) = result {
                state.registry.send_to(
                    &session.connection_id,
                    ServerEvent::CallUnavailable {
                        call_id: None,
                        reason: err.to_string(),
                    },
                );
            }
        }
        ClientEvent::CallAnswer(payload) => {
            let result = state.calls.accept(
                &state.registry,
                &session.connection_id,
                &payload.call_id,
                payload.sdp_answer,
            );
            if let Err(err) = result {
                send_call_error(session, state, err);
            }
        }
        ClientEvent::CallReject(payload) => {
            let result =
                state
                    .calls
                    .reject(&state.registry, &session.connection_id, &payload.call_id);
            if let Err(err) = result {
                send_call_error(session, state, err);
            }
        }
        ClientEvent::IceCandidate(payload) => {
            let result = state.calls.ice_candidate(
                &state.registry,
                &session.connection_id,
                &payload.call_id,
                payload.candidate,
            );
            if let Err(err) = result {
                send_call_error(session, state, err);
            }
        }
        ClientEvent::CallEnd(payload) => {
            let result =
                state
                    .calls
                    .end_call(&state.registry, &session.connection_id, &payload.call_id);
            if let Err(err) = result {
                send_call_error(session, state, err);
            }
        }
    }
}

fn send_call_error(session: &HubSession, state: &AppState, err: super::calls::CallError) {
    state.registry.send_to(
        &session.connection_id,
        ServerEvent::error("CALL_ERROR", err.to_string()),
    );
}

async fn send_event(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).unwrap();
    ws_tx.send(Message::Text(json.into())).await
}

/// Send a WebSocket close frame with a reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(axum::extract::ws::CloseFrame {
        code: 1000,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
