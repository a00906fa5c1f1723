//! WebRTC call signaling: offer/answer/ICE relay and the per-call state
//! machine (`Offered → Ringing → Connected → Ended`).
//!
//! The coordinator owns every `CallSession`; nothing else mutates call state.
//! Media never touches the hub — once the handshake completes the peers talk
//! directly.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use agrihub_common::id::{prefix, prefixed_ulid};

use crate::models::call_log::CallKind;

use super::events::{CallOfferNotice, ServerEvent};
use super::registry::{ConnectionRegistry, PresenceRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Offered,
    Ringing,
    Connected,
    Ended,
}

/// One signaling handshake between a caller connection and a callee user.
pub struct CallSession {
    pub call_id: String,
    pub caller_user_id: String,
    pub callee_user_id: String,
    pub caller_conn_id: String,
    /// Bound at accept time; `None` while every callee device is still ringing.
    pub callee_conn_id: Option<String>,
    pub kind: CallKind,
    pub state: CallState,
    /// Callee connections the offer was delivered to (first accept wins).
    rung_conns: Vec<String>,
    /// Monotonic ring start, for the timeout sweeper.
    ringing_since: Instant,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// What ending a call reports back.
#[derive(Debug, Clone)]
pub struct CallSummary {
    pub call_id: String,
    pub caller_user_id: String,
    pub callee_user_id: String,
    pub caller_conn_id: String,
    pub kind: CallKind,
    pub connected: bool,
    /// Seconds between accept and end; 0 if the call never connected.
    pub duration_secs: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CallError {
    /// The callee has no live connection.
    CalleeOffline,
    /// The caller's connection is already party to an active call.
    CallerBusy,
    /// The callee is already ringing or connected elsewhere.
    CalleeBusy,
    UnknownCall,
    /// The operation does not apply in the session's current state, or came
    /// from a connection that is not a party to the call.
    InvalidState(&'static str),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::CalleeOffline => write!(f, "callee is offline"),
            CallError::CallerBusy => write!(f, "you are already in a call"),
            CallError::CalleeBusy => write!(f, "callee is busy"),
            CallError::UnknownCall => write!(f, "no such call"),
            CallError::InvalidState(detail) => write!(f, "{detail}"),
        }
    }
}

/// Owns all call sessions and relays signaling between the parties.
pub struct CallCoordinator {
    calls: DashMap<String, Mutex<CallSession>>,
    /// Connections bound to an active call: the caller from offer time, the
    /// accepting callee device from accept time.
    by_conn: DashMap<String, String>,
    /// Callee logical id → active call, from offer until the call ends.
    by_callee: DashMap<String, String>,
}

impl CallCoordinator {
    pub fn new() -> Self {
        Self {
            calls: DashMap::new(),
            by_conn: DashMap::new(),
            by_callee: DashMap::new(),
        }
    }

    /// Start a call: resolve the callee's connections, create the session,
    /// and ring every device. Returns the new call id.
    pub fn offer(
        &self,
        registry: &ConnectionRegistry,
        caller: &PresenceRecord,
        callee_user_id: &str,
        kind: CallKind,
        sdp_offer: Value,
    ) -> Result<String, CallError> {
        if self.by_conn.contains_key(&caller.connection_id) {
            return Err(CallError::CallerBusy);
        }
        if self.by_callee.contains_key(callee_user_id) {
            return Err(CallError::CalleeBusy);
        }

        let targets = registry.find_by_user(callee_user_id);
        if targets.is_empty() {
            // No dangling session for an unreachable callee.
            return Err(CallError::CalleeOffline);
        }
        if targets
            .iter()
            .any(|t| self.by_conn.contains_key(&t.connection_id))
        {
            return Err(CallError::CalleeBusy);
        }

        let call_id = prefixed_ulid(prefix::CALL);
        let rung_conns: Vec<String> =
            targets.iter().map(|t| t.connection_id.clone()).collect();

        let session = CallSession {
            call_id: call_id.clone(),
            caller_user_id: caller.user_id.clone(),
            callee_user_id: callee_user_id.to_string(),
            caller_conn_id: caller.connection_id.clone(),
            callee_conn_id: None,
            kind,
            state: CallState::Offered,
            rung_conns: rung_conns.clone(),
            ringing_since: Instant::now(),
            started_at: None,
            ended_at: None,
        };
        self.calls.insert(call_id.clone(), Mutex::new(session));
        self.by_conn
            .insert(caller.connection_id.clone(), call_id.clone());
        self.by_callee
            .insert(callee_user_id.to_string(), call_id.clone());

        if let Some(entry) = self.calls.get(&call_id) {
            entry.lock().state = CallState::Ringing;
        }

        let notice = ServerEvent::CallOffer(CallOfferNotice {
            call_id: call_id.clone(),
            from: caller.clone(),
            kind,
            sdp_offer,
        });
        for conn_id in &rung_conns {
            registry.send_to(conn_id, notice.clone());
        }

        tracing::debug!(
            call_id = %call_id,
            caller = %caller.user_id,
            callee = %callee_user_id,
            devices = rung_conns.len(),
            "call ringing"
        );
        Ok(call_id)
    }

    /// Accept a ringing call from one of the rung devices. The first accept
    /// wins; the losing devices are told the call was claimed elsewhere.
    pub fn accept(
        &self,
        registry: &ConnectionRegistry,
        acceptor_conn_id: &str,
        call_id: &str,
        sdp_answer: Value,
    ) -> Result<(), CallError> {
        let caller_conn_id;
        let losers: Vec<String>;
        {
            let entry = self.calls.get(call_id).ok_or(CallError::UnknownCall)?;
            let mut session = entry.lock();
            if session.state != CallState::Ringing {
                return Err(CallError::InvalidState("call is not ringing"));
            }
            if !session.rung_conns.iter().any(|c| c == acceptor_conn_id) {
                return Err(CallError::InvalidState("not a party to this call"));
            }
            session.state = CallState::Connected;
            session.started_at = Some(Utc::now());
            session.callee_conn_id = Some(acceptor_conn_id.to_string());
            caller_conn_id = session.caller_conn_id.clone();
            losers = session
                .rung_conns
                .iter()
                .filter(|c| *c != acceptor_conn_id)
                .cloned()
                .collect();
        }
        self.by_conn
            .insert(acceptor_conn_id.to_string(), call_id.to_string());

        registry.send_to(
            &caller_conn_id,
            ServerEvent::CallAnswer {
                call_id: call_id.to_string(),
                sdp_answer,
            },
        );
        for conn_id in &losers {
            registry.send_to(
                conn_id,
                ServerEvent::CallClaimed {
                    call_id: call_id.to_string(),
                },
            );
        }

        tracing::debug!(call_id = %call_id, "call connected");
        Ok(())
    }

    /// Reject a ringing call. The caller is told; the call ends for every
    /// rung device.
    pub fn reject(
        &self,
        registry: &ConnectionRegistry,
        rejector_conn_id: &str,
        call_id: &str,
    ) -> Result<(), CallError> {
        {
            let entry = self.calls.get(call_id).ok_or(CallError::UnknownCall)?;
            let session = entry.lock();
            if session.state != CallState::Ringing {
                return Err(CallError::InvalidState("call is not ringing"));
            }
            if !session.rung_conns.iter().any(|c| c == rejector_conn_id) {
                return Err(CallError::InvalidState("not a party to this call"));
            }
        }

        // The caller hears call-rejected instead of the generic call-ended.
        let summary = self.finish(
            registry,
            call_id,
            &[rejector_conn_id],
            Some(ServerEvent::CallRejected {
                call_id: call_id.to_string(),
            }),
        )?;
        tracing::info!(
            call_id = %call_id,
            caller = %summary.caller_user_id,
            "call rejected"
        );
        Ok(())
    }

    /// Relay an ICE candidate to the other party. Valid while ringing (early
    /// candidates) or connected; never changes state.
    pub fn ice_candidate(
        &self,
        registry: &ConnectionRegistry,
        from_conn_id: &str,
        call_id: &str,
        candidate: Value,
    ) -> Result<(), CallError> {
        let targets: Vec<String> = {
            let entry = self.calls.get(call_id).ok_or(CallError::UnknownCall)?;
            let session = entry.lock();
            if !matches!(session.state, CallState::Ringing | CallState::Connected) {
                return Err(CallError::InvalidState("call is not active"));
            }
            if from_conn_id == session.caller_conn_id {
                match &session.callee_conn_id {
                    Some(conn) => vec![conn.clone()],
                    None => session.rung_conns.clone(),
                }
            } else if session.rung_conns.iter().any(|c| c == from_conn_id) {
                vec![session.caller_conn_id.clone()]
            } else {
                return Err(CallError::InvalidState("not a party to this call"));
            }
        };

        let event = ServerEvent::IceCandidate {
            call_id: call_id.to_string(),
            candidate,
        };
        for conn_id in &targets {
            registry.send_to(conn_id, event.clone());
        }
        Ok(())
    }

    /// Explicit hangup from one party. Valid from any non-terminal state.
    pub fn end_call(
        &self,
        registry: &ConnectionRegistry,
        from_conn_id: &str,
        call_id: &str,
    ) -> Result<CallSummary, CallError> {
        {
            let entry = self.calls.get(call_id).ok_or(CallError::UnknownCall)?;
            let session = entry.lock();
            let is_party = from_conn_id == session.caller_conn_id
                || session.callee_conn_id.as_deref() == Some(from_conn_id)
                || session.rung_conns.iter().any(|c| c == from_conn_id);
            if !is_party {
                return Err(CallError::InvalidState("not a party to this call"));
            }
        }

        let summary = self.finish(registry, call_id, &[from_conn_id], None)?;
        tracing::info!(
            call_id = %call_id,
            caller = %summary.caller_user_id,
            callee = %summary.callee_user_id,
            connected = summary.connected,
            duration_secs = summary.duration_secs,
            "call ended"
        );
        Ok(summary)
    }

    /// Synthesize an end for any call this connection is party to. Called on
    /// transport drop so no session is ever orphaned in a non-terminal state.
    pub fn end_for_connection(&self, registry: &ConnectionRegistry, conn_id: &str) {
        // Bound party (caller, or callee once connected) dropped.
        if let Some((_, call_id)) = self.by_conn.remove(conn_id) {
            if let Ok(summary) = self.finish(registry, &call_id, &[conn_id], None) {
                tracing::info!(
                    call_id = %call_id,
                    connected = summary.connected,
                    duration_secs = summary.duration_secs,
                    "call ended by disconnect"
                );
            }
            return;
        }

        // A still-ringing device dropped: forget it, and end the call only
        // when no rung device remains.
        let mut dead_calls = Vec::new();
        for entry in self.calls.iter() {
            let mut session = entry.value().lock();
            if session.state == CallState::Ringing {
                session.rung_conns.retain(|c| c != conn_id);
                if session.rung_conns.is_empty() {
                    dead_calls.push(session.call_id.clone());
                }
            }
        }
        for call_id in dead_calls {
            if self.finish(registry, &call_id, &[conn_id], None).is_ok() {
                tracing::info!(call_id = %call_id, "call ended, callee unreachable");
            }
        }
    }

    /// End calls that have been ringing longer than `timeout`. The caller is
    /// told the call went unanswered instead of the generic ended notice.
    /// Returns how many calls were ended.
    pub fn sweep_ring_timeouts(
        &self,
        registry: &ConnectionRegistry,
        timeout: Duration,
    ) -> usize {
        let now = Instant::now();
        let overdue: Vec<String> = self
            .calls
            .iter()
            .filter_map(|entry| {
                let session = entry.value().lock();
                (session.state == CallState::Ringing
                    && now.duration_since(session.ringing_since) > timeout)
                    .then(|| session.call_id.clone())
            })
            .collect();

        let mut ended = 0;
        for call_id in &overdue {
            let unanswered = ServerEvent::CallUnavailable {
                call_id: Some(call_id.clone()),
                reason: "no answer".to_string(),
            };
            if self.finish(registry, call_id, &[], Some(unanswered)).is_ok() {
                tracing::info!(call_id = %call_id, "call ended, ring timeout");
                ended += 1;
            }
        }
        ended
    }

    /// Number of calls currently tracked (ringing or connected).
    pub fn active_calls(&self) -> usize {
        self.calls.len()
    }

    /// Terminal transition shared by every path to `Ended`: remove the
    /// session and its indexes, then notify the involved connections.
    /// Connections in `skip` get nothing; the caller gets `caller_notice`
    /// instead of `call-ended` when one is supplied.
    fn finish(
        &self,
        registry: &ConnectionRegistry,
        call_id: &str,
        skip: &[&str],
        caller_notice: Option<ServerEvent>,
    ) -> Result<CallSummary, CallError> {
        // Removing the entry first means late signaling sees UnknownCall
        // rather than a half-torn-down session.
        let (_, session) = self.calls.remove(call_id).ok_or(CallError::UnknownCall)?;
        let mut session = session.into_inner();
        let was_connected = session.state == CallState::Connected;
        session.state = CallState::Ended;
        session.ended_at = Some(Utc::now());
        let duration_secs = match (session.started_at, session.ended_at) {
            (Some(start), Some(end)) => (end - start).num_seconds(),
            _ => 0,
        };

        self.by_conn
            .remove_if(&session.caller_conn_id, |_, v| v == call_id);
        if let Some(conn) = &session.callee_conn_id {
            self.by_conn.remove_if(conn, |_, v| v == call_id);
        }
        self.by_callee
            .remove_if(&session.callee_user_id, |_, v| v == call_id);

        if !skip.contains(&session.caller_conn_id.as_str()) {
            let notice = caller_notice.unwrap_or(ServerEvent::CallEnded {
                call_id: call_id.to_string(),
            });
            registry.send_to(&session.caller_conn_id, notice);
        }
        let callee_conns: Vec<&String> = match &session.callee_conn_id {
            Some(conn) => vec![conn],
            None => session.rung_conns.iter().collect(),
        };
        for conn_id in callee_conns {
            if !skip.contains(&conn_id.as_str()) {
                registry.send_to(
                    conn_id,
                    ServerEvent::CallEnded {
                        call_id: call_id.to_string(),
                    },
                );
            }
        }

        Ok(CallSummary {
            call_id: session.call_id,
            caller_user_id: session.caller_user_id,
            callee_user_id: session.callee_user_id,
            caller_conn_id: session.caller_conn_id,
            kind: session.kind,
            connected: was_connected,
            duration_secs,
        })
    }
}
