//! Best-effort delivery of gateway messages to room members.
//!
//! Notifications are addressed under the room lock (`Outgoing`) and
//! delivered after it is released. Each message is serialized once and the
//! frame shared by every recipient. Delivery never waits: a closed or full
//! connection queue is skipped and counted in `dropped`, and the loop moves on.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;
use utoipa::ToSchema;

use super::events::ServerMessage;
use super::room::Room;
use super::session::{DeliveryError, Frame, MemberLink};

/// A message together with the connections it is addressed to.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub recipients: Vec<MemberLink>,
    pub message: ServerMessage,
}

impl Outgoing {
    /// Address every member of `room` except `exclude`.
    pub fn to_room(room: &Room, message: ServerMessage, exclude: Option<&str>) -> Self {
        Self {
            recipients: room.recipients(exclude),
            message,
        }
    }

    /// Address a single connection.
    pub fn to_one(link: MemberLink, message: ServerMessage) -> Self {
        Self {
            recipients: vec![link],
            message,
        }
    }
}

/// Outcome of a single fan-out call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Lifetime delivery counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct FanoutStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// The process-wide fan-out hub. Store in `AppState` behind the session manager.
#[derive(Default)]
pub struct Fanout {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one addressed message. Failures for one recipient never
    /// affect the others.
    pub fn send(&self, outgoing: &Outgoing) -> FanoutReport {
        let mut report = FanoutReport::default();
        if outgoing.recipients.is_empty() {
            return report;
        }

        let frame: Frame = match serde_json::to_string(&outgoing.message) {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize gateway message");
                report.dropped = outgoing.recipients.len();
                self.dropped
                    .fetch_add(report.dropped as u64, Ordering::Relaxed);
                return report;
            }
        };

        for link in &outgoing.recipients {
            match link.try_deliver(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Closed) => {
                    report.dropped += 1;
                    tracing::debug!(conn_id = %link.conn_id, "skipping closed connection");
                }
                Err(DeliveryError::Full) => {
                    report.dropped += 1;
                    tracing::debug!(conn_id = %link.conn_id, "outbound queue full, message dropped");
                }
            }
        }

        self.delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);
        report
    }

    /// Deliver a message into a queue slot the caller already holds.
    pub fn send_reserved(&self, permit: mpsc::Permit<'_, Frame>, message: &ServerMessage) {
        match serde_json::to_string(message) {
            Ok(json) => {
                permit.send(json.into());
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize gateway message");
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> FanoutStats {
        FanoutStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
