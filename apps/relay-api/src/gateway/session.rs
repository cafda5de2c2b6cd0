//! Per-connection and per-member session state.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use super::events::MemberView;

/// A serialized outbound frame, shared across every recipient of a broadcast.
pub type Frame = Arc<str>;

/// Why a frame could not be queued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The connection task has ended.
    Closed,
    /// The connection's outbound queue is full.
    Full,
}

/// Non-owning delivery handle to one connection's outbound queue.
///
/// Holds a weak sender: once the connection task drops its [`Connection`],
/// the handle stops upgrading and deliveries fail with
/// [`DeliveryError::Closed`].
#[derive(Debug, Clone)]
pub struct MemberLink {
    pub conn_id: String,
    tx: mpsc::WeakSender<Frame>,
}

impl MemberLink {
    /// Queue a frame without waiting.
    pub fn try_deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        let tx = self.tx.upgrade().ok_or(DeliveryError::Closed)?;
        tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Protocol state of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unjoined,
    Joined { room_id: String, member_id: String },
    /// Terminal; reached on explicit leave or transport closure.
    Closed,
}

/// State for a single WebSocket connection, owned by its task.
pub struct Connection {
    /// Unique connection identifier (`conn_` prefixed ULID).
    pub id: String,
    outbound: mpsc::Sender<Frame>,
    state: ConnectionState,
}

impl Connection {
    /// Create a connection and the receiving end of its outbound queue.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let conn = Self {
            id: relay_common::prefixed_ulid(relay_common::id::prefix::CONNECTION),
            outbound: tx,
            state: ConnectionState::Unjoined,
        };
        (conn, rx)
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Weak delivery handle stored in the member record.
    pub fn link(&self) -> MemberLink {
        MemberLink {
            conn_id: self.id.clone(),
            tx: self.outbound.downgrade(),
        }
    }

    /// Claim one slot in the outbound queue, or `None` if it is full or
    /// the writer has gone away.
    pub(crate) fn reserve(&self) -> Option<mpsc::Permit<'_, Frame>> {
        self.outbound.try_reserve().ok()
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    /// Move to `Closed`, returning the previous state.
    pub(crate) fn close(&mut self) -> ConnectionState {
        std::mem::replace(&mut self.state, ConnectionState::Closed)
    }
}

/// Server-side record of one joined client. Owned by its [`Room`](super::room::Room).
#[derive(Debug, Clone)]
pub struct MemberSession {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Last reported position; advisory only.
    pub position: Option<Value>,
    pub is_host: bool,
    pub link: MemberLink,
}

impl MemberSession {
    pub fn view(&self) -> MemberView {
        MemberView {
            id: self.id.clone(),
            name: self.name.clone(),
            color: self.color.clone(),
            is_host: self.is_host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn link_delivers_while_connection_lives() {
        let (conn, mut rx) = Connection::new(4);
        let link = conn.link();
        link.try_deliver(Arc::from("hello")).unwrap();
        assert_eq!(&*rx.recv().await.unwrap(), "hello");
    }

    #[test]
    fn link_reports_closed_after_connection_drop() {
        let (conn, _rx) = Connection::new(4);
        let link = conn.link();
        drop(conn);
        assert_eq!(link.try_deliver(Arc::from("x")), Err(DeliveryError::Closed));
    }

    #[test]
    fn link_reports_full_queue() {
        let (conn, _rx) = Connection::new(1);
        let link = conn.link();
        link.try_deliver(Arc::from("a")).unwrap();
        assert_eq!(link.try_deliver(Arc::from("b")), Err(DeliveryError::Full));
    }

    #[test]
    fn close_is_terminal_and_returns_previous_state() {
        let (mut conn, _rx) = Connection::new(1);
        conn.set_state(ConnectionState::Joined {
            room_id: "r".into(),
            member_id: "m".into(),
        });
        assert!(matches!(conn.close(), ConnectionState::Joined { .. }));
        assert!(conn.is_closed());
        assert_eq!(conn.close(), ConnectionState::Closed);
    }
}
