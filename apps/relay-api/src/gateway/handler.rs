//! Inbound message dispatch and room lifecycle.
//!
//! All room mutations happen under that room's lock. Notifications are
//! addressed while the lock is held and delivered after it is released.

use serde_json::Value;

use crate::config::Config;
use crate::error::RelayError;

use super::events::{ClientMessage, ServerMessage};
use super::fanout::{Fanout, Outgoing};
use super::registry::{RoomHandle, RoomRegistry};
use super::session::{Connection, ConnectionState, MemberSession};

/// Longest accepted client-chosen room id.
pub const MAX_ROOM_ID_LEN: usize = 64;

/// Where a join should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTarget {
    /// Join this room, creating it if absent.
    Named(String),
    /// Create a fresh room with a server-chosen id.
    Create,
    /// Join this room only if it already exists.
    Existing(String),
}

/// Orchestrates joins, relays, and leaves for every connection.
pub struct SessionManager {
    registry: RoomRegistry,
    fanout: Fanout,
    max_name_len: usize,
    default_name: String,
    max_chat_len: usize,
}

impl SessionManager {
    pub fn new(config: &Config) -> Self {
        Self {
            registry: RoomRegistry::new(config.room_capacity, config.room_code_len),
            fanout: Fanout::new(),
            max_name_len: config.max_name_len,
            default_name: config.default_name.clone(),
            max_chat_len: config.max_chat_len,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn fanout(&self) -> &Fanout {
        &self.fanout
    }

    /// Decode and dispatch one text frame. Frames on a closed connection are
    /// ignored.
    pub fn handle_text(&self, conn: &mut Connection, text: &str) {
        if conn.is_closed() {
            return;
        }
        match ClientMessage::parse(text) {
            Ok(msg) => self.handle_message(conn, msg),
            Err(err) => self.reject(conn, &err),
        }
    }

    pub fn handle_message(&self, conn: &mut Connection, msg: ClientMessage) {
        if conn.is_closed() {
            return;
        }
        let kind = msg.kind();
        let result = match msg {
            ClientMessage::Join { room, name } => {
                let target = room.map_or(JoinTarget::Create, JoinTarget::Named);
                self.join(conn, target, name)
            }
            ClientMessage::CreateRoom { name } => self.join(conn, JoinTarget::Create, name),
            ClientMessage::JoinRoom { room, name } => {
                self.join(conn, JoinTarget::Existing(room), name)
            }
            ClientMessage::Update { position } => self.update(conn, position),
            ClientMessage::Chat { text } => self.chat(conn, text),
            ClientMessage::Action { payload } => self.action(conn, payload),
            ClientMessage::Start {} => self.start(conn),
            ClientMessage::Leave {} => self.leave(conn),
        };

        if let Err(err) = result {
            tracing::debug!(conn_id = %conn.id, kind, code = err.code(), "rejected message");
            self.reject(conn, &err);
        }
    }

    /// Send an `error` reply to `conn` only.
    pub fn reject(&self, conn: &Connection, err: &RelayError) {
        self.fanout
            .send(&Outgoing::to_one(conn.link(), ServerMessage::from(err)));
    }

    // -----------------------------------------------------------------------
    // Join
    // -----------------------------------------------------------------------

    /// Place an unjoined connection into a room.
    ///
    /// The joiner receives a private `joined` ack; everyone else in the room
    /// receives the new `room_state`.
    pub fn join(
        &self,
        conn: &mut Connection,
        target: JoinTarget,
        name: Option<String>,
    ) -> Result<(), RelayError> {
        if *conn.state() != ConnectionState::Unjoined {
            return Err(RelayError::AlreadyJoined);
        }
        let target = match target {
            JoinTarget::Named(id) => JoinTarget::Named(normalize_room_id(&id)?),
            JoinTarget::Existing(id) => JoinTarget::Existing(normalize_room_id(&id)?),
            JoinTarget::Create => JoinTarget::Create,
        };
        let name = self.display_name(name);
        let member_id = relay_common::prefixed_ulid(relay_common::id::prefix::MEMBER);

        // The ack must not be lost once the member is in the room, so claim
        // its queue slot before anything is created or admitted.
        let permit = conn.reserve().ok_or(RelayError::Backpressure)?;

        let (room_id, room_state) = loop {
            let handle = self.resolve(&target)?;
            let mut room = handle.lock();
            // Emptied and dropped from the registry after we looked it up.
            if room.is_retired() {
                continue;
            }

            let member = room.admit(member_id.clone(), name.clone(), conn.link())?;
            let room_id = room.id().to_string();
            let members = room.snapshot();
            let revision = room.revision();

            let joined = ServerMessage::Joined {
                room: room_id.clone(),
                id: member_id.clone(),
                color: member.color,
                is_host: member.is_host,
                revision,
                members: members.clone(),
            };
            self.fanout.send_reserved(permit, &joined);

            let state = ServerMessage::RoomState {
                room: room_id.clone(),
                revision,
                members,
            };
            break (room_id, Outgoing::to_room(&room, state, Some(&member_id)));
        };

        tracing::info!(%room_id, %member_id, conn_id = %conn.id, %name, "member joined");
        conn.set_state(ConnectionState::Joined {
            room_id,
            member_id,
        });
        self.fanout.send(&room_state);
        Ok(())
    }

    fn resolve(&self, target: &JoinTarget) -> Result<RoomHandle, RelayError> {
        match target {
            JoinTarget::Named(id) => Ok(self.registry.get_or_create(id)),
            JoinTarget::Create => Ok(self.registry.create_unique()),
            JoinTarget::Existing(id) => self
                .registry
                .get(id)
                .ok_or_else(|| RelayError::UnknownRoom(id.clone())),
        }
    }

    fn display_name(&self, name: Option<String>) -> String {
        let trimmed = name.as_deref().map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return self.default_name.clone();
        }
        let bounded: String = trimmed.chars().take(self.max_name_len.max(1)).collect();
        bounded.trim_end().to_string()
    }

    // -----------------------------------------------------------------------
    // Relays
    // -----------------------------------------------------------------------

    /// Record the sender's position and relay it to everyone else.
    pub fn update(&self, conn: &Connection, position: Value) -> Result<(), RelayError> {
        let (room_id, member_id) = membership(conn)?;
        let handle = self.registry.get(room_id).ok_or(RelayError::NotJoined)?;
        let outgoing = {
            let mut room = handle.lock();
            let member = room
                .set_position(member_id, position.clone())
                .ok_or(RelayError::NotJoined)?;
            let msg = ServerMessage::Update {
                from: member.id.clone(),
                color: member.color.clone(),
                position,
            };
            Outgoing::to_room(&room, msg, Some(member_id))
        };
        self.fanout.send(&outgoing);
        Ok(())
    }

    /// Relay chat text to everyone else.
    pub fn chat(&self, conn: &Connection, text: String) -> Result<(), RelayError> {
        if text.trim().is_empty() {
            return Err(RelayError::MalformedInput("chat text is empty".into()));
        }
        if text.chars().count() > self.max_chat_len {
            return Err(RelayError::MalformedInput(format!(
                "chat text exceeds {} characters",
                self.max_chat_len
            )));
        }
        self.relay(conn, false, |member| ServerMessage::Chat {
            from: member.id.clone(),
            name: member.name.clone(),
            color: member.color.clone(),
            text,
        })
    }

    /// Relay an opaque game action to the whole room, sender included.
    pub fn action(&self, conn: &Connection, payload: Value) -> Result<(), RelayError> {
        self.relay(conn, true, |member| ServerMessage::Action {
            from: member.id.clone(),
            color: member.color.clone(),
            payload,
        })
    }

    /// Announce the session start to the whole room, sender included.
    pub fn start(&self, conn: &Connection) -> Result<(), RelayError> {
        let (room_id, member_id) = membership(conn)?;
        let handle = self.registry.get(room_id).ok_or(RelayError::NotJoined)?;
        let outgoing = {
            let room = handle.lock();
            if room.member(member_id).is_none() {
                return Err(RelayError::NotJoined);
            }
            let msg = ServerMessage::Start {
                room: room.id().to_string(),
                members: room.snapshot(),
            };
            Outgoing::to_room(&room, msg, None)
        };
        tracing::info!(%room_id, %member_id, "session started");
        self.fanout.send(&outgoing);
        Ok(())
    }

    /// Build a message from the sender's record and fan it out.
    fn relay(
        &self,
        conn: &Connection,
        include_sender: bool,
        build: impl FnOnce(&MemberSession) -> ServerMessage,
    ) -> Result<(), RelayError> {
        let (room_id, member_id) = membership(conn)?;
        let handle = self.registry.get(room_id).ok_or(RelayError::NotJoined)?;
        let outgoing = {
            let room = handle.lock();
            let member = room.member(member_id).ok_or(RelayError::NotJoined)?;
            let msg = build(member);
            let exclude = (!include_sender).then_some(member_id);
            Outgoing::to_room(&room, msg, exclude)
        };
        self.fanout.send(&outgoing);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Leave
    // -----------------------------------------------------------------------

    /// Explicit leave: remove the member, acknowledge with `left`, and close
    /// the connection.
    pub fn leave(&self, conn: &mut Connection) -> Result<(), RelayError> {
        let ConnectionState::Joined { room_id, .. } = conn.state().clone() else {
            return Err(RelayError::NotJoined);
        };
        let link = conn.link();
        self.disconnect(conn);
        self.fanout
            .send(&Outgoing::to_one(link, ServerMessage::Left { room: room_id }));
        Ok(())
    }

    /// Tear down a connection's membership. Safe to call any number of times;
    /// only the first call on a joined connection has an effect.
    ///
    /// Returns whether a member was removed.
    pub fn disconnect(&self, conn: &mut Connection) -> bool {
        let ConnectionState::Joined { room_id, member_id } = conn.close() else {
            return false;
        };
        self.remove_member(&room_id, &member_id)
    }

    fn remove_member(&self, room_id: &str, member_id: &str) -> bool {
        let Some(handle) = self.registry.get(room_id) else {
            return false;
        };

        let outgoing = {
            let mut room = handle.lock();
            let Some(departure) = room.remove(member_id) else {
                return false;
            };
            tracing::info!(
                %room_id,
                %member_id,
                new_host = departure.new_host.as_deref().unwrap_or("-"),
                remaining = room.len(),
                "member left"
            );

            if room.is_empty() {
                self.registry.retire_if_empty(&mut room, &handle);
                None
            } else {
                let msg = ServerMessage::RoomState {
                    room: room.id().to_string(),
                    revision: room.revision(),
                    members: room.snapshot(),
                };
                Some(Outgoing::to_room(&room, msg, None))
            }
        };

        if let Some(outgoing) = outgoing {
            self.fanout.send(&outgoing);
        }
        true
    }
}

fn membership(conn: &Connection) -> Result<(&str, &str), RelayError> {
    match conn.state() {
        ConnectionState::Joined { room_id, member_id } => Ok((room_id.as_str(), member_id.as_str())),
        _ => Err(RelayError::NotJoined),
    }
}

fn normalize_room_id(raw: &str) -> Result<String, RelayError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(RelayError::MalformedInput("room id is empty".into()));
    }
    if id.chars().count() > MAX_ROOM_ID_LEN {
        return Err(RelayError::MalformedInput(format!(
            "room id exceeds {MAX_ROOM_ID_LEN} characters"
        )));
    }
    if id.chars().any(char::is_control) {
        return Err(RelayError::MalformedInput(
            "room id contains control characters".into(),
        ));
    }
    Ok(id.to_string())
}
