//! Gateway wire-format messages.
//!
//! Every frame is a JSON object tagged by `type`. Inbound and outbound kinds
//! are closed enums so the dispatcher in `handler` is exhaustive.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

/// Inbound `type` tags, including aliases.
const CLIENT_KINDS: &[&str] = &[
    "join",
    "create_room",
    "join_room",
    "update",
    "move",
    "chat",
    "action",
    "start",
    "start_room",
    "leave",
];

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// A message received from the client over WebSocket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join `room`, creating it if needed; no room means "create a new one".
    Join {
        #[serde(default)]
        room: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    /// Always create a fresh room with a server-chosen code.
    CreateRoom {
        #[serde(default)]
        name: Option<String>,
    },
    /// Join an existing room only; unknown rooms are rejected.
    JoinRoom {
        room: String,
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(alias = "move")]
    Update { position: Value },
    Chat { text: String },
    Action { payload: Value },
    #[serde(alias = "start_room")]
    Start {},
    Leave {},
}

impl ClientMessage {
    /// Decode a text frame, classifying failures for the `error` reply.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_str(text).map_err(|_| RelayError::InvalidJson)?;

        let kind = match value.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(_) => return Err(RelayError::MalformedInput("`type` must be a string".into())),
            None => return Err(RelayError::MalformedInput("missing `type`".into())),
        };
        if !CLIENT_KINDS.contains(&kind.as_str()) {
            return Err(RelayError::UnknownKind(kind));
        }

        serde_json::from_value(value).map_err(|e| RelayError::MalformedInput(e.to_string()))
    }

    /// Short name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::CreateRoom { .. } => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::Update { .. } => "update",
            Self::Chat { .. } => "chat",
            Self::Action { .. } => "action",
            Self::Start {} => "start",
            Self::Leave {} => "leave",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// One entry of a membership snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: String,
    pub name: String,
    pub color: String,
    pub is_host: bool,
}

/// A message sent from the server to the client over WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Private acknowledgment of a successful join.
    #[serde(rename_all = "camelCase")]
    Joined {
        room: String,
        id: String,
        color: String,
        is_host: bool,
        revision: u64,
        members: Vec<MemberView>,
    },
    /// Full ordered membership, sent after every membership change.
    RoomState {
        room: String,
        revision: u64,
        members: Vec<MemberView>,
    },
    Update {
        from: String,
        color: String,
        position: Value,
    },
    Chat {
        from: String,
        name: String,
        color: String,
        text: String,
    },
    Action {
        from: String,
        color: String,
        payload: Value,
    },
    Start {
        room: String,
        members: Vec<MemberView>,
    },
    /// Private acknowledgment of an explicit leave.
    Left { room: String },
    Error { code: String, message: String },
}

impl From<&RelayError> for ServerMessage {
    fn from(err: &RelayError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_join_with_and_without_room() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"join","room":"R1","name":"ann"}"#).unwrap(),
            ClientMessage::Join {
                room: Some("R1".into()),
                name: Some("ann".into())
            }
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"join"}"#).unwrap(),
            ClientMessage::Join {
                room: None,
                name: None
            }
        );
    }

    #[test]
    fn aliases_map_to_canonical_kinds() {
        let msg = ClientMessage::parse(r#"{"type":"move","position":{"x":1,"y":2}}"#).unwrap();
        assert_eq!(msg.kind(), "update");

        let msg = ClientMessage::parse(r#"{"type":"start_room","room":"abc"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Start {});
    }

    #[test]
    fn invalid_json_is_classified() {
        assert_eq!(ClientMessage::parse("{nope"), Err(RelayError::InvalidJson));
    }

    #[test]
    fn unknown_kind_is_classified() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"teleport"}"#),
            Err(RelayError::UnknownKind("teleport".into()))
        );
    }

    #[test]
    fn missing_fields_are_malformed() {
        for text in [
            r#"{"type":"chat"}"#,
            r#"{"type":"update"}"#,
            r#"{"type":"action"}"#,
            r#"{"type":"join_room"}"#,
            r#"{"room":"R1"}"#,
            r#"{"type":7}"#,
            r#"[1,2,3]"#,
        ] {
            let err = ClientMessage::parse(text).unwrap_err();
            assert_eq!(err.code(), "malformed_input", "for {text}");
        }
    }

    #[test]
    fn joined_serializes_camel_case() {
        let msg = ServerMessage::Joined {
            room: "R1".into(),
            id: "mbr_1".into(),
            color: "#e53935".into(),
            is_host: true,
            revision: 1,
            members: vec![MemberView {
                id: "mbr_1".into(),
                name: "ann".into(),
                color: "#e53935".into(),
                is_host: true,
            }],
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "joined");
        assert_eq!(value["isHost"], true);
        assert_eq!(value["members"][0]["isHost"], true);
    }

    #[test]
    fn error_message_carries_code() {
        let value = serde_json::to_value(ServerMessage::from(&RelayError::NotJoined)).unwrap();
        assert_eq!(
            value,
            json!({ "type": "error", "code": "not_joined", "message": "join a room first" })
        );
    }
}
