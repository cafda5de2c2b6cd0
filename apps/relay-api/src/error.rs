use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// HTTP errors
// ---------------------------------------------------------------------------

/// Structured API error returned to HTTP clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

/// Application-level error type that converts into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Gateway protocol errors
// ---------------------------------------------------------------------------

/// Errors reported to a single WebSocket connection.
///
/// None of these terminate the connection or touch state outside the
/// offending connection; they are rendered as an `error` message and the
/// inbound message is otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The frame was not valid JSON.
    #[error("invalid json")]
    InvalidJson,
    /// Known message kind with missing or ill-typed fields.
    #[error("malformed message: {0}")]
    MalformedInput(String),
    /// The `type` tag names no message kind the server knows.
    #[error("unknown message type `{0}`")]
    UnknownKind(String),
    /// The target room is at capacity.
    #[error("room {room_id} is full ({capacity} members)")]
    RoomFull { room_id: String, capacity: usize },
    /// Update/action/leave sent before a successful join.
    #[error("join a room first")]
    NotJoined,
    /// Strict join to a room that does not exist.
    #[error("room {0} not found")]
    UnknownRoom(String),
    /// Join sent on a connection that is already in a room.
    #[error("already in a room; leave first")]
    AlreadyJoined,
    /// The connection's outbound queue cannot take the join ack.
    #[error("connection is backed up; retry the join")]
    Backpressure,
}

impl RelayError {
    /// Stable machine-readable code sent on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson => "invalid_json",
            Self::MalformedInput(_) => "malformed_input",
            Self::UnknownKind(_) => "unknown_kind",
            Self::RoomFull { .. } => "room_full",
            Self::NotJoined => "not_joined",
            Self::UnknownRoom(_) => "unknown_room",
            Self::AlreadyJoined => "already_joined",
            Self::Backpressure => "backpressure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_error_codes_are_stable() {
        assert_eq!(RelayError::InvalidJson.code(), "invalid_json");
        assert_eq!(
            RelayError::RoomFull {
                room_id: "r".into(),
                capacity: 4
            }
            .code(),
            "room_full"
        );
        assert_eq!(RelayError::UnknownRoom("x".into()).code(), "unknown_room");
    }

    #[test]
    fn relay_error_messages_name_the_room() {
        let err = RelayError::RoomFull {
            room_id: "abc123".into(),
            capacity: 4,
        };
        assert_eq!(err.to_string(), "room abc123 is full (4 members)");
    }

    #[test]
    fn relay_error_is_a_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(RelayError::UnknownKind("warp".into()));
        assert_eq!(err.to_string(), "unknown message type `warp`");
        assert_eq!(RelayError::Backpressure.code(), "backpressure");
    }
}
