//! Read-only room introspection.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ApiError, ApiErrorBody};
use crate::gateway::events::MemberView;
use crate::gateway::fanout::FanoutStats;
use crate::gateway::handler::MAX_ROOM_ID_LEN;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/rooms/{room_id}", get(get_room))
}

// ---------------------------------------------------------------------------
// GET /api/v1/stats
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub rooms: usize,
    pub members: usize,
    pub fanout: FanoutStats,
}

#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "Rooms",
    responses(
        (status = 200, description = "Relay counters", body = StatsResponse),
    ),
)]
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let registry = state.relay.registry();
    Json(StatsResponse {
        rooms: registry.len(),
        members: registry.member_count(),
        fanout: state.relay.fanout().stats(),
    })
}

// ---------------------------------------------------------------------------
// GET /api/v1/rooms/{room_id}
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub id: String,
    /// `0` means unlimited.
    pub capacity: usize,
    pub host_id: Option<String>,
    pub revision: u64,
    pub members: Vec<MemberView>,
}

#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}",
    tag = "Rooms",
    params(
        ("room_id" = String, Path, description = "Room ID"),
    ),
    responses(
        (status = 200, description = "Room membership", body = RoomResponse),
        (status = 400, description = "Invalid room ID", body = ApiErrorBody),
        (status = 404, description = "Room not found", body = ApiErrorBody),
    ),
)]
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    if room_id.chars().count() > MAX_ROOM_ID_LEN {
        return Err(ApiError::bad_request("Room ID is too long"));
    }

    let handle = state
        .relay
        .registry()
        .get(&room_id)
        .ok_or_else(|| ApiError::not_found("Room not found"))?;
    let room = handle.lock();

    Ok(Json(RoomResponse {
        id: room.id().to_string(),
        capacity: room.capacity(),
        host_id: room.host_id().map(str::to_string),
        revision: room.revision(),
        members: room.snapshot(),
    }))
}
