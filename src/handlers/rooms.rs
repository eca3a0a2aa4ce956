use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::models::{ErrorResponse, RoomKey, RoomMembersResponse};
use crate::AppState;

/// List the members of a room in join order. Unknown rooms have no members.
pub async fn room_members(
    State(app_state): State<Arc<AppState>>,
    Path(room_key): Path<String>,
) -> Result<(StatusCode, Json<RoomMembersResponse>), (StatusCode, Json<ErrorResponse>)> {
    let room_key = RoomKey(room_key);
    if room_key.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(StatusCode::BAD_REQUEST, "room key must not be empty")),
        ));
    }

    let members = app_state.service.list_members(&room_key).await;
    debug!("Room {} has {} member(s)", room_key, members.len());

    Ok((StatusCode::OK, Json(RoomMembersResponse { room_key, members })))
}
