use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Member, RoomKey};

/// Current membership of a room, ordered by join time
#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomMembersResponse {
    pub room_key: RoomKey,
    pub members: Vec<Member>,
}
