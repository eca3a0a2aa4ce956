use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Room membership, ordered by join time
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_key}/members",
    params(
        ("room_key" = String, Path, description = "Opaque room key")
    ),
    responses(
        (status = 200, description = "Current members of the room", body = RoomMembersResponse),
        (status = 400, description = "Empty room key", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn room_members_doc() {}

/// Connection, room and process statistics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics snapshot", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        room_members_doc,
        diagnostics_doc,
    ),
    components(
        schemas(HealthResponse, RoomMembersResponse, Member, ConnectionId, RoomKey, DiagnosticsResponse, ErrorResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
