use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::MaybeUser;
use crate::services::like_service::{self, ToggleRequest};
use crate::state::AppState;

/// Toggle the caller's like on a playlist, reconciling against the
/// client's optimistic counter. Guests get the echoed state back and
/// nothing is persisted.
#[utoipa::path(
    post,
    path = "/api/playlists/{id}/like",
    params(("id" = String, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Resulting like state and adjusted count"),
        (status = 404, description = "Playlist not visible")
    )
)]
pub async fn toggle_like(
    State(state): State<AppState>,
    MaybeUser(claims): MaybeUser,
    Path(id): Path<String>,
    Json(payload): Json<ToggleRequest>,
) -> impl IntoResponse {
    let user_id = claims.as_ref().map(|c| c.sub.as_str());
    match like_service::toggle(&state.db, &id, user_id, payload).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => super::domain_error_response(e),
    }
}
