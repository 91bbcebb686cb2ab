use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{ColumnTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Claims;
use crate::domain::SoftDeleteScopes;
use crate::models::playlist;
use crate::services::{like_service, playlist_service, search};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaylistListQuery {
    pub q: Option<String>,
    pub theme: Option<String>,
}

#[derive(Serialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub theme_id: String,
    pub og_image_url: Option<String>,
    pub created_at: String,
    pub like_count: u64,
}

/// Free-text search over visible playlists; exact matches rank above
/// substring matches.
#[utoipa::path(
    get,
    path = "/api/playlists",
    params(
        ("q" = Option<String>, Query, description = "Free-text query"),
        ("theme" = Option<String>, Query, description = "Theme slug filter")
    ),
    responses(
        (status = 200, description = "Matching playlists, exact matches first")
    )
)]
pub async fn list_playlists(
    State(state): State<AppState>,
    Query(params): Query<PlaylistListQuery>,
) -> impl IntoResponse {
    let found = search::search_playlists(
        &state.db,
        params.q.as_deref(),
        params.theme.as_deref(),
    )
    .await;
    let found = match found {
        Ok(found) => found,
        Err(e) => return super::domain_error_response(e),
    };

    let mut summaries = Vec::with_capacity(found.len());
    for row in found {
        // Per-row count query; the list is small and pages elsewhere.
        let like_count = match like_service::count_for_playlist(&state.db, &row.id).await {
            Ok(count) => count,
            Err(e) => return super::domain_error_response(e),
        };
        summaries.push(PlaylistSummary {
            id: row.id,
            title: row.title,
            description: row.description,
            theme_id: row.theme_id,
            og_image_url: row.og_image.as_deref().map(|p| state.storage.url(p)),
            created_at: row.created_at,
            like_count,
        });
    }
    (StatusCode::OK, Json(summaries)).into_response()
}

pub async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let found = playlist::Entity::visible()
        .filter(playlist::Column::Id.eq(id))
        .one(&state.db)
        .await;
    match found {
        Ok(Some(target)) => match playlist_service::detail(&state.db, &target).await {
            Ok(mut detail) => {
                detail.og_image = detail.og_image.as_deref().map(|p| state.storage.url(p));
                (StatusCode::OK, Json(detail)).into_response()
            }
            Err(e) => super::domain_error_response(e),
        },
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Playlist not found" })),
        )
            .into_response(),
        Err(e) => super::domain_error_response(e.into()),
    }
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub hard: Option<bool>,
}

/// Owner-only delete. Soft by default; `?hard=true` also purges the
/// Open Graph blob and physically removes the rows.
pub async fn delete_playlist(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
    Query(params): Query<DeleteQuery>,
) -> impl IntoResponse {
    let found = playlist::Entity::active()
        .filter(playlist::Column::Id.eq(&id))
        .one(&state.db)
        .await;
    let target = match found {
        Ok(Some(target)) => target,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Playlist not found" })),
            )
                .into_response();
        }
        Err(e) => return super::domain_error_response(e.into()),
    };

    if target.user_id != claims.sub {
        return super::redirect_with_warning(
            format!("/api/playlists/{}", target.id),
            "Only the owner can delete this playlist.",
        );
    }

    let result = if params.hard.unwrap_or(false) {
        playlist_service::hard_delete(&state.db, &state.storage, target).await
    } else {
        playlist_service::soft_delete(&state.db, target).await
    };
    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Playlist deleted successfully." })),
        )
            .into_response(),
        Err(e) => super::domain_error_response(e),
    }
}
