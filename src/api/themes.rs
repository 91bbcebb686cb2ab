use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::json;

use crate::domain::SoftDeleteScopes;
use crate::models::{playlist, recommendation, theme};
use crate::services::playlist_service;
use crate::state::AppState;

pub async fn list_themes(State(state): State<AppState>) -> impl IntoResponse {
    match theme::Entity::active()
        .order_by_asc(theme::Column::Sequence)
        .all(&state.db)
        .await
    {
        Ok(themes) => (StatusCode::OK, Json(themes)).into_response(),
        Err(e) => super::domain_error_response(e.into()),
    }
}

/// Editorial picks for a theme, in curated order, resolved to the
/// playlists a visitor may actually see.
pub async fn list_theme_recommendations(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let found = theme::Entity::active()
        .filter(theme::Column::Slug.eq(slug))
        .one(&state.db)
        .await;
    let theme_row = match found {
        Ok(Some(theme_row)) => theme_row,
        Ok(None) => {
            return (StatusCode::NOT_FOUND, Json(json!({ "error": "Theme not found" })))
                .into_response();
        }
        Err(e) => return super::domain_error_response(e.into()),
    };

    let pins = match recommendation::Entity::find()
        .filter(recommendation::Column::ThemeId.eq(&theme_row.id))
        .order_by_asc(recommendation::Column::Sequence)
        .all(&state.db)
        .await
    {
        Ok(pins) => pins,
        Err(e) => return super::domain_error_response(e.into()),
    };

    let mut playlists = Vec::new();
    for pin in pins {
        let visible = playlist::Entity::visible()
            .filter(playlist::Column::Id.eq(&pin.playlist_id))
            .one(&state.db)
            .await;
        match visible {
            Ok(Some(target)) => match playlist_service::detail(&state.db, &target).await {
                Ok(detail) => playlists.push(detail),
                Err(e) => return super::domain_error_response(e),
            },
            Ok(None) => {} // unpublished or deleted since pinning
            Err(e) => return super::domain_error_response(e.into()),
        }
    }

    (
        StatusCode::OK,
        Json(json!({ "theme": theme_row, "playlists": playlists })),
    )
        .into_response()
}
