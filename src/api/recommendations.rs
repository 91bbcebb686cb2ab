use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::recommendation;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateRecommendationRequest {
    pub playlist_id: String,
    pub theme_id: String,
    pub sequence: i32,
}

pub async fn create_recommendation(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<CreateRecommendationRequest>,
) -> impl IntoResponse {
    if !claims.is_admin {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Admin only" })),
        )
            .into_response();
    }

    let now = chrono::Utc::now().to_rfc3339();
    let row = recommendation::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        playlist_id: Set(payload.playlist_id),
        theme_id: Set(payload.theme_id),
        sequence: Set(payload.sequence),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    };
    match row.insert(&state.db).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => super::domain_error_response(e.into()),
    }
}

/// Editorial pins are hard-deleted.
pub async fn delete_recommendation(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if !claims.is_admin {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Admin only" })),
        )
            .into_response();
    }

    match recommendation::Entity::delete_by_id(id).exec(&state.db).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => super::domain_error_response(e.into()),
    }
}
