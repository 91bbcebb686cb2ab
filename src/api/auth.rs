use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, QueryFilter, Set};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{Claims, create_jwt, hash_password, verify_password};
use crate::domain::SoftDeleteScopes;
use crate::models::user;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub nickname: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    if payload.username.trim().is_empty() || payload.password.len() < 8 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "Username and a password of at least 8 characters are required" })),
        )
            .into_response();
    }

    let taken = user::Entity::active()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(payload.username.clone()))
                .add(user::Column::Email.eq(payload.email.clone())),
        )
        .one(&state.db)
        .await;
    match taken {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Username or email already in use" })),
            )
                .into_response();
        }
        Err(e) => return super::domain_error_response(e.into()),
        Ok(None) => {}
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => return super::domain_error_response(e),
    };

    let now = chrono::Utc::now().to_rfc3339();
    let row = user::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        username: Set(payload.username.trim().to_string()),
        email: Set(payload.email.trim().to_string()),
        password_hash: Set(password_hash),
        nickname: Set(payload.nickname),
        is_active: Set(true),
        is_admin: Set(false),
        date_verified: Set(Some(now.clone())),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    match row.insert(&state.db).await {
        Ok(created) => match create_jwt(&created.id, &created.username, created.is_admin) {
            Ok(token) => (
                StatusCode::CREATED,
                Json(json!({ "token": token, "user": created })),
            )
                .into_response(),
            Err(e) => super::domain_error_response(e),
        },
        Err(e) => super::domain_error_response(e.into()),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let found = user::Entity::active()
        .filter(user::Column::Username.eq(payload.username.clone()))
        .filter(user::Column::IsActive.eq(true))
        .one(&state.db)
        .await;

    let found = match found {
        Ok(found) => found,
        Err(e) => return super::domain_error_response(e.into()),
    };
    let Some(found) = found else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials" })),
        )
            .into_response();
    };

    match verify_password(&payload.password, &found.password_hash) {
        Ok(true) => match create_jwt(&found.id, &found.username, found.is_admin) {
            Ok(token) => (
                StatusCode::OK,
                Json(json!({ "token": token, "user": found })),
            )
                .into_response(),
            Err(e) => super::domain_error_response(e),
        },
        Ok(false) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials" })),
        )
            .into_response(),
        Err(e) => super::domain_error_response(e),
    }
}

pub async fn get_me(State(state): State<AppState>, claims: Claims) -> impl IntoResponse {
    match user::Entity::active()
        .filter(user::Column::Id.eq(claims.sub))
        .one(&state.db)
        .await
    {
        Ok(Some(found)) => (StatusCode::OK, Json(found)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        )
            .into_response(),
        Err(e) => super::domain_error_response(e.into()),
    }
}
