pub mod auth;
pub mod books;
pub mod draft;
pub mod health;
pub mod likes;
pub mod playlists;
pub mod recommendations;
pub mod themes;

use axum::{
    Json, Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::json;

use crate::domain::DomainError;
use crate::state::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::get_me))
        // Themes & editorial recommendations
        .route("/themes", get(themes::list_themes))
        .route(
            "/themes/:slug/recommendations",
            get(themes::list_theme_recommendations),
        )
        .route("/recommendations", post(recommendations::create_recommendation))
        .route(
            "/recommendations/:id",
            delete(recommendations::delete_recommendation),
        )
        // Draft workflow (static segments must be declared before :id)
        .route("/playlists/draft", get(draft::get_draft))
        .route(
            "/playlists/draft/books",
            get(draft::search_books).post(draft::pick_book),
        )
        .route("/playlists/draft/submit", post(draft::submit))
        // Playlists
        .route("/playlists", get(playlists::list_playlists))
        .route(
            "/playlists/:id",
            get(playlists::get_playlist).delete(playlists::delete_playlist),
        )
        .route("/playlists/:id/like", post(likes::toggle_like))
        // Book catalog
        .route("/books/search", get(books::search_books))
        .route("/lookup/:isbn", get(books::lookup_book))
        .with_state(state)
}

/// Anticipated failures never dead-end: warn and point the client back
/// to a safe prior state.
pub(crate) fn redirect_with_warning(location: String, warning: &str) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location.clone())],
        Json(json!({ "redirect": location, "warning": warning })),
    )
        .into_response()
}

pub(crate) fn domain_error_response(e: DomainError) -> Response {
    match e {
        DomainError::NotFound => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
        }
        DomainError::Validation(msg) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": msg })),
        )
            .into_response(),
        other => {
            tracing::error!("{}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": other.to_string() })),
            )
                .into_response()
        }
    }
}
