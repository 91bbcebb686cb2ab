use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::lookup::{LookupOutcome, LookupQuery};
use crate::services::book_service;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct BookSearchQuery {
    pub q: Option<String>,
}

/// Local catalog search; books on more playlists rank first.
pub async fn search_books(
    State(state): State<AppState>,
    Query(params): Query<BookSearchQuery>,
) -> impl IntoResponse {
    let query = params.q.as_deref().unwrap_or("").trim().to_string();
    if query.is_empty() {
        return (StatusCode::OK, Json(json!({ "books": [] }))).into_response();
    }
    match book_service::search_catalog(&state.db, &query).await {
        Ok(books) => (StatusCode::OK, Json(json!({ "books": books }))).into_response(),
        Err(e) => super::domain_error_response(e),
    }
}

/// Proxy an ISBN lookup to the external book API.
#[utoipa::path(
    get,
    path = "/api/lookup/{isbn}",
    params(("isbn" = String, Path, description = "ISBN, hyphens allowed")),
    responses(
        (status = 200, description = "Resolved metadata records"),
        (status = 404, description = "No provider has this ISBN")
    )
)]
pub async fn lookup_book(State(state): State<AppState>, Path(isbn): Path<String>) -> impl IntoResponse {
    match state.lookup.search(&LookupQuery::Isbn(isbn)).await {
        Ok(LookupOutcome::Found(items)) => {
            (StatusCode::OK, Json(json!({ "items": items }))).into_response()
        }
        Ok(LookupOutcome::NoResults) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Book not found" })),
        )
            .into_response(),
        Ok(LookupOutcome::TooManyResults) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Too many results. Please narrow your search." })),
        )
            .into_response(),
        Ok(LookupOutcome::ClientError { status, message }) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": message, "upstream_status": status })),
        )
            .into_response(),
        Err(e) => super::domain_error_response(e),
    }
}
