//! Draft workflow endpoints
//!
//! The authoring loop spans several requests: Draft screen → book
//! search → pick → back to Draft, then submit. Redirect envelopes
//! carry the client between those states; warnings ride along instead
//! of error pages.

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use sea_orm::{ColumnTrait, QueryFilter};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{Claims, SessionId};
use crate::domain::{DomainError, SoftDeleteScopes};
use crate::lookup::{LookupOutcome, LookupQuery};
use crate::models::playlist;
use crate::services::book_service;
use crate::services::draft::{
    AddBookOutcome, DraftEntry, DraftForm, DraftKey, DraftMode, PendingBook,
};
use crate::services::playlist_service::{self, CommitError, OgImageContext};
use crate::state::AppState;

const MSG_SESSION_TIMEOUT: &str = "Session timeout. Please retry from the beginning.";
const MSG_OWNER_ONLY: &str = "Only the owner can edit this playlist.";

fn draft_url(mode: DraftMode, playlist_id: Option<&str>, resume: bool) -> String {
    let mut url = match mode {
        DraftMode::Create => "/api/playlists/draft?mode=create".to_string(),
        DraftMode::Update => format!(
            "/api/playlists/draft?mode=update&playlist_id={}",
            playlist_id.unwrap_or_default()
        ),
    };
    if resume {
        url.push_str("&continue=true");
    }
    url
}

fn search_url(mode: DraftMode, playlist_id: Option<&str>) -> String {
    match mode {
        DraftMode::Create => "/api/playlists/draft/books?mode=create".to_string(),
        DraftMode::Update => format!(
            "/api/playlists/draft/books?mode=update&playlist_id={}",
            playlist_id.unwrap_or_default()
        ),
    }
}

fn detail_url(playlist_id: &str) -> String {
    format!("/api/playlists/{}", playlist_id)
}

/// Update mode is owner-gated on every transition. Non-owners are sent
/// to the public detail page with a warning, not a 403.
async fn load_update_target(
    state: &AppState,
    playlist_id: Option<&str>,
    claims: &Claims,
) -> Result<playlist::Model, Response> {
    let Some(playlist_id) = playlist_id else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "playlist_id is required in update mode" })),
        )
            .into_response());
    };
    let found = playlist::Entity::active()
        .filter(playlist::Column::Id.eq(playlist_id))
        .one(&state.db)
        .await
        .map_err(|e| super::domain_error_response(e.into()))?;
    let Some(target) = found else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Playlist not found" })),
        )
            .into_response());
    };
    if target.user_id != claims.sub {
        return Err(super::redirect_with_warning(
            detail_url(&target.id),
            MSG_OWNER_ONLY,
        ));
    }
    Ok(target)
}

#[derive(Deserialize)]
pub struct DraftParams {
    pub mode: DraftMode,
    pub playlist_id: Option<String>,
    #[serde(rename = "continue", default)]
    pub resume: bool,
}

/// The Draft screen. Without the continue marker the two pending
/// values are reset; with it they are preserved as-is.
pub async fn get_draft(
    State(state): State<AppState>,
    claims: Claims,
    SessionId(session_id): SessionId,
    Query(params): Query<DraftParams>,
) -> Response {
    let playlist_id = match params.mode {
        DraftMode::Create => None,
        DraftMode::Update => {
            match load_update_target(&state, params.playlist_id.as_deref(), &claims).await {
                Ok(target) => Some(target),
                Err(response) => return response,
            }
        }
    };

    let key = DraftKey {
        session_id,
        mode: params.mode,
        playlist_id: playlist_id.as_ref().map(|p| p.id.clone()),
    };

    let draft = if params.resume {
        match state.drafts.resume(&key) {
            Ok(draft) => draft,
            Err(_) => {
                return super::redirect_with_warning(
                    draft_url(params.mode, key.playlist_id.as_deref(), false),
                    MSG_SESSION_TIMEOUT,
                );
            }
        }
    } else {
        match playlist_id {
            None => state.drafts.start(key.clone(), None, Vec::new()),
            Some(target) => {
                match playlist_service::initial_draft_for_update(&state.db, &target).await {
                    Ok((form, books)) => state.drafts.start(key.clone(), Some(form), books),
                    Err(e) => return super::domain_error_response(e),
                }
            }
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "mode": params.mode,
            "playlist_id": key.playlist_id,
            "draft": draft,
        })),
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct BookSearchParams {
    pub mode: DraftMode,
    pub playlist_id: Option<String>,
    pub q: Option<String>,
    /// Comma-separated: "local", "external".
    pub sources: Option<String>,
}

/// The book-search screen of the workflow.
pub async fn search_books(
    State(state): State<AppState>,
    claims: Claims,
    SessionId(session_id): SessionId,
    Query(params): Query<BookSearchParams>,
) -> Response {
    if params.mode == DraftMode::Update
        && let Err(response) =
            load_update_target(&state, params.playlist_id.as_deref(), &claims).await
    {
        return response;
    }

    let key = DraftKey {
        session_id,
        mode: params.mode,
        playlist_id: params.playlist_id.clone(),
    };
    let books_in_session: Vec<String> = state
        .drafts
        .get(&key)
        .map(|d| d.books.iter().map(|b| b.isbn.clone()).collect())
        .unwrap_or_default();

    let query = params.q.as_deref().unwrap_or("").trim().to_string();
    let sources = params.sources.as_deref().unwrap_or("local");
    let source_list: Vec<&str> = sources.split(',').map(|s| s.trim()).collect();

    let mut local = Vec::new();
    let mut external = Vec::new();
    let mut warning: Option<String> = None;

    if !query.is_empty() && source_list.contains(&"local") {
        match book_service::search_catalog(&state.db, &query).await {
            Ok(found) => local = found,
            Err(e) => return super::domain_error_response(e),
        }
    }

    if !query.is_empty() && source_list.contains(&"external") {
        let lookup_query = LookupQuery::Title {
            query: query.clone(),
            page: None,
            sort: None,
        };
        match state.lookup.search(&lookup_query).await {
            Ok(LookupOutcome::Found(items)) => {
                external = items
                    .into_iter()
                    .map(|item| PendingBook {
                        isbn: item.isbn,
                        provider_id: state.default_provider_id.clone(),
                        title: Some(crate::lookup::format_title(&[
                            &item.title,
                            item.subtitle.as_deref().unwrap_or(""),
                        ])),
                        author: item.author,
                        publisher: item.publisher,
                        cover: item.cover,
                    })
                    .collect();
            }
            Ok(LookupOutcome::NoResults) => {}
            Ok(LookupOutcome::TooManyResults) => {
                warning = Some("Too many results. Please narrow your search.".to_string());
            }
            Ok(LookupOutcome::ClientError { .. }) => {
                warning = Some("Your search query may be too short.".to_string());
            }
            Err(e) => {
                tracing::warn!("External book search failed: {}", e);
                warning = Some("Book search is temporarily unavailable.".to_string());
            }
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "query": query,
            "books": local,
            "external": external,
            "books_in_session": books_in_session,
            "warning": warning,
        })),
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct PickRequest {
    pub mode: DraftMode,
    pub playlist_id: Option<String>,
    pub book: PendingBook,
}

/// Pick a search result into the pending list, then bounce back to the
/// Draft screen with the continue marker set.
pub async fn pick_book(
    State(state): State<AppState>,
    claims: Claims,
    SessionId(session_id): SessionId,
    Json(payload): Json<PickRequest>,
) -> Response {
    if payload.mode == DraftMode::Update
        && let Err(response) =
            load_update_target(&state, payload.playlist_id.as_deref(), &claims).await
    {
        return response;
    }

    let key = DraftKey {
        session_id,
        mode: payload.mode,
        playlist_id: payload.playlist_id.clone(),
    };

    match state.drafts.add_book(&key, payload.book) {
        Ok(outcome) => {
            let url = draft_url(payload.mode, key.playlist_id.as_deref(), true);
            (
                StatusCode::SEE_OTHER,
                [(header::LOCATION, url.clone())],
                Json(json!({
                    "redirect": url,
                    "added": outcome == AddBookOutcome::Added,
                })),
            )
                .into_response()
        }
        Err(DomainError::SessionExpired) => super::redirect_with_warning(
            draft_url(payload.mode, key.playlist_id.as_deref(), false),
            MSG_SESSION_TIMEOUT,
        ),
        Err(e) => super::domain_error_response(e),
    }
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub mode: DraftMode,
    pub playlist_id: Option<String>,
    /// Present when the author wants another book instead of
    /// committing: stash the form and detour to the search screen.
    #[serde(default)]
    pub add_book: bool,
    pub title: Option<String>,
    pub theme_id: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub books: Vec<DraftEntry>,
}

pub async fn submit(
    State(state): State<AppState>,
    claims: Claims,
    SessionId(session_id): SessionId,
    Json(payload): Json<SubmitRequest>,
) -> Response {
    if payload.mode == DraftMode::Update
        && let Err(response) =
            load_update_target(&state, payload.playlist_id.as_deref(), &claims).await
    {
        return response;
    }

    let key = DraftKey {
        session_id,
        mode: payload.mode,
        playlist_id: payload.playlist_id.clone(),
    };
    let form = DraftForm {
        title: payload.title,
        theme_id: payload.theme_id,
        description: payload.description,
        entries: payload.books,
    };

    if payload.add_book {
        return match state.drafts.stash_form(&key, form) {
            Ok(_) => {
                state.drafts.mark_searching(&key);
                let url = search_url(payload.mode, key.playlist_id.as_deref());
                (
                    StatusCode::SEE_OTHER,
                    [(header::LOCATION, url.clone())],
                    Json(json!({ "redirect": url })),
                )
                    .into_response()
            }
            Err(_) => super::redirect_with_warning(
                draft_url(payload.mode, key.playlist_id.as_deref(), false),
                MSG_SESSION_TIMEOUT,
            ),
        };
    }

    let og = OgImageContext {
        rasterizer: state.rasterizer.as_ref(),
        storage: &state.storage,
        width: state.config.og_image_width,
        height: state.config.og_image_height,
    };
    match playlist_service::commit(&state.db, &state.drafts, &key, form, &claims.sub, &og).await {
        Ok(committed) => {
            let status = match payload.mode {
                DraftMode::Create => StatusCode::CREATED,
                DraftMode::Update => StatusCode::OK,
            };
            let message = match payload.mode {
                DraftMode::Create => "Playlist created successfully.",
                DraftMode::Update => "Playlist updated successfully.",
            };
            (
                status,
                Json(json!({
                    "message": message,
                    "playlist": committed,
                    "redirect": detail_url(&committed.id),
                })),
            )
                .into_response()
        }
        Err(CommitError::NoBooks) => super::redirect_with_warning(
            draft_url(payload.mode, key.playlist_id.as_deref(), true),
            playlist_service::MSG_AT_LEAST_ONE_BOOK,
        ),
        Err(CommitError::Invalid(errors)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": errors })),
        )
            .into_response(),
        Err(CommitError::SessionExpired) => super::redirect_with_warning(
            draft_url(payload.mode, key.playlist_id.as_deref(), false),
            MSG_SESSION_TIMEOUT,
        ),
        Err(CommitError::Domain(e)) => super::domain_error_response(e),
    }
}
