//! Playlist catalog search
//!
//! Two-pass ranking: exact matches (case-insensitive equality on any
//! searchable field) come before substring matches, merged without
//! duplicates. Searchable fields are the playlist's title and
//! description plus the title/author/publisher of every book on it.

use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, DatabaseConnection, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};

use crate::domain::{DomainError, SoftDeleteScopes};
use crate::models::{playlist, playlist_book, theme};
use crate::services::book_service;

/// Split on whitespace (the full-width space U+3000 included), drop
/// empty tokens, de-duplicate preserving first occurrence.
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in raw.split(|c: char| c.is_whitespace() || c == '\u{3000}') {
        if !token.is_empty() && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// Search publicly visible playlists. `theme_slug` is an independent
/// equality condition ANDed with the text match. Without a query the
/// visible set is returned newest first.
pub async fn search_playlists(
    db: &DatabaseConnection,
    raw_query: Option<&str>,
    theme_slug: Option<&str>,
) -> Result<Vec<playlist::Model>, DomainError> {
    let mut select = playlist::Entity::visible().order_by_desc(playlist::Column::CreatedAt);
    if let Some(slug) = theme_slug
        && !slug.is_empty()
    {
        select = select
            .join(JoinType::InnerJoin, playlist::Relation::Theme.def())
            .filter(theme::Column::Slug.eq(slug))
            .filter(theme::Column::DeletedAt.is_null());
    }
    let candidates = select.all(db).await?;

    let tokens = match raw_query {
        Some(raw) => tokenize(raw),
        None => Vec::new(),
    };
    if tokens.is_empty() {
        return Ok(candidates);
    }

    let haystacks = searchable_fields(db, &candidates).await?;

    let mut exact: Vec<&playlist::Model> = Vec::new();
    let mut partial: Vec<&playlist::Model> = Vec::new();
    for candidate in &candidates {
        let Some(fields) = haystacks.get(&candidate.id) else {
            continue;
        };
        if matches_any(fields, &tokens, |field, token| field == token) {
            exact.push(candidate);
        }
        if matches_any(fields, &tokens, |field, token| field.contains(token)) {
            partial.push(candidate);
        }
    }

    // Exact hits first, then substring hits, first occurrence wins.
    let mut merged: Vec<playlist::Model> = Vec::new();
    for candidate in exact.into_iter().chain(partial) {
        if !merged.iter().any(|p| p.id == candidate.id) {
            merged.push(candidate.clone());
        }
    }
    Ok(merged)
}

fn matches_any(
    fields: &[String],
    tokens: &[String],
    predicate: impl Fn(&str, &str) -> bool,
) -> bool {
    tokens.iter().any(|token| {
        let token = token.to_lowercase();
        fields.iter().any(|field| predicate(field, &token))
    })
}

/// Lower-cased searchable text per candidate playlist, fetched in bulk.
async fn searchable_fields(
    db: &DatabaseConnection,
    candidates: &[playlist::Model],
) -> Result<HashMap<String, Vec<String>>, DomainError> {
    let ids: Vec<String> = candidates.iter().map(|p| p.id.clone()).collect();
    let entries = if ids.is_empty() {
        Vec::new()
    } else {
        playlist_book::Entity::active()
            .filter(playlist_book::Column::PlaylistId.is_in(ids))
            .all(db)
            .await?
    };

    let isbns: Vec<String> = entries.iter().map(|e| e.book_isbn.clone()).collect();
    let views = book_service::book_views_for_isbns(db, &isbns).await?;

    let mut fields: HashMap<String, Vec<String>> = HashMap::new();
    for candidate in candidates {
        fields.insert(
            candidate.id.clone(),
            vec![
                candidate.title.to_lowercase(),
                candidate.description.to_lowercase(),
            ],
        );
    }
    for entry in entries {
        let Some(bucket) = fields.get_mut(&entry.playlist_id) else {
            continue;
        };
        if let Some(view) = views.get(&entry.book_isbn) {
            for value in [&view.title, &view.author, &view.publisher] {
                if let Some(value) = value {
                    bucket.push(value.to_lowercase());
                }
            }
        }
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_half_and_full_width_spaces() {
        assert_eq!(tokenize("恋愛 本"), vec!["恋愛", "本"]);
        assert_eq!(tokenize("恋愛\u{3000}本"), vec!["恋愛", "本"]);
        assert_eq!(tokenize("  a \u{3000} b  "), vec!["a", "b"]);
    }

    #[test]
    fn tokenize_deduplicates_preserving_order() {
        assert_eq!(tokenize("b a b a"), vec!["b", "a"]);
        assert!(tokenize(" \u{3000} ").is_empty());
    }
}
