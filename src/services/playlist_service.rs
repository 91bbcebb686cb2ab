//! Playlist assembly and lifecycle
//!
//! The commit path runs in a fixed order: catalog rows for the pending
//! ISBNs, then their metadata rows, then the playlist and its book
//! rows in one transaction, then the Open Graph card. Each step runs
//! only if the previous one succeeded.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{DomainError, SoftDeleteScopes};
use crate::models::{
    BookView, like, playlist, playlist_book, recommendation, theme, user,
};
use crate::og_image::{self, HtmlRasterizer};
use crate::services::book_service;
use crate::services::draft::{
    DraftForm, DraftKey, DraftMode, DraftStore, PendingBook, PlaylistDraft,
};
use crate::services::like_service;
use crate::storage::Storage;

pub const MSG_AT_LEAST_ONE_BOOK: &str = "You have to add at least one book to your playlist.";

/// Rendering collaborators the commit path needs for the card.
pub struct OgImageContext<'a> {
    pub rasterizer: &'a dyn HtmlRasterizer,
    pub storage: &'a Storage,
    pub width: u32,
    pub height: u32,
}

/// Commit failures that put the workflow back into a prior state
/// instead of dead-ending.
#[derive(Debug)]
pub enum CommitError {
    /// Zero live book entries; the draft is preserved.
    NoBooks,
    /// Field or entry validation failed; the draft is preserved.
    Invalid(Vec<String>),
    /// The draft vanished (restart from the beginning).
    SessionExpired,
    Domain(DomainError),
}

impl From<DomainError> for CommitError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::SessionExpired => CommitError::SessionExpired,
            other => CommitError::Domain(other),
        }
    }
}

impl From<sea_orm::DbErr> for CommitError {
    fn from(e: sea_orm::DbErr) -> Self {
        CommitError::Domain(e.into())
    }
}

/// Build the update-mode initial draft: the playlist's current field
/// values and its current book references with resolved metadata.
pub async fn initial_draft_for_update(
    db: &DatabaseConnection,
    target: &playlist::Model,
) -> Result<(DraftForm, Vec<PendingBook>), DomainError> {
    let entries = playlist_book::Entity::active()
        .filter(playlist_book::Column::PlaylistId.eq(&target.id))
        .order_by_asc(playlist_book::Column::CreatedAt)
        .all(db)
        .await?;
    let isbns: Vec<String> = entries.iter().map(|e| e.book_isbn.clone()).collect();
    let views = book_service::book_views_for_isbns(db, &isbns).await?;

    let books = entries
        .iter()
        .map(|e| match views.get(&e.book_isbn) {
            Some(view) => PendingBook {
                isbn: view.isbn.clone(),
                provider_id: view.provider_id.clone(),
                title: view.title.clone(),
                author: view.author.clone(),
                publisher: view.publisher.clone(),
                cover: view.cover.clone(),
            },
            None => PendingBook {
                isbn: e.book_isbn.clone(),
                provider_id: None,
                title: None,
                author: None,
                publisher: None,
                cover: None,
            },
        })
        .collect();

    let form = DraftForm {
        title: Some(target.title.clone()),
        theme_id: Some(target.theme_id.clone()),
        description: Some(target.description.clone()),
        entries: entries
            .iter()
            .map(|e| crate::services::draft::DraftEntry {
                isbn: e.book_isbn.clone(),
                description: e.description.clone(),
                delete: false,
            })
            .collect(),
    };
    Ok((form, books))
}

/// Commit the draft as one unit. On success the committed playlist is
/// returned and the draft is gone.
pub async fn commit(
    db: &DatabaseConnection,
    drafts: &DraftStore,
    key: &DraftKey,
    form: DraftForm,
    user_id: &str,
    og: &OgImageContext<'_>,
) -> Result<playlist::Model, CommitError> {
    let draft: PlaylistDraft = drafts.resume(key)?;

    // Catalog rows first, metadata rows second; conflicts ignored.
    let isbns: Vec<String> = draft.books.iter().map(|b| b.isbn.clone()).collect();
    book_service::ensure_books(db, &isbns).await?;
    book_service::ensure_book_data(db, &draft.books).await?;

    let live_entries: Vec<_> = form.entries.iter().filter(|e| !e.delete).collect();
    if live_entries.is_empty() {
        // The author's other inputs survive the round-trip.
        drafts.stash_form(key, form.clone())?;
        return Err(CommitError::NoBooks);
    }

    let mut errors = Vec::new();
    let title = form.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        errors.push("Title is required.".to_string());
    }
    let description = form
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if description.is_empty() {
        errors.push("Description is required.".to_string());
    }
    let theme_id = form.theme_id.as_deref().unwrap_or_default();
    let theme_row = if theme_id.is_empty() {
        None
    } else {
        theme::Entity::active()
            .filter(theme::Column::Id.eq(theme_id))
            .one(db)
            .await
            .map_err(DomainError::from)?
    };
    if theme_row.is_none() {
        errors.push("Theme is required.".to_string());
    }
    for entry in &live_entries {
        if !draft.books.iter().any(|b| b.isbn == entry.isbn) {
            errors.push(format!("Unknown book in playlist: {}", entry.isbn));
        }
    }
    if !errors.is_empty() {
        drafts.stash_form(key, form.clone())?;
        return Err(CommitError::Invalid(errors));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let txn = db.begin().await?;

    let committed = match key.mode {
        DraftMode::Create => {
            let row = playlist::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                user_id: Set(user_id.to_string()),
                theme_id: Set(theme_id.to_string()),
                title: Set(title.to_string()),
                description: Set(description.to_string()),
                og_image: Set(None),
                sequence: Set(None),
                is_published: Set(true),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                deleted_at: Set(None),
            };
            let committed = row.insert(&txn).await?;
            for entry in &live_entries {
                let row = playlist_book::ActiveModel {
                    id: Set(Uuid::new_v4().to_string()),
                    playlist_id: Set(committed.id.clone()),
                    book_isbn: Set(entry.isbn.clone()),
                    description: Set(entry.description.clone()),
                    created_at: Set(now.clone()),
                    updated_at: Set(now.clone()),
                    deleted_at: Set(None),
                };
                row.insert(&txn).await?;
            }
            committed
        }
        DraftMode::Update => {
            let playlist_id = key
                .playlist_id
                .as_deref()
                .ok_or(CommitError::SessionExpired)?;
            let target = playlist::Entity::active()
                .filter(playlist::Column::Id.eq(playlist_id))
                .one(&txn)
                .await?
                .ok_or(CommitError::Domain(DomainError::NotFound))?;

            let existing = playlist_book::Entity::active()
                .filter(playlist_book::Column::PlaylistId.eq(playlist_id))
                .all(&txn)
                .await?;

            for entry in &form.entries {
                let current = existing.iter().find(|e| e.book_isbn == entry.isbn);
                match (entry.delete, current) {
                    (true, Some(row)) => {
                        let mut active: playlist_book::ActiveModel = row.clone().into();
                        active.deleted_at = Set(Some(now.clone()));
                        active.updated_at = Set(now.clone());
                        active.update(&txn).await?;
                    }
                    (false, Some(row)) => {
                        if row.description != entry.description {
                            let mut active: playlist_book::ActiveModel = row.clone().into();
                            active.description = Set(entry.description.clone());
                            active.updated_at = Set(now.clone());
                            active.update(&txn).await?;
                        }
                    }
                    (false, None) => {
                        let row = playlist_book::ActiveModel {
                            id: Set(Uuid::new_v4().to_string()),
                            playlist_id: Set(playlist_id.to_string()),
                            book_isbn: Set(entry.isbn.clone()),
                            description: Set(entry.description.clone()),
                            created_at: Set(now.clone()),
                            updated_at: Set(now.clone()),
                            deleted_at: Set(None),
                        };
                        row.insert(&txn).await?;
                    }
                    (true, None) => {}
                }
            }

            let mut active: playlist::ActiveModel = target.into();
            active.title = Set(title.to_string());
            active.theme_id = Set(theme_id.to_string());
            active.description = Set(description.to_string());
            active.updated_at = Set(now.clone());
            active.update(&txn).await?
        }
    };

    txn.commit().await?;

    // Card generation runs in the request path, after the data commit.
    og_image::generate_for_playlist(db, og.rasterizer, og.storage, og.width, og.height, &committed)
        .await?;

    drafts.clear(key);

    let committed = playlist::Entity::find_by_id(committed.id.clone())
        .one(db)
        .await
        .map_err(DomainError::from)?
        .ok_or(CommitError::Domain(DomainError::NotFound))?;
    tracing::info!(playlist_id = %committed.id, mode = ?key.mode, "Playlist committed");
    Ok(committed)
}

#[derive(Debug, Serialize)]
pub struct PlaylistBookDetail {
    #[serde(flatten)]
    pub book: BookView,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaylistDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub theme_id: String,
    pub theme_name: String,
    pub user_id: String,
    pub user_name: String,
    pub og_image: Option<String>,
    pub created_at: String,
    pub books: Vec<PlaylistBookDetail>,
    pub like_count: u64,
}

/// Resolve a playlist with its ordered books, owner, theme and like
/// count.
pub async fn detail(
    db: &DatabaseConnection,
    target: &playlist::Model,
) -> Result<PlaylistDetail, DomainError> {
    let theme = theme::Entity::find_by_id(target.theme_id.clone())
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;
    let owner = user::Entity::find_by_id(target.user_id.clone())
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let entries = playlist_book::Entity::active()
        .filter(playlist_book::Column::PlaylistId.eq(&target.id))
        .order_by_asc(playlist_book::Column::CreatedAt)
        .all(db)
        .await?;
    let isbns: Vec<String> = entries.iter().map(|e| e.book_isbn.clone()).collect();
    let views = book_service::book_views_for_isbns(db, &isbns).await?;

    let books = entries
        .into_iter()
        .filter_map(|e| {
            views.get(&e.book_isbn).map(|view| PlaylistBookDetail {
                book: view.clone(),
                description: e.description,
            })
        })
        .collect();

    Ok(PlaylistDetail {
        id: target.id.clone(),
        title: target.title.clone(),
        description: target.description.clone(),
        theme_id: theme.id.clone(),
        theme_name: theme.tagged_name(),
        user_id: owner.id.clone(),
        user_name: owner.display_name().to_string(),
        og_image: target.og_image.clone(),
        created_at: target.created_at.clone(),
        books,
        like_count: like_service::count_for_playlist(db, &target.id).await?,
    })
}

/// Soft-delete: the row stays recoverable, the card blob stays.
pub async fn soft_delete(
    db: &DatabaseConnection,
    target: playlist::Model,
) -> Result<(), DomainError> {
    let now = chrono::Utc::now().to_rfc3339();
    let mut active: playlist::ActiveModel = target.into();
    active.deleted_at = Set(Some(now.clone()));
    active.updated_at = Set(now);
    active.update(db).await?;
    Ok(())
}

/// Hard-delete: purge the card blob, then physically remove the
/// playlist and its dependent rows.
pub async fn hard_delete(
    db: &DatabaseConnection,
    storage: &Storage,
    target: playlist::Model,
) -> Result<(), DomainError> {
    if let Some(path) = &target.og_image {
        storage.delete(path).await?;
    }

    let txn = db.begin().await?;
    playlist_book::Entity::delete_many()
        .filter(playlist_book::Column::PlaylistId.eq(&target.id))
        .exec(&txn)
        .await?;
    like::Entity::delete_many()
        .filter(like::Column::PlaylistId.eq(&target.id))
        .exec(&txn)
        .await?;
    recommendation::Entity::delete_many()
        .filter(recommendation::Column::PlaylistId.eq(&target.id))
        .exec(&txn)
        .await?;
    playlist::Entity::delete_by_id(target.id.clone())
        .exec(&txn)
        .await?;
    txn.commit().await?;
    Ok(())
}
