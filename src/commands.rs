//! Batch management commands, run via CLI flags on the binary.

use sea_orm::{ColumnTrait, Condition, QueryFilter};

use crate::domain::{DomainError, SoftDeleteScopes};
use crate::lookup::{LookupOutcome, LookupQuery};
use crate::models::{book, book_data, playlist};
use crate::og_image;
use crate::services::draft::PendingBook;
use crate::services::book_service;
use crate::state::AppState;

/// Generate Open Graph images for playlists lacking one, or for every
/// playlist with `force`.
pub async fn create_og_images(state: &AppState, force: bool) -> Result<(), DomainError> {
    let mut select = playlist::Entity::active();
    if !force {
        select = select.filter(
            Condition::any()
                .add(playlist::Column::OgImage.is_null())
                .add(playlist::Column::OgImage.eq("")),
        );
    }
    let targets = select.all(&state.db).await?;

    let n = targets.len();
    if n == 0 {
        tracing::info!("No data to create the image.");
        return Ok(());
    }
    for (i, target) in targets.iter().enumerate() {
        og_image::generate_for_playlist(
            &state.db,
            state.rasterizer.as_ref(),
            &state.storage,
            state.config.og_image_width,
            state.config.og_image_height,
            target,
        )
        .await?;
        tracing::info!("{}/{} Done. | title: {}", i + 1, n, target.title);
    }
    Ok(())
}

/// Fetch metadata for books that have no data row from the default
/// provider yet. Zero-result lookups are skipped; the bare stub row
/// keeps the reference alive.
pub async fn fetch_book_data(state: &AppState) -> Result<(), DomainError> {
    let provider_id = state
        .default_provider_id
        .clone()
        .ok_or_else(|| DomainError::Internal("No default provider configured".to_string()))?;

    let books = book::Entity::active().all(&state.db).await?;
    let n = books.len();
    let mut created = 0usize;

    for (i, target) in books.iter().enumerate() {
        let covered = book_data::Entity::active()
            .filter(book_data::Column::BookIsbn.eq(&target.isbn))
            .filter(book_data::Column::ProviderId.eq(&provider_id))
            .one(&state.db)
            .await?
            .is_some();
        if covered {
            continue;
        }

        match state
            .lookup
            .search(&LookupQuery::Isbn(target.isbn.clone()))
            .await
        {
            Ok(LookupOutcome::Found(items)) => {
                let pending: Vec<PendingBook> = items
                    .into_iter()
                    .map(|item| PendingBook {
                        isbn: target.isbn.clone(),
                        provider_id: Some(provider_id.clone()),
                        title: Some(crate::lookup::format_title(&[
                            &item.title,
                            item.subtitle.as_deref().unwrap_or(""),
                        ])),
                        author: item.author,
                        publisher: item.publisher,
                        cover: item.cover,
                    })
                    .take(1)
                    .collect();
                book_service::ensure_book_data(&state.db, &pending).await?;
                created += 1;
                tracing::info!("{}/{} created | isbn: {}", i + 1, n, target.isbn);
            }
            Ok(LookupOutcome::NoResults) => {
                tracing::info!("{}/{} no result | isbn: {}", i + 1, n, target.isbn);
            }
            Ok(other) => {
                tracing::warn!("{}/{} skipped ({:?}) | isbn: {}", i + 1, n, other, target.isbn);
            }
            Err(e) => {
                tracing::warn!("{}/{} failed ({}) | isbn: {}", i + 1, n, e, target.isbn);
            }
        }
    }

    tracing::info!("Done. processed: {}, created: {}", n, created);
    Ok(())
}
