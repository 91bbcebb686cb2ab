//! Book catalog operations shared by the draft workflow, the search
//! screens and the Open Graph pipeline.

use std::collections::{HashMap, HashSet};

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::domain::{DomainError, SoftDeleteScopes};
use crate::models::{BookView, book, book_data, playlist_book, provider};
use crate::services::draft::PendingBook;
use crate::services::search;

/// Resolve the default metadata view for each ISBN. Data rows are
/// scanned in provider priority order, unknown providers last.
pub async fn book_views_for_isbns(
    db: &DatabaseConnection,
    isbns: &[String],
) -> Result<HashMap<String, BookView>, DomainError> {
    if isbns.is_empty() {
        return Ok(HashMap::new());
    }

    let books = book::Entity::active()
        .filter(book::Column::Isbn.is_in(isbns.to_vec()))
        .all(db)
        .await?;
    let data = book_data::Entity::active()
        .filter(book_data::Column::BookIsbn.is_in(isbns.to_vec()))
        .all(db)
        .await?;
    let priorities: HashMap<String, i32> = provider::Entity::active()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.priority))
        .collect();

    let mut grouped: HashMap<String, Vec<book_data::Model>> = HashMap::new();
    for row in data {
        grouped.entry(row.book_isbn.clone()).or_default().push(row);
    }
    for rows in grouped.values_mut() {
        rows.sort_by_key(|d| priorities.get(&d.provider_id).copied().unwrap_or(i32::MAX));
    }

    Ok(books
        .into_iter()
        .map(|b| {
            let rows = grouped.get(&b.isbn).map(Vec::as_slice).unwrap_or(&[]);
            (b.isbn.clone(), BookView::from_rows(&b, rows))
        })
        .collect())
}

/// Free-text search over the local catalog for the draft picker.
/// Matches title or author on any token; books appearing in more
/// playlists rank first.
pub async fn search_catalog(
    db: &DatabaseConnection,
    raw_query: &str,
) -> Result<Vec<BookView>, DomainError> {
    let tokens = search::tokenize(raw_query);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut condition = Condition::any();
    for token in &tokens {
        condition = condition
            .add(book_data::Column::Title.contains(token))
            .add(book_data::Column::Author.contains(token));
    }
    let matches = book_data::Entity::active().filter(condition).all(db).await?;

    let mut isbns: Vec<String> = Vec::new();
    for row in matches {
        if !isbns.contains(&row.book_isbn) {
            isbns.push(row.book_isbn);
        }
    }
    if isbns.is_empty() {
        return Ok(Vec::new());
    }

    let views = book_views_for_isbns(db, &isbns).await?;

    let appearances = playlist_book::Entity::active()
        .filter(playlist_book::Column::BookIsbn.is_in(isbns.clone()))
        .all(db)
        .await?;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in appearances {
        *counts.entry(row.book_isbn).or_insert(0) += 1;
    }

    let mut results: Vec<BookView> = isbns
        .into_iter()
        .filter_map(|isbn| views.get(&isbn).cloned())
        .collect();
    results.sort_by(|a, b| {
        let ca = counts.get(&a.isbn).copied().unwrap_or(0);
        let cb = counts.get(&b.isbn).copied().unwrap_or(0);
        cb.cmp(&ca).then_with(|| a.isbn.cmp(&b.isbn))
    });
    Ok(results)
}

/// Insert book rows for any pending ISBN not yet in the catalog,
/// ignoring conflicts. Zero-result lookups still end up here as bare
/// stubs so the reference is never dropped.
pub async fn ensure_books(db: &DatabaseConnection, isbns: &[String]) -> Result<(), DomainError> {
    let mut wanted: Vec<String> = Vec::new();
    for isbn in isbns {
        if !isbn.is_empty() && !wanted.contains(isbn) {
            wanted.push(isbn.clone());
        }
    }
    if wanted.is_empty() {
        return Ok(());
    }

    let existing: HashSet<String> = book::Entity::all_including_deleted()
        .filter(book::Column::Isbn.is_in(wanted.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|b| b.isbn)
        .collect();

    let now = chrono::Utc::now().to_rfc3339();
    let missing: Vec<book::ActiveModel> = wanted
        .into_iter()
        .filter(|isbn| !existing.contains(isbn))
        .map(|isbn| book::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            isbn: Set(isbn),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            deleted_at: Set(None),
        })
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    match book::Entity::insert_many(missing)
        .on_conflict(
            OnConflict::column(book::Column::Isbn)
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await
    {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Insert book_data rows for any `(isbn, provider)` pair not yet
/// present, ignoring conflicts. Pending books without a provider (bare
/// stubs) carry no metadata to store.
pub async fn ensure_book_data(
    db: &DatabaseConnection,
    pending: &[PendingBook],
) -> Result<(), DomainError> {
    let isbns: Vec<String> = pending.iter().map(|p| p.isbn.clone()).collect();
    if isbns.is_empty() {
        return Ok(());
    }

    let existing: HashSet<(String, String)> = book_data::Entity::all_including_deleted()
        .filter(book_data::Column::BookIsbn.is_in(isbns))
        .all(db)
        .await?
        .into_iter()
        .map(|d| (d.book_isbn, d.provider_id))
        .collect();

    let now = chrono::Utc::now().to_rfc3339();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut missing: Vec<book_data::ActiveModel> = Vec::new();
    for book in pending {
        let Some(provider_id) = &book.provider_id else {
            continue;
        };
        let pair = (book.isbn.clone(), provider_id.clone());
        if existing.contains(&pair) || !seen.insert(pair) {
            continue;
        }
        missing.push(book_data::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            book_isbn: Set(book.isbn.clone()),
            provider_id: Set(provider_id.clone()),
            title: Set(book.title.clone()),
            author: Set(book.author.clone()),
            publisher: Set(book.publisher.clone()),
            cover: Set(book.cover.clone()),
            affiliate_url: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            deleted_at: Set(None),
        });
    }
    if missing.is_empty() {
        return Ok(());
    }

    match book_data::Entity::insert_many(missing)
        .on_conflict(
            OnConflict::columns([book_data::Column::BookIsbn, book_data::Column::ProviderId])
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await
    {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
