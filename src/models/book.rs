use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::SoftDeleteScopes;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String, // UUID
    pub isbn: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::book_data::Entity")]
    BookData,
    #[sea_orm(has_many = "super::playlist_book::Entity")]
    PlaylistBooks,
}

impl Related<super::book_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookData.def()
    }
}

impl Related<super::playlist_book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlaylistBooks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl SoftDeleteScopes for Entity {
    fn deleted_at_column() -> Column {
        Column::DeletedAt
    }
}

/// A book with its metadata fields resolved across data rows.
///
/// Each field takes the first non-empty value scanning the book's data
/// rows in provider priority order, falling back to the first row. A
/// bare stub (no data rows yet) resolves every field to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookView {
    pub id: String,
    pub isbn: String,
    pub provider_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub cover: Option<String>,
    pub affiliate_url: Option<String>,
}

impl BookView {
    /// `data` must already be sorted by provider priority.
    pub fn from_rows(book: &Model, data: &[super::book_data::Model]) -> Self {
        Self {
            id: book.id.clone(),
            isbn: book.isbn.clone(),
            provider_id: data.first().map(|d| d.provider_id.clone()),
            title: resolve(data, |d| d.title.as_deref()),
            author: resolve(data, |d| d.author.as_deref()),
            publisher: resolve(data, |d| d.publisher.as_deref()),
            cover: resolve(data, |d| d.cover.as_deref()),
            affiliate_url: resolve(data, |d| d.affiliate_url.as_deref()),
        }
    }
}

fn resolve(
    data: &[super::book_data::Model],
    field: impl Fn(&super::book_data::Model) -> Option<&str>,
) -> Option<String> {
    data.iter()
        .find_map(|d| field(d).filter(|v| !v.is_empty()).map(str::to_owned))
        .or_else(|| data.first().and_then(|d| field(d).map(str::to_owned)))
}
