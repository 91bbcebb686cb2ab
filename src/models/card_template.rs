use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::SoftDeleteScopes;

/// Open Graph card layout. `book_numbers` is a JSON array of the book
/// counts the layout has a variant for, e.g. `[1,2,4,6]`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "card_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String, // UUID
    pub name: String,
    pub slug: String,
    pub book_numbers: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::theme::Entity")]
    Themes,
}

impl Related<super::theme::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Themes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl SoftDeleteScopes for Entity {
    fn deleted_at_column() -> Column {
        Column::DeletedAt
    }
}

impl Model {
    pub fn supported_counts(&self) -> Vec<u32> {
        serde_json::from_str(&self.book_numbers).unwrap_or_default()
    }
}
