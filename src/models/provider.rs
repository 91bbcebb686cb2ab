use sea_orm::entity::prelude::*;
use sea_orm::{QueryFilter, QueryOrder, Select};
use serde::{Deserialize, Serialize};

use crate::domain::SoftDeleteScopes;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "providers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String, // UUID
    pub name: String,
    pub slug: String,
    pub endpoint: String,
    pub priority: i32,
    pub description: Option<String>,
    pub is_available: bool,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::book_data::Entity")]
    BookData,
}

impl Related<super::book_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl SoftDeleteScopes for Entity {
    fn deleted_at_column() -> Column {
        Column::DeletedAt
    }
}

impl Entity {
    /// Providers book lookups may actually hit, best first.
    pub fn available() -> Select<Entity> {
        Self::active()
            .filter(Column::IsAvailable.eq(true))
            .order_by_asc(Column::Priority)
    }
}
