use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::SoftDeleteScopes;

/// Slug of the catch-all theme assigned when the author picks none.
pub const SLUG_NO_THEME: &str = "no-theme";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "themes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String, // UUID
    pub template_id: String,
    pub name: String,
    pub slug: Option<String>,
    pub sequence: Option<i32>,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::card_template::Entity",
        from = "Column::TemplateId",
        to = "super::card_template::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Template,
    #[sea_orm(has_many = "super::playlist::Entity")]
    Playlists,
    #[sea_orm(has_many = "super::recommendation::Entity")]
    Recommendations,
}

impl Related<super::card_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl Related<super::playlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Playlists.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl SoftDeleteScopes for Entity {
    fn deleted_at_column() -> Column {
        Column::DeletedAt
    }
}

impl Model {
    /// Themes render as hashtags everywhere except the catch-all one.
    pub fn tagged_name(&self) -> String {
        if self.slug.as_deref() == Some(SLUG_NO_THEME) {
            self.name.clone()
        } else {
            format!("#{}", self.name)
        }
    }
}
