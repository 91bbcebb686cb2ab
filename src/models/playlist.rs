use sea_orm::entity::prelude::*;
use sea_orm::{JoinType, QueryFilter, QuerySelect, Select};
use serde::{Deserialize, Serialize};

use crate::domain::SoftDeleteScopes;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "playlists")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String, // UUID
    pub user_id: String,
    pub theme_id: String,
    pub title: String,
    pub description: String,
    pub og_image: Option<String>,
    pub sequence: Option<i32>,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::theme::Entity",
        from = "Column::ThemeId",
        to = "super::theme::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Theme,
    #[sea_orm(has_many = "super::playlist_book::Entity")]
    PlaylistBooks,
    #[sea_orm(has_many = "super::like::Entity")]
    Likes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::theme::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Theme.def()
    }
}

impl Related<super::playlist_book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlaylistBooks.def()
    }
}

impl Related<super::like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl SoftDeleteScopes for Entity {
    fn deleted_at_column() -> Column {
        Column::DeletedAt
    }
}

impl Entity {
    /// Publicly visible playlists: published, not deleted, and owned by
    /// an active, non-deleted user.
    pub fn visible() -> Select<Entity> {
        Self::active()
            .filter(Column::IsPublished.eq(true))
            .join(JoinType::InnerJoin, Relation::User.def())
            .filter(super::user::Column::IsActive.eq(true))
            .filter(super::user::Column::DeletedAt.is_null())
    }

}
