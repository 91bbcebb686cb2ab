use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::SoftDeleteScopes;

/// A user's like on a playlist. Soft delete is "unlike", restore is
/// "re-like"; at most one non-deleted row per `(playlist_id, user_id)`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "likes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String, // UUID
    pub playlist_id: String,
    pub user_id: String,
    pub message: Option<String>,
    pub date_notified: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::playlist::Entity",
        from = "Column::PlaylistId",
        to = "super::playlist::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Playlist,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::playlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Playlist.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl SoftDeleteScopes for Entity {
    fn deleted_at_column() -> Column {
        Column::DeletedAt
    }
}

impl Model {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
