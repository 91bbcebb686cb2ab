//! Like/unlike toggle
//!
//! Reconciles the client's optimistic view against server truth. Only
//! a client that agrees with the server gets its toggle applied; a
//! stale client is answered with the true state and nothing changes.
//! Keep the asymmetry: collapsing it to always-apply breaks idempotence
//! under double submission.

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DomainError, SoftDeleteScopes};
use crate::models::{like, playlist};

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub is_liked: bool,
    pub like_count: i64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ToggleResult {
    pub is_liked: bool,
    pub like_count: i64,
}

/// Apply one toggle. `user_id` is `None` for guests, whose requested
/// state is echoed back without touching the database.
pub async fn toggle(
    db: &DatabaseConnection,
    playlist_id: &str,
    user_id: Option<&str>,
    request: ToggleRequest,
) -> Result<ToggleResult, DomainError> {
    playlist::Entity::visible()
        .filter(playlist::Column::Id.eq(playlist_id))
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let Some(user_id) = user_id else {
        return Ok(ToggleResult {
            is_liked: !request.is_liked,
            like_count: request.like_count + if request.is_liked { -1 } else { 1 },
        });
    };

    let existing = like::Entity::all_including_deleted()
        .filter(like::Column::PlaylistId.eq(playlist_id))
        .filter(like::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    let currently_liked = existing.as_ref().is_some_and(like::Model::is_active);

    if request.is_liked != currently_liked {
        // Stale client: report truth, mutate nothing.
        return Ok(ToggleResult {
            is_liked: currently_liked,
            like_count: request.like_count,
        });
    }

    let now = chrono::Utc::now().to_rfc3339();
    match existing {
        None => {
            let row = like::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                playlist_id: Set(playlist_id.to_string()),
                user_id: Set(user_id.to_string()),
                message: Set(None),
                date_notified: Set(None),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                deleted_at: Set(None),
            };
            row.insert(db).await?;
            Ok(ToggleResult {
                is_liked: true,
                like_count: request.like_count + 1,
            })
        }
        Some(row) if !row.is_active() => {
            let mut active: like::ActiveModel = row.into();
            active.deleted_at = Set(None);
            active.updated_at = Set(now);
            active.update(db).await?;
            Ok(ToggleResult {
                is_liked: true,
                like_count: request.like_count + 1,
            })
        }
        Some(row) => {
            let mut active: like::ActiveModel = row.into();
            active.deleted_at = Set(Some(now.clone()));
            active.updated_at = Set(now);
            active.update(db).await?;
            Ok(ToggleResult {
                is_liked: false,
                like_count: request.like_count - 1,
            })
        }
    }
}

/// Active like count for a playlist.
pub async fn count_for_playlist(
    db: &DatabaseConnection,
    playlist_id: &str,
) -> Result<u64, DomainError> {
    use sea_orm::PaginatorTrait;
    let count = like::Entity::active()
        .filter(like::Column::PlaylistId.eq(playlist_id))
        .count(db)
        .await?;
    Ok(count)
}
