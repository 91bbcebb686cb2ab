//! Soft-delete query scopes
//!
//! Every soft-deletable table carries a nullable `deleted_at` column.
//! Entities implement this trait once and get the three query scopes,
//! all derived from the same predicate, instead of per-entity manager
//! hierarchies.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Select};

pub trait SoftDeleteScopes: EntityTrait {
    fn deleted_at_column() -> Self::Column;

    /// Rows that have not been soft-deleted. The default scope.
    fn active() -> Select<Self> {
        Self::find().filter(Self::deleted_at_column().is_null())
    }

    /// Every row, soft-deleted ones included.
    fn all_including_deleted() -> Select<Self> {
        Self::find()
    }

    /// Only soft-deleted rows.
    fn deleted_only() -> Select<Self> {
        Self::find().filter(Self::deleted_at_column().is_not_null())
    }
}
