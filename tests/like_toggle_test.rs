use booxmix::db;
use booxmix::domain::SoftDeleteScopes;
use booxmix::models::{like, playlist, theme, user};
use booxmix::services::like_service::{self, ToggleRequest};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, QueryFilter, Set};
use uuid::Uuid;

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_test_user(db: &DatabaseConnection, username: &str) -> user::Model {
    let now = chrono::Utc::now().to_rfc3339();
    let row = user::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        password_hash: Set("hash".to_string()),
        nickname: Set(None),
        is_active: Set(true),
        is_admin: Set(false),
        date_verified: Set(Some(now.clone())),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    row.insert(db).await.expect("Failed to create user")
}

async fn default_theme_id(db: &DatabaseConnection) -> String {
    theme::Entity::active()
        .filter(theme::Column::Slug.eq("no-theme"))
        .one(db)
        .await
        .expect("query failed")
        .expect("seeded theme missing")
        .id
}

async fn create_test_playlist(
    db: &DatabaseConnection,
    user_id: &str,
    title: &str,
) -> playlist::Model {
    let now = chrono::Utc::now().to_rfc3339();
    let row = playlist::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        theme_id: Set(default_theme_id(db).await),
        title: Set(title.to_string()),
        description: Set("description".to_string()),
        og_image: Set(None),
        sequence: Set(None),
        is_published: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    row.insert(db).await.expect("Failed to create playlist")
}

async fn like_rows(db: &DatabaseConnection, playlist_id: &str) -> Vec<like::Model> {
    like::Entity::all_including_deleted()
        .filter(like::Column::PlaylistId.eq(playlist_id))
        .all(db)
        .await
        .expect("query failed")
}

#[tokio::test]
async fn first_like_creates_a_row() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db, "owner").await;
    let reader = create_test_user(&db, "reader").await;
    let target = create_test_playlist(&db, &owner.id, "list").await;

    let result = like_service::toggle(
        &db,
        &target.id,
        Some(&reader.id),
        ToggleRequest {
            is_liked: false,
            like_count: 0,
        },
    )
    .await
    .expect("toggle failed");

    assert!(result.is_liked);
    assert_eq!(result.like_count, 1);
    let rows = like_rows(&db, &target.id).await;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].deleted_at.is_none());
}

#[tokio::test]
async fn like_unlike_like_reuses_one_row() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db, "owner").await;
    let reader = create_test_user(&db, "reader").await;
    let target = create_test_playlist(&db, &owner.id, "list").await;

    let first = like_service::toggle(
        &db,
        &target.id,
        Some(&reader.id),
        ToggleRequest {
            is_liked: false,
            like_count: 0,
        },
    )
    .await
    .unwrap();
    assert!(first.is_liked);

    let second = like_service::toggle(
        &db,
        &target.id,
        Some(&reader.id),
        ToggleRequest {
            is_liked: true,
            like_count: 1,
        },
    )
    .await
    .unwrap();
    assert!(!second.is_liked);
    assert_eq!(second.like_count, 0);

    let third = like_service::toggle(
        &db,
        &target.id,
        Some(&reader.id),
        ToggleRequest {
            is_liked: false,
            like_count: 0,
        },
    )
    .await
    .unwrap();
    assert!(third.is_liked);
    assert_eq!(third.like_count, 1);

    // Soft-deleted then restored, never duplicated.
    let rows = like_rows(&db, &target.id).await;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].deleted_at.is_none());
}

#[tokio::test]
async fn stale_client_gets_truth_and_no_mutation() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db, "owner").await;
    let reader = create_test_user(&db, "reader").await;
    let target = create_test_playlist(&db, &owner.id, "list").await;

    // Server truth: not liked. Client claims it already is (stale).
    let result = like_service::toggle(
        &db,
        &target.id,
        Some(&reader.id),
        ToggleRequest {
            is_liked: true,
            like_count: 7,
        },
    )
    .await
    .unwrap();

    assert!(!result.is_liked);
    assert_eq!(result.like_count, 7); // count untouched, no transition applied
    assert!(like_rows(&db, &target.id).await.is_empty());

    // Repeated identical stale requests stay no-ops.
    let again = like_service::toggle(
        &db,
        &target.id,
        Some(&reader.id),
        ToggleRequest {
            is_liked: true,
            like_count: 7,
        },
    )
    .await
    .unwrap();
    assert!(!again.is_liked);
    assert!(like_rows(&db, &target.id).await.is_empty());
}

#[tokio::test]
async fn guest_toggle_is_echoed_but_not_persisted() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db, "owner").await;
    let target = create_test_playlist(&db, &owner.id, "list").await;

    let result = like_service::toggle(
        &db,
        &target.id,
        None,
        ToggleRequest {
            is_liked: false,
            like_count: 3,
        },
    )
    .await
    .unwrap();
    assert!(result.is_liked);
    assert_eq!(result.like_count, 4);

    let back = like_service::toggle(
        &db,
        &target.id,
        None,
        ToggleRequest {
            is_liked: true,
            like_count: 4,
        },
    )
    .await
    .unwrap();
    assert!(!back.is_liked);
    assert_eq!(back.like_count, 3);

    assert!(like_rows(&db, &target.id).await.is_empty());
}

#[tokio::test]
async fn toggling_an_invisible_playlist_is_not_found() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db, "owner").await;
    let reader = create_test_user(&db, "reader").await;
    let target = create_test_playlist(&db, &owner.id, "list").await;

    let mut unpublished: playlist::ActiveModel = target.into();
    unpublished.is_published = Set(false);
    let target = unpublished.update(&db).await.unwrap();

    let result = like_service::toggle(
        &db,
        &target.id,
        Some(&reader.id),
        ToggleRequest {
            is_liked: false,
            like_count: 0,
        },
    )
    .await;
    assert!(matches!(
        result,
        Err(booxmix::domain::DomainError::NotFound)
    ));
}
