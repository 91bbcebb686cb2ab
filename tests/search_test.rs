use booxmix::db;
use booxmix::domain::SoftDeleteScopes;
use booxmix::models::{book, book_data, playlist, playlist_book, provider, theme, user};
use booxmix::services::search;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, QueryFilter, Set};
use uuid::Uuid;

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_test_user(db: &DatabaseConnection, username: &str, active: bool) -> user::Model {
    let now = chrono::Utc::now().to_rfc3339();
    let row = user::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        password_hash: Set("hash".to_string()),
        nickname: Set(None),
        is_active: Set(active),
        is_admin: Set(false),
        date_verified: Set(Some(now.clone())),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    row.insert(db).await.expect("Failed to create user")
}

async fn default_theme(db: &DatabaseConnection) -> theme::Model {
    theme::Entity::active()
        .filter(theme::Column::Slug.eq("no-theme"))
        .one(db)
        .await
        .unwrap()
        .expect("seeded theme missing")
}

async fn create_theme(db: &DatabaseConnection, name: &str, slug: &str) -> theme::Model {
    let now = chrono::Utc::now().to_rfc3339();
    let template_id = default_theme(db).await.template_id;
    let row = theme::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        template_id: Set(template_id),
        name: Set(name.to_string()),
        slug: Set(Some(slug.to_string())),
        sequence: Set(Some(1)),
        description: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    row.insert(db).await.expect("Failed to create theme")
}

async fn create_test_playlist(
    db: &DatabaseConnection,
    user_id: &str,
    theme_id: &str,
    title: &str,
    description: &str,
    published: bool,
) -> playlist::Model {
    let now = chrono::Utc::now().to_rfc3339();
    let row = playlist::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        theme_id: Set(theme_id.to_string()),
        title: Set(title.to_string()),
        description: Set(description.to_string()),
        og_image: Set(None),
        sequence: Set(None),
        is_published: Set(published),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    row.insert(db).await.expect("Failed to create playlist")
}

/// Book with metadata, attached to a playlist.
async fn attach_book(
    db: &DatabaseConnection,
    playlist_id: &str,
    isbn: &str,
    title: &str,
    author: &str,
) {
    let now = chrono::Utc::now().to_rfc3339();
    let provider = provider::Entity::active()
        .filter(provider::Column::Slug.eq("rakuten"))
        .one(db)
        .await
        .unwrap()
        .expect("seeded provider missing");

    let book_row = book::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        isbn: Set(isbn.to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        deleted_at: Set(None),
    };
    book_row.insert(db).await.expect("Failed to create book");

    let data_row = book_data::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        book_isbn: Set(isbn.to_string()),
        provider_id: Set(provider.id),
        title: Set(Some(title.to_string())),
        author: Set(Some(author.to_string())),
        publisher: Set(None),
        cover: Set(None),
        affiliate_url: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        deleted_at: Set(None),
    };
    data_row.insert(db).await.expect("Failed to create book data");

    let join_row = playlist_book::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        playlist_id: Set(playlist_id.to_string()),
        book_isbn: Set(isbn.to_string()),
        description: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    join_row.insert(db).await.expect("Failed to attach book");
}

#[tokio::test]
async fn exact_title_matches_rank_before_substring_matches() {
    let db = setup_test_db().await;
    let author = create_test_user(&db, "author", true).await;
    let theme = default_theme(&db).await;

    // Substring match through the description, created after so that
    // recency would otherwise put it first.
    let substring = create_test_playlist(
        &db,
        &author.id,
        &theme.id,
        "積読メモ",
        "本が好きなひとのための棚",
        true,
    )
    .await;
    let exact =
        create_test_playlist(&db, &author.id, &theme.id, "恋愛", "おすすめ", true).await;

    let found = search::search_playlists(&db, Some("恋愛 本"), None)
        .await
        .expect("search failed");
    let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![exact.id.as_str(), substring.id.as_str()]);
}

#[tokio::test]
async fn full_width_whitespace_tokenizes_the_same_way() {
    let db = setup_test_db().await;
    let author = create_test_user(&db, "author", true).await;
    let theme = default_theme(&db).await;
    let exact = create_test_playlist(&db, &author.id, &theme.id, "恋愛", "おすすめ", true).await;

    let half = search::search_playlists(&db, Some("恋愛 本"), None).await.unwrap();
    let full = search::search_playlists(&db, Some("恋愛\u{3000}本"), None)
        .await
        .unwrap();
    assert_eq!(half.len(), full.len());
    assert_eq!(half[0].id, exact.id);
    assert_eq!(full[0].id, exact.id);
}

#[tokio::test]
async fn merged_results_contain_no_duplicates() {
    let db = setup_test_db().await;
    let author = create_test_user(&db, "author", true).await;
    let theme = default_theme(&db).await;

    // Matches both passes: exact on the title token and substring on
    // the description.
    let both = create_test_playlist(&db, &author.id, &theme.id, "恋愛", "恋愛の本です", true).await;

    let found = search::search_playlists(&db, Some("恋愛 本"), None)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, both.id);
}

#[tokio::test]
async fn book_metadata_is_searchable() {
    let db = setup_test_db().await;
    let author = create_test_user(&db, "author", true).await;
    let theme = default_theme(&db).await;
    let target =
        create_test_playlist(&db, &author.id, &theme.id, "棚", "説明", true).await;
    attach_book(&db, &target.id, "9784003101018", "こころ", "夏目漱石").await;

    let by_book_title = search::search_playlists(&db, Some("こころ"), None)
        .await
        .unwrap();
    assert_eq!(by_book_title.len(), 1);

    let by_book_author = search::search_playlists(&db, Some("漱石"), None)
        .await
        .unwrap();
    assert_eq!(by_book_author.len(), 1);
}

#[tokio::test]
async fn theme_filter_is_anded_with_the_text_condition() {
    let db = setup_test_db().await;
    let author = create_test_user(&db, "author", true).await;
    let romance = create_theme(&db, "恋愛", "romance").await;
    let other = default_theme(&db).await;

    let in_theme =
        create_test_playlist(&db, &author.id, &romance.id, "恋愛の棚", "説明", true).await;
    create_test_playlist(&db, &author.id, &other.id, "恋愛の別棚", "説明", true).await;

    let found = search::search_playlists(&db, Some("恋愛"), Some("romance"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, in_theme.id);

    let no_text = search::search_playlists(&db, None, Some("romance"))
        .await
        .unwrap();
    assert_eq!(no_text.len(), 1);
}

#[tokio::test]
async fn unpublished_and_inactive_owner_playlists_are_invisible() {
    let db = setup_test_db().await;
    let active_user = create_test_user(&db, "active", true).await;
    let inactive_user = create_test_user(&db, "inactive", false).await;
    let theme = default_theme(&db).await;

    create_test_playlist(&db, &active_user.id, &theme.id, "公開", "説明", true).await;
    create_test_playlist(&db, &active_user.id, &theme.id, "非公開", "説明", false).await;
    create_test_playlist(&db, &inactive_user.id, &theme.id, "退会者の棚", "説明", true).await;

    let found = search::search_playlists(&db, None, None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "公開");
}
