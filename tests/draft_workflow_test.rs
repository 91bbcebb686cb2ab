use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use booxmix::api;
use booxmix::auth::create_jwt;
use booxmix::config::Config;
use booxmix::db;
use booxmix::domain::{DomainError, SoftDeleteScopes};
use booxmix::models::{book, book_data, playlist, playlist_book, provider, theme, user};
use booxmix::og_image::HtmlRasterizer;
use booxmix::services::draft::{DraftEntry, DraftForm, DraftKey, DraftMode, PendingBook};
use booxmix::services::playlist_service::{self, CommitError, OgImageContext};
use booxmix::state::AppState;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, QueryFilter, Set};
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

struct FakeRasterizer {
    calls: AtomicUsize,
    last_html: Mutex<Option<String>>,
}

impl FakeRasterizer {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last_html: Mutex::new(None),
        }
    }
}

#[async_trait]
impl HtmlRasterizer for FakeRasterizer {
    async fn rasterize(&self, html: &str, _width: u32, _height: u32) -> Result<Vec<u8>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_html.lock().unwrap() = Some(html.to_string());
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([220, 200, 180]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("png encode failed");
        Ok(out.into_inner())
    }
}

fn test_config(storage_path: &str) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        port: 0,
        cors_allowed_origins: Vec::new(),
        storage_path: storage_path.to_string(),
        book_api_app_key: "test-key".to_string(),
        default_provider: "rakuten".to_string(),
        lookup_retry_count: 5,
        lookup_retry_interval_ms: 0,
        og_image_width: 1200,
        og_image_height: 630,
    }
}

async fn setup_state() -> (AppState, Arc<FakeRasterizer>, tempfile::TempDir) {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let fake = Arc::new(FakeRasterizer::new());
    let state = AppState::new(db, test_config(dir.path().to_str().unwrap()))
        .await
        .expect("Failed to build state")
        .with_rasterizer(fake.clone());
    (state, fake, dir)
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
        .unwrap()
        .expect("seeded theme missing")
        .id
}

async fn default_provider_id(db: &DatabaseConnection) -> String {
    provider::Entity::active()
        .filter(provider::Column::Slug.eq("rakuten"))
        .one(db)
        .await
        .unwrap()
        .expect("seeded provider missing")
        .id
}

fn pending_book(isbn: &str, provider_id: &str, title: &str) -> PendingBook {
    PendingBook {
        isbn: isbn.to_string(),
        provider_id: Some(provider_id.to_string()),
        title: Some(title.to_string()),
        author: Some("著者".to_string()),
        publisher: None,
        cover: None,
    }
}

fn create_key(session: &str) -> DraftKey {
    DraftKey {
        session_id: session.to_string(),
        mode: DraftMode::Create,
        playlist_id: None,
    }
}

fn og_context<'a>(state: &'a AppState) -> OgImageContext<'a> {
    OgImageContext {
        rasterizer: state.rasterizer.as_ref(),
        storage: &state.storage,
        width: state.config.og_image_width,
        height: state.config.og_image_height,
    }
}

async fn playlist_count(db: &DatabaseConnection) -> usize {
    playlist::Entity::all_including_deleted()
        .all(db)
        .await
        .unwrap()
        .len()
}

async fn playlist_book_count(db: &DatabaseConnection) -> usize {
    playlist_book::Entity::all_including_deleted()
        .all(db)
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn committing_two_books_creates_one_playlist_and_two_rows() {
    let (state, fake, dir) = setup_state().await;
    let author = create_test_user(&state.db, "author").await;
    let theme_id = default_theme_id(&state.db).await;
    let provider_id = default_provider_id(&state.db).await;

    let key = create_key("sess");
    state.drafts.start(key.clone(), None, Vec::new());
    state
        .drafts
        .stash_form(
            &key,
            DraftForm {
                title: Some("恋愛".to_string()),
                theme_id: Some(theme_id.clone()),
                description: Some("説明".to_string()),
                entries: Vec::new(),
            },
        )
        .unwrap();
    state
        .drafts
        .add_book(&key, pending_book("9784003101018", &provider_id, "こころ"))
        .unwrap();
    state
        .drafts
        .add_book(&key, pending_book("9784101010014", &provider_id, "雪国"))
        .unwrap();

    let form = DraftForm {
        title: Some("恋愛".to_string()),
        theme_id: Some(theme_id),
        description: Some("説明".to_string()),
        entries: vec![
            DraftEntry {
                isbn: "9784003101018".to_string(),
                description: Some("一冊目".to_string()),
                delete: false,
            },
            DraftEntry {
                isbn: "9784101010014".to_string(),
                description: None,
                delete: false,
            },
        ],
    };

    let committed =
        playlist_service::commit(&state.db, &state.drafts, &key, form, &author.id, &og_context(&state))
            .await
            .expect("commit failed");

    assert_eq!(committed.title, "恋愛");
    assert_eq!(playlist_count(&state.db).await, 1);
    assert_eq!(playlist_book_count(&state.db).await, 2);

    // The pending ISBNs were materialized as catalog + metadata rows.
    for isbn in ["9784003101018", "9784101010014"] {
        assert!(
            book::Entity::active()
                .filter(book::Column::Isbn.eq(isbn))
                .one(&state.db)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            book_data::Entity::active()
                .filter(book_data::Column::BookIsbn.eq(isbn))
                .one(&state.db)
                .await
                .unwrap()
                .is_some()
        );
    }

    // Exactly one card generation, and the blob actually exists.
    assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    let path = committed.og_image.expect("og image path missing");
    assert!(dir.path().join(&path).exists());

    // Draft is gone once committed.
    assert!(state.drafts.get(&key).is_none());
}

#[tokio::test]
async fn zero_books_never_creates_rows_and_preserves_the_draft() {
    let (state, fake, _dir) = setup_state().await;
    let author = create_test_user(&state.db, "author").await;
    let theme_id = default_theme_id(&state.db).await;

    let key = create_key("sess");
    state.drafts.start(key.clone(), None, Vec::new());
    state
        .drafts
        .stash_form(&key, DraftForm::default())
        .unwrap();

    let form = DraftForm {
        title: Some("恋愛".to_string()),
        theme_id: Some(theme_id.clone()),
        description: Some("説明".to_string()),
        entries: Vec::new(),
    };
    let err = playlist_service::commit(
        &state.db,
        &state.drafts,
        &key,
        form,
        &author.id,
        &og_context(&state),
    )
    .await
    .expect_err("zero books must not commit");
    assert!(matches!(err, CommitError::NoBooks));

    // Entries flagged for deletion do not count either.
    let form = DraftForm {
        title: Some("恋愛".to_string()),
        theme_id: Some(theme_id),
        description: Some("説明".to_string()),
        entries: vec![DraftEntry {
            isbn: "9784003101018".to_string(),
            description: None,
            delete: true,
        }],
    };
    let err = playlist_service::commit(
        &state.db,
        &state.drafts,
        &key,
        form,
        &author.id,
        &og_context(&state),
    )
    .await
    .expect_err("deleted-only entries must not commit");
    assert!(matches!(err, CommitError::NoBooks));

    assert_eq!(playlist_count(&state.db).await, 0);
    assert_eq!(playlist_book_count(&state.db).await, 0);
    assert_eq!(fake.calls.load(Ordering::SeqCst), 0);

    // The author's inputs survive the failed submit.
    let draft = state.drafts.get(&key).expect("draft must be preserved");
    assert_eq!(draft.form.unwrap().title.as_deref(), Some("恋愛"));
}

#[tokio::test]
async fn entries_not_in_the_pending_list_are_rejected() {
    let (state, _fake, _dir) = setup_state().await;
    let author = create_test_user(&state.db, "author").await;
    let theme_id = default_theme_id(&state.db).await;
    let provider_id = default_provider_id(&state.db).await;

    let key = create_key("sess");
    state.drafts.start(key.clone(), None, Vec::new());
    state
        .drafts
        .stash_form(&key, DraftForm::default())
        .unwrap();
    state
        .drafts
        .add_book(&key, pending_book("9784003101018", &provider_id, "こころ"))
        .unwrap();

    let form = DraftForm {
        title: Some("棚".to_string()),
        theme_id: Some(theme_id),
        description: Some("説明".to_string()),
        entries: vec![DraftEntry {
            isbn: "9999999999999".to_string(), // never picked
            description: None,
            delete: false,
        }],
    };
    let err = playlist_service::commit(
        &state.db,
        &state.drafts,
        &key,
        form,
        &author.id,
        &og_context(&state),
    )
    .await
    .expect_err("unknown entry must not commit");
    assert!(matches!(err, CommitError::Invalid(_)));
    assert_eq!(playlist_count(&state.db).await, 0);
}

#[tokio::test]
async fn commit_without_a_draft_is_session_expired() {
    let (state, _fake, _dir) = setup_state().await;
    let author = create_test_user(&state.db, "author").await;
    let theme_id = default_theme_id(&state.db).await;

    let key = create_key("sess");
    let form = DraftForm {
        title: Some("棚".to_string()),
        theme_id: Some(theme_id),
        description: Some("説明".to_string()),
        entries: Vec::new(),
    };
    let err = playlist_service::commit(
        &state.db,
        &state.drafts,
        &key,
        form,
        &author.id,
        &og_context(&state),
    )
    .await
    .expect_err("no draft must not commit");
    assert!(matches!(err, CommitError::SessionExpired));
    assert_eq!(playlist_count(&state.db).await, 0);
}

// ---------------------------------------------------------------------------
// Router-level flows
// ---------------------------------------------------------------------------

fn get_request(uri: &str, token: &str, session: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header("X-Session-Id", session)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, token: &str, session: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header("X-Session-Id", session)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_test_playlist(db: &DatabaseConnection, user_id: &str, title: &str) -> playlist::Model {
    let now = chrono::Utc::now().to_rfc3339();
    let row = playlist::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        theme_id: Set(default_theme_id(db).await),
        title: Set(title.to_string()),
        description: Set("説明".to_string()),
        og_image: Set(None),
        sequence: Set(None),
        is_published: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    row.insert(db).await.expect("Failed to create playlist")
}

#[tokio::test]
async fn non_owner_update_draft_redirects_to_detail_with_warning() {
    let (state, _fake, _dir) = setup_state().await;
    let owner = create_test_user(&state.db, "owner").await;
    let intruder = create_test_user(&state.db, "intruder").await;
    let target = create_test_playlist(&state.db, &owner.id, "恋愛").await;
    let app = api::api_router(state.clone());

    let token = create_jwt(&intruder.id, &intruder.username, false).unwrap();
    let uri = format!("/playlists/draft?mode=update&playlist_id={}", target.id);
    let response = app
        .clone()
        .oneshot(get_request(&uri, &token, "sess-b"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(location, format!("/api/playlists/{}", target.id));
    let body = body_json(response).await;
    assert!(body["warning"].as_str().unwrap_or_default().contains("owner"));

    // The playlist itself is untouched.
    let reloaded = playlist::Entity::active()
        .filter(playlist::Column::Id.eq(&target.id))
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.title, "恋愛");
    assert_eq!(reloaded.updated_at, target.updated_at);
}

#[tokio::test]
async fn picking_a_book_without_a_draft_restarts_the_workflow() {
    let (state, _fake, _dir) = setup_state().await;
    let author = create_test_user(&state.db, "author").await;
    let app = api::api_router(state.clone());
    let token = create_jwt(&author.id, &author.username, false).unwrap();

    let response = app
        .oneshot(post_json(
            "/playlists/draft/books",
            &token,
            "fresh-session",
            serde_json::json!({
                "mode": "create",
                "book": {
                    "isbn": "9784003101018",
                    "provider_id": null,
                    "title": "こころ",
                    "author": null,
                    "publisher": null,
                    "cover": null
                }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(location, "/api/playlists/draft?mode=create");
    let body = body_json(response).await;
    assert!(
        body["warning"]
            .as_str()
            .unwrap_or_default()
            .contains("Session timeout")
    );
}

#[tokio::test]
async fn the_full_create_flow_round_trips_over_http() {
    let (state, fake, _dir) = setup_state().await;
    let author = create_test_user(&state.db, "author").await;
    let theme_id = default_theme_id(&state.db).await;
    let provider_id = default_provider_id(&state.db).await;
    let app = api::api_router(state.clone());
    let token = create_jwt(&author.id, &author.username, false).unwrap();
    let session = "sess-1";

    // 1. Open the Draft screen (resets the pending state).
    let response = app
        .clone()
        .oneshot(get_request("/playlists/draft?mode=create", &token, session))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 2. Post the form with the add-book action: stash and detour.
    let response = app
        .clone()
        .oneshot(post_json(
            "/playlists/draft/submit",
            &token,
            session,
            serde_json::json!({
                "mode": "create",
                "add_book": true,
                "title": "恋愛",
                "theme_id": theme_id,
                "description": "説明",
                "books": []
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(location.contains("/draft/books?mode=create"));

    // 3. Pick a search result.
    let response = app
        .clone()
        .oneshot(post_json(
            "/playlists/draft/books",
            &token,
            session,
            serde_json::json!({
                "mode": "create",
                "book": {
                    "isbn": "9784003101018",
                    "provider_id": provider_id,
                    "title": "こころ",
                    "author": "夏目漱石",
                    "publisher": null,
                    "cover": null
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let body = body_json(response).await;
    assert_eq!(body["added"], serde_json::json!(true));
    assert!(
        body["redirect"]
            .as_str()
            .unwrap()
            .contains("continue=true")
    );

    // 4. Back on the Draft screen with the continue marker: the pick
    //    survived.
    let response = app
        .clone()
        .oneshot(get_request(
            "/playlists/draft?mode=create&continue=true",
            &token,
            session,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["draft"]["books"].as_array().unwrap().len(), 1);

    // 5. Submit for real.
    let response = app
        .clone()
        .oneshot(post_json(
            "/playlists/draft/submit",
            &token,
            session,
            serde_json::json!({
                "mode": "create",
                "title": "恋愛",
                "theme_id": theme_id,
                "description": "説明",
                "books": [{ "isbn": "9784003101018", "description": "一冊目" }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let playlist_id = body["playlist"]["id"].as_str().unwrap().to_string();

    assert_eq!(playlist_count(&state.db).await, 1);
    assert_eq!(playlist_book_count(&state.db).await, 1);
    assert_eq!(fake.calls.load(Ordering::SeqCst), 1);

    // 6. The committed playlist is publicly visible.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/playlists/{}", playlist_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"], serde_json::json!("恋愛"));
    assert_eq!(body["books"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn update_mode_reconciles_book_entries() {
    let (state, _fake, _dir) = setup_state().await;
    let author = create_test_user(&state.db, "author").await;
    let provider_id = default_provider_id(&state.db).await;
    let target = create_test_playlist(&state.db, &author.id, "旧題").await;

    // Two books already on the playlist.
    let now = chrono::Utc::now().to_rfc3339();
    for isbn in ["9784003101018", "9784101010014"] {
        let book_row = book::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            isbn: Set(isbn.to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            deleted_at: Set(None),
        };
        book_row.insert(&state.db).await.unwrap();
        let join_row = playlist_book::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            playlist_id: Set(target.id.clone()),
            book_isbn: Set(isbn.to_string()),
            description: Set(Some("元の説明".to_string())),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            deleted_at: Set(None),
        };
        join_row.insert(&state.db).await.unwrap();
    }

    let key = DraftKey {
        session_id: "sess".to_string(),
        mode: DraftMode::Update,
        playlist_id: Some(target.id.clone()),
    };
    let (form, books) = playlist_service::initial_draft_for_update(&state.db, &target)
        .await
        .unwrap();
    assert_eq!(books.len(), 2);
    state.drafts.start(key.clone(), Some(form), books);
    state
        .drafts
        .add_book(
            &key,
            pending_book("9784087520019", &provider_id, "新しい本"),
        )
        .unwrap();

    let form = DraftForm {
        title: Some("新題".to_string()),
        theme_id: Some(default_theme_id(&state.db).await),
        description: Some("新しい説明".to_string()),
        entries: vec![
            DraftEntry {
                isbn: "9784003101018".to_string(),
                description: None,
                delete: true,
            },
            DraftEntry {
                isbn: "9784101010014".to_string(),
                description: Some("書き直した説明".to_string()),
                delete: false,
            },
            DraftEntry {
                isbn: "9784087520019".to_string(),
                description: None,
                delete: false,
            },
        ],
    };

    let committed =
        playlist_service::commit(&state.db, &state.drafts, &key, form, &author.id, &og_context(&state))
            .await
            .expect("update commit failed");
    assert_eq!(committed.id, target.id);
    assert_eq!(committed.title, "新題");

    let active_rows = playlist_book::Entity::active()
        .filter(playlist_book::Column::PlaylistId.eq(&target.id))
        .all(&state.db)
        .await
        .unwrap();
    let mut active_isbns: Vec<&str> = active_rows.iter().map(|r| r.book_isbn.as_str()).collect();
    active_isbns.sort();
    assert_eq!(active_isbns, vec!["9784087520019", "9784101010014"]);
    let kept = active_rows
        .iter()
        .find(|r| r.book_isbn == "9784101010014")
        .unwrap();
    assert_eq!(kept.description.as_deref(), Some("書き直した説明"));

    // The removed entry is soft-deleted, not gone.
    let removed = playlist_book::Entity::deleted_only()
        .filter(playlist_book::Column::PlaylistId.eq(&target.id))
        .all(&state.db)
        .await
        .unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].book_isbn, "9784003101018");
}
