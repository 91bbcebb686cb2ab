use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Create users table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            email TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            nickname TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_admin INTEGER NOT NULL DEFAULT 0,
            date_verified TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE UNIQUE INDEX IF NOT EXISTS users_username_uniq
            ON users(username) WHERE deleted_at IS NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS users_email_uniq
            ON users(email) WHERE deleted_at IS NULL;
        "#
        .to_owned(),
    ))
    .await?;

    // Create card_templates table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS card_templates (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            book_numbers TEXT NOT NULL DEFAULT '[1]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE UNIQUE INDEX IF NOT EXISTS card_templates_slug_uniq
            ON card_templates(slug) WHERE deleted_at IS NULL;
        "#
        .to_owned(),
    ))
    .await?;

    // Create themes table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS themes (
            id TEXT PRIMARY KEY,
            template_id TEXT NOT NULL,
            name TEXT NOT NULL,
            slug TEXT,
            sequence INTEGER,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            FOREIGN KEY (template_id) REFERENCES card_templates(id)
        );
        CREATE INDEX IF NOT EXISTS idx_themes_sequence ON themes(sequence);
        CREATE UNIQUE INDEX IF NOT EXISTS themes_name_uniq
            ON themes(name) WHERE deleted_at IS NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS themes_slug_uniq
            ON themes(slug) WHERE deleted_at IS NULL;
        "#
        .to_owned(),
    ))
    .await?;

    // Create providers table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS providers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            endpoint TEXT NOT NULL,
            priority INTEGER NOT NULL,
            description TEXT,
            is_available INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_providers_priority ON providers(priority);
        CREATE UNIQUE INDEX IF NOT EXISTS providers_priority_uniq
            ON providers(priority) WHERE deleted_at IS NULL;
        "#
        .to_owned(),
    ))
    .await?;

    // Create books table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            isbn TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
        "#
        .to_owned(),
    ))
    .await?;

    // Create book_data table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS book_data (
            id TEXT PRIMARY KEY,
            book_isbn TEXT NOT NULL,
            provider_id TEXT NOT NULL,
            title TEXT,
            author TEXT,
            publisher TEXT,
            cover TEXT,
            affiliate_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            UNIQUE (book_isbn, provider_id),
            FOREIGN KEY (book_isbn) REFERENCES books(isbn) ON DELETE CASCADE,
            FOREIGN KEY (provider_id) REFERENCES providers(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_book_data_title ON book_data(title);
        CREATE INDEX IF NOT EXISTS idx_book_data_author ON book_data(author);
        CREATE INDEX IF NOT EXISTS idx_book_data_publisher ON book_data(publisher);
        "#
        .to_owned(),
    ))
    .await?;

    // Create playlists table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS playlists (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            theme_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            og_image TEXT,
            sequence INTEGER,
            is_published INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (theme_id) REFERENCES themes(id)
        );
        CREATE INDEX IF NOT EXISTS idx_playlists_title ON playlists(title);
        CREATE INDEX IF NOT EXISTS idx_playlists_user_created
            ON playlists(user_id, created_at);
        "#
        .to_owned(),
    ))
    .await?;

    // Create playlists_books table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS playlists_books (
            id TEXT PRIMARY KEY,
            playlist_id TEXT NOT NULL,
            book_isbn TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            FOREIGN KEY (playlist_id) REFERENCES playlists(id) ON DELETE CASCADE,
            FOREIGN KEY (book_isbn) REFERENCES books(isbn)
        );
        CREATE UNIQUE INDEX IF NOT EXISTS playlists_books_uniq
            ON playlists_books(playlist_id, book_isbn) WHERE deleted_at IS NULL;
        "#
        .to_owned(),
    ))
    .await?;

    // Create likes table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS likes (
            id TEXT PRIMARY KEY,
            playlist_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            message TEXT,
            date_notified TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            FOREIGN KEY (playlist_id) REFERENCES playlists(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_likes_playlist_created
            ON likes(playlist_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_likes_user_created
            ON likes(user_id, created_at);
        CREATE UNIQUE INDEX IF NOT EXISTS likes_playlist_user_uniq
            ON likes(playlist_id, user_id) WHERE deleted_at IS NULL;
        "#
        .to_owned(),
    ))
    .await?;

    // Create recommendations table (editorial pins, hard-deleted)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS recommendations (
            id TEXT PRIMARY KEY,
            playlist_id TEXT NOT NULL UNIQUE,
            theme_id TEXT NOT NULL,
            sequence INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (playlist_id) REFERENCES playlists(id) ON DELETE CASCADE,
            FOREIGN KEY (theme_id) REFERENCES themes(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_recommendations_theme_sequence
            ON recommendations(theme_id, sequence);
        "#
        .to_owned(),
    ))
    .await?;

    // Insert default card template if not exists
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        INSERT OR IGNORE INTO card_templates (id, name, slug, book_numbers, created_at, updated_at)
        SELECT 'b52de4a5-3a02-44e1-8c3c-93d6da1bb66a', 'Default', 'default', '[1,2,4,6]',
               datetime('now'), datetime('now')
        WHERE NOT EXISTS (SELECT 1 FROM card_templates WHERE slug = 'default')
        "#
        .to_owned(),
    ))
    .await?;

    // Insert catch-all theme if not exists
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        INSERT OR IGNORE INTO themes (id, template_id, name, slug, sequence, created_at, updated_at)
        SELECT '6f1abec3-70b5-4b8a-96de-1fcc1ab2d28e',
               (SELECT id FROM card_templates WHERE slug = 'default'),
               'No theme', 'no-theme', 9999, datetime('now'), datetime('now')
        WHERE NOT EXISTS (SELECT 1 FROM themes WHERE slug = 'no-theme')
        "#
        .to_owned(),
    ))
    .await?;

    // Insert default book-data provider if not exists
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        INSERT OR IGNORE INTO providers (id, name, slug, endpoint, priority, created_at, updated_at)
        SELECT '0c59c03e-8970-4f5c-a13a-fc8ebd6a2bd1', 'Rakuten Books', 'rakuten',
               'https://app.rakuten.co.jp/services/api/BooksBook/Search/20170404',
               1, datetime('now'), datetime('now')
        WHERE NOT EXISTS (SELECT 1 FROM providers WHERE slug = 'rakuten')
        "#
        .to_owned(),
    ))
    .await?;

    Ok(())
}
