use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Root directory of the local blob store.
    pub storage_path: String,
    /// Application key sent with every external book-data request.
    pub book_api_app_key: String,
    /// Slug of the provider used for lookups when none is specified.
    pub default_provider: String,
    /// Fixed number of attempts for the external lookup.
    pub lookup_retry_count: u32,
    /// Fixed sleep between attempts, in milliseconds.
    pub lookup_retry_interval_ms: u64,
    pub og_image_width: u32,
    pub og_image_height: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://booxmix.db?mode=rwc".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            storage_path: env::var("STORAGE_PATH").unwrap_or_else(|_| "media".to_string()),
            book_api_app_key: env::var("BOOK_API_APP_KEY").unwrap_or_default(),
            default_provider: env::var("DEFAULT_PROVIDER").unwrap_or_else(|_| "rakuten".to_string()),
            lookup_retry_count: env::var("LOOKUP_RETRY_COUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            lookup_retry_interval_ms: env::var("LOOKUP_RETRY_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            og_image_width: env::var("OG_IMAGE_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1200),
            og_image_height: env::var("OG_IMAGE_HEIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(630),
        }
    }
}
