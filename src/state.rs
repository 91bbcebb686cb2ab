//! Application state shared across all handlers

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::domain::DomainError;
use crate::lookup::BookLookupClient;
use crate::models::provider;
use crate::og_image::{HtmlRasterizer, WkhtmltoimageRasterizer};
use crate::services::draft::DraftStore;
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub drafts: DraftStore,
    pub storage: Storage,
    pub lookup: BookLookupClient,
    pub rasterizer: Arc<dyn HtmlRasterizer>,
    /// Provider the external lookup is wired to, resolved at startup.
    pub default_provider_id: Option<String>,
}

impl AppState {
    pub async fn new(db: DatabaseConnection, config: Config) -> Result<Self, DomainError> {
        use sea_orm::{ColumnTrait, QueryFilter};

        let storage = Storage::local(&config.storage_path)?;
        let default_provider = provider::Entity::available()
            .filter(provider::Column::Slug.eq(config.default_provider.clone()))
            .one(&db)
            .await?;
        let endpoint = default_provider
            .as_ref()
            .map(|p| p.endpoint.clone())
            .unwrap_or_default();
        let lookup = BookLookupClient::new(&config, endpoint);

        Ok(Self {
            db,
            config,
            drafts: DraftStore::new(),
            storage,
            lookup,
            rasterizer: Arc::new(WkhtmltoimageRasterizer::new()),
            default_provider_id: default_provider.map(|p| p.id),
        })
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn HtmlRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_lookup(mut self, lookup: BookLookupClient) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }
}

// Allow extracting the bare connection where a handler only needs the
// database.
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
