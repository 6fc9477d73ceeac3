// Application state shared across all modules

use reqwest::Client;
use std::sync::Arc;

use crate::common::cache::CatalogCache;
use crate::common::config::AppConfig;
use crate::instagram::InstagramClient;
use crate::marketplace::MarketplaceClient;
use crate::newsletter::NewsletterClient;
use crate::oauth::OAuthService;
use crate::storage::{StorageBackend, StorageError};

/// Configuration, token storage and the upstream API clients
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: StorageBackend,
    pub oauth: Arc<OAuthService>,
    pub marketplace: Arc<MarketplaceClient>,
    pub catalog_cache: Arc<CatalogCache>,
    pub newsletter: Arc<NewsletterClient>,
    pub instagram: Arc<InstagramClient>,
}

impl AppState {
    /// Wire every service from configuration; fails when the selected
    /// storage backend is missing its settings
    pub fn new(config: AppConfig) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        let storage = StorageBackend::from_config(&config.storage, http)?;
        let marketplace_config = Arc::new(config.marketplace.clone());
        let oauth = Arc::new(OAuthService::new(marketplace_config.clone()));
        let marketplace = Arc::new(MarketplaceClient::new(marketplace_config, oauth.clone()));
        let newsletter = Arc::new(NewsletterClient::new(Arc::new(config.newsletter.clone())));
        let instagram = Arc::new(InstagramClient::new(Arc::new(config.instagram.clone())));

        Ok(Self {
            config: Arc::new(config),
            storage,
            oauth,
            marketplace,
            catalog_cache: Arc::new(CatalogCache::new()),
            newsletter,
            instagram,
        })
    }
}
