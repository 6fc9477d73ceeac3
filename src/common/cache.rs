// In-memory time-bounded caches for upstream API data

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::marketplace::models::{Product, Shop};

/// Listings change rarely compared to page traffic
pub const PRODUCTS_TTL_MINUTES: i64 = 60;
pub const SHOP_TTL_MINUTES: i64 = 24 * 60;
pub const INSTAGRAM_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
struct CachedValue<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CachedValue<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(cached) if cached.expires_at > Utc::now() => {
                debug!(key = %key, "Cache hit");
                Some(cached.value.clone())
            }
            _ => None,
        }
    }

    pub async fn insert(&self, key: &str, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CachedValue {
                value,
                expires_at: Utc::now() + self.ttl,
            },
        );
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Cached catalog data shared by the product and shop endpoints
#[derive(Debug)]
pub struct CatalogCache {
    pub products: TtlCache<Vec<Product>>,
    pub shop: TtlCache<Shop>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    pub fn new() -> Self {
        Self {
            products: TtlCache::new(Duration::minutes(PRODUCTS_TTL_MINUTES)),
            shop: TtlCache::new(Duration::minutes(SHOP_TTL_MINUTES)),
        }
    }

    /// Drop everything, e.g. after the marketplace connection changed
    pub async fn invalidate(&self) {
        self.products.clear().await;
        self.shop.clear().await;
        debug!("Catalog cache invalidated");
    }
}
