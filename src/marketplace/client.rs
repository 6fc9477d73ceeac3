// Read-only client for the marketplace's shop, listing and taxonomy endpoints

use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::classifier::{classify_input, match_rule, ClassificationInput};
use super::models::{
    Listing, ListingProperty, Product, ResultsPage, Shop, TaxonomyInfo, TaxonomyNode,
};
use crate::common::config::MarketplaceConfig;
use crate::storage::{TokenRefresher, TokenStore};

pub const DEFAULT_LISTING_LIMIT: u32 = 100;
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-image.jpg";
const NEW_LISTING_DAYS: i64 = 30;
const BESTSELLER_MIN_FAVORERS: i64 = 10;

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("ETSY_API_KEY or ETSY_SHOP_ID not configured")]
    NotConfigured,

    #[error("No valid access token available")]
    NotAuthenticated,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Marketplace API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub struct MarketplaceClient {
    client: Client,
    config: Arc<MarketplaceConfig>,
    refresher: Arc<dyn TokenRefresher>,
    taxonomy_cache: RwLock<HashMap<i64, TaxonomyInfo>>,
}

impl MarketplaceClient {
    pub fn new(config: Arc<MarketplaceConfig>, refresher: Arc<dyn TokenRefresher>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            config,
            refresher,
            taxonomy_cache: RwLock::new(HashMap::new()),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), MarketplaceError> {
        match (self.config.api_key.as_deref(), self.config.shop_id.as_deref()) {
            (Some(key), Some(shop)) => Ok((key, shop)),
            _ => Err(MarketplaceError::NotConfigured),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: Option<&str>,
    ) -> Result<T, MarketplaceError> {
        let (api_key, _) = self.credentials()?;
        let url = format!("{}{}", self.config.api_base, path);

        let mut request = self.client.get(&url).header("x-api-key", api_key);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MarketplaceError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MarketplaceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MarketplaceError::SerializationError(e.to_string()))
    }

    async fn fetch_listings(
        &self,
        store: &dyn TokenStore,
        limit: u32,
    ) -> Result<Vec<Listing>, MarketplaceError> {
        let (_, shop_id) = self.credentials()?;
        let token = store
            .get_valid_access_token(self.refresher.as_ref())
            .await
            .ok_or(MarketplaceError::NotAuthenticated)?;

        let path = format!(
            "/application/shops/{}/listings/active?limit={}&includes=images",
            shop_id, limit
        );
        let page: ResultsPage<Listing> = self.get_json(&path, Some(&token)).await?;
        Ok(page.results)
    }

    /// Active listings with images; empty on any failure
    pub async fn get_listings(&self, store: &dyn TokenStore, limit: u32) -> Vec<Listing> {
        match self.fetch_listings(store, limit).await {
            Ok(listings) => {
                debug!(count = listings.len(), "Fetched active listings");
                listings
            }
            Err(e) => {
                warn!(error = %e, "Could not fetch listings");
                Vec::new()
            }
        }
    }

    /// Shop details; the access token is sent when one is available
    pub async fn get_shop(&self, store: &dyn TokenStore) -> Option<Shop> {
        let shop_id = match self.credentials() {
            Ok((_, shop_id)) => shop_id,
            Err(e) => {
                warn!(error = %e, "Could not fetch shop");
                return None;
            }
        };
        let token = store.get_valid_access_token(self.refresher.as_ref()).await;

        match self
            .get_json::<Shop>(&format!("/application/shops/{}", shop_id), token.as_deref())
            .await
        {
            Ok(shop) => Some(shop),
            Err(e) => {
                warn!(error = %e, "Could not fetch shop");
                None
            }
        }
    }

    /// Buyer-taxonomy node and breadcrumb, cached per id for the process lifetime
    pub async fn get_taxonomy(&self, taxonomy_id: i64, access_token: Option<&str>) -> Option<TaxonomyInfo> {
        if let Some(info) = self.taxonomy_cache.read().await.get(&taxonomy_id) {
            return Some(info.clone());
        }

        let base = format!("/application/buyer-taxonomy/nodes/{}", taxonomy_id);
        let node: TaxonomyNode = match self.get_json(&base, access_token).await {
            Ok(node) => node,
            Err(e) => {
                debug!(taxonomy_id, error = %e, "Taxonomy lookup failed");
                return None;
            }
        };

        // the breadcrumb is optional, the node alone still helps classification
        let path = match self
            .get_json::<ResultsPage<TaxonomyNode>>(&format!("{}/path", base), access_token)
            .await
        {
            Ok(page) => page.results,
            Err(e) => {
                debug!(taxonomy_id, error = %e, "Taxonomy path lookup failed");
                Vec::new()
            }
        };

        let info = TaxonomyInfo { node, path };
        self.taxonomy_cache
            .write()
            .await
            .insert(taxonomy_id, info.clone());
        Some(info)
    }

    pub async fn get_listing_properties(
        &self,
        listing_id: i64,
        access_token: Option<&str>,
    ) -> Vec<ListingProperty> {
        let shop_id = match self.credentials() {
            Ok((_, shop_id)) => shop_id,
            Err(_) => return Vec::new(),
        };
        let path = format!(
            "/application/shops/{}/listings/{}/properties",
            shop_id, listing_id
        );

        match self
            .get_json::<ResultsPage<ListingProperty>>(&path, access_token)
            .await
        {
            Ok(page) => page.results,
            Err(e) => {
                debug!(listing_id, error = %e, "Listing properties lookup failed");
                Vec::new()
            }
        }
    }

    /// All active listings mapped to products; empty on any failure.
    ///
    /// Listing properties cost one request per listing, so they are only
    /// fetched for listings the cheaper signals cannot classify.
    pub async fn get_products(&self, store: &dyn TokenStore) -> Vec<Product> {
        let listings = self.get_listings(store, DEFAULT_LISTING_LIMIT).await;
        if listings.is_empty() {
            return Vec::new();
        }
        // refreshed above if it had expired, so this is a plain read
        let token = store.get_valid_access_token(self.refresher.as_ref()).await;

        let now = Utc::now();
        let mut products = Vec::with_capacity(listings.len());

        for listing in &listings {
            let taxonomy = match listing.taxonomy_id {
                Some(id) => self.get_taxonomy(id, token.as_deref()).await,
                None => None,
            };

            let taxonomy_path = taxonomy_path_names(taxonomy.as_ref());
            let cheap = ClassificationInput {
                tags: &listing.tags,
                materials: &listing.materials,
                title: &listing.title,
                taxonomy_name: taxonomy.as_ref().map(|t| t.node.name.as_str()),
                taxonomy_path: &taxonomy_path,
                property_values: &[],
            };

            let properties = if match_rule(&cheap).is_none() {
                self.get_listing_properties(listing.listing_id, token.as_deref())
                    .await
            } else {
                Vec::new()
            };

            products.push(map_listing_to_product(
                listing,
                taxonomy.as_ref(),
                &properties,
                now,
            ));
        }

        info!(count = products.len(), "Loaded products from marketplace");
        products
    }

    pub async fn get_product(&self, store: &dyn TokenStore, id: &str) -> Option<Product> {
        self.get_products(store)
            .await
            .into_iter()
            .find(|p| p.id == id)
    }
}

fn taxonomy_path_names(taxonomy: Option<&TaxonomyInfo>) -> Vec<String> {
    taxonomy
        .map(|t| t.path.iter().map(|n| n.name.clone()).collect())
        .unwrap_or_default()
}

/// Pure listing to product transform
pub fn map_listing_to_product(
    listing: &Listing,
    taxonomy: Option<&TaxonomyInfo>,
    properties: &[ListingProperty],
    now: DateTime<Utc>,
) -> Product {
    let images = listing.images.as_deref().unwrap_or_default();
    let main_image = images
        .first()
        .and_then(|img| img.url_570x_n.clone())
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());
    let gallery: Vec<String> = images
        .iter()
        .filter_map(|img| img.url_fullxfull.clone())
        .collect();
    let gallery = if gallery.is_empty() {
        vec![main_image.clone()]
    } else {
        gallery
    };

    let taxonomy_path = taxonomy_path_names(taxonomy);
    let property_values: Vec<String> = properties
        .iter()
        .flat_map(|p| p.values.iter().cloned())
        .collect();
    let category = classify_input(&ClassificationInput {
        tags: &listing.tags,
        materials: &listing.materials,
        title: &listing.title,
        taxonomy_name: taxonomy.map(|t| t.node.name.as_str()),
        taxonomy_path: &taxonomy_path,
        property_values: &property_values,
    });

    let is_new = match Utc.timestamp_opt(listing.created_timestamp, 0).single() {
        Some(created) => created > now - Duration::days(NEW_LISTING_DAYS),
        None => {
            error!(listing_id = listing.listing_id, "Listing has an invalid creation timestamp");
            false
        }
    };

    Product {
        id: listing.listing_id.to_string(),
        name: listing.title.clone(),
        price: listing.price.value(),
        currency: listing.price.currency_code.clone(),
        image: main_image,
        images: gallery,
        category,
        description: listing.description.clone(),
        is_new,
        is_bestseller: listing.num_favorers > BESTSELLER_MIN_FAVORERS,
        in_stock: listing.quantity > 0 && listing.state == "active",
        quantity: listing.quantity,
        marketplace_url: listing.url.clone(),
        listing_id: listing.listing_id,
        tags: listing.tags.clone(),
    }
}
