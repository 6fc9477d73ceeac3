// Instagram Graph API client for the homepage feed

use chrono::{Duration, Utc};
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::models::{fallback_posts, InstagramPost, MediaPage};
use crate::common::cache::{TtlCache, INSTAGRAM_TTL_MINUTES};
use crate::common::config::InstagramConfig;

pub const DEFAULT_POST_LIMIT: usize = 8;
const MEDIA_FIELDS: &str = "id,media_type,media_url,permalink,caption,timestamp,thumbnail_url";

#[derive(Debug, Error)]
pub enum InstagramError {
    #[error("INSTAGRAM_ACCESS_TOKEN not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Instagram API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub struct InstagramClient {
    client: Client,
    config: Arc<InstagramConfig>,
    cache: TtlCache<Vec<InstagramPost>>,
}

impl InstagramClient {
    pub fn new(config: Arc<InstagramConfig>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            config,
            cache: TtlCache::new(Duration::minutes(INSTAGRAM_TTL_MINUTES)),
        }
    }

    async fn fetch_media(&self, limit: usize) -> Result<Vec<InstagramPost>, InstagramError> {
        let token = self
            .config
            .access_token
            .as_deref()
            .ok_or(InstagramError::NotConfigured)?;
        let url = format!("{}/me/media", self.config.api_base.trim_end_matches('/'));
        let limit = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("fields", MEDIA_FIELDS),
                ("limit", limit.as_str()),
                ("access_token", token),
            ])
            .send()
            .await
            .map_err(|e| InstagramError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InstagramError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let page = response
            .json::<MediaPage>()
            .await
            .map_err(|e| InstagramError::SerializationError(e.to_string()))?;
        Ok(page.data)
    }

    /// Latest posts, empty when the API is unavailable. Non-empty results
    /// are cached for an hour per limit.
    pub async fn get_posts(&self, limit: usize) -> Vec<InstagramPost> {
        let key = limit.to_string();
        if let Some(posts) = self.cache.get(&key).await {
            return posts;
        }

        match self.fetch_media(limit).await {
            Ok(posts) => {
                debug!(count = posts.len(), "Fetched Instagram posts");
                if !posts.is_empty() {
                    self.cache.insert(&key, posts.clone()).await;
                }
                posts
            }
            Err(InstagramError::NotConfigured) => {
                debug!("Instagram access token not configured");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Instagram posts unavailable");
                Vec::new()
            }
        }
    }

    /// Latest posts, or the fallback posts when there are none
    pub async fn get_posts_with_fallback(&self, limit: usize) -> Vec<InstagramPost> {
        let posts = self.get_posts(limit).await;
        if posts.is_empty() {
            fallback_posts(limit, Utc::now())
        } else {
            posts
        }
    }
}
