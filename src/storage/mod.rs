//! # Storage Module
//!
//! Persistence of the single marketplace OAuth session:
//! - `TokenStore` trait shared by every backend
//! - File, encrypted-cookie and key-value-store backends
//! - `StorageBackend`, picked once at startup from configuration

pub mod cookie;
pub mod file;
pub mod kv;


use async_trait::async_trait;
use axum_extra::extract::cookie::CookieJar;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::common::config::{StorageConfig, StorageKind};
use crate::common::safe_token_log;
use crate::oauth::errors::OAuthError;
use crate::oauth::models::{now_millis, OAuthState, OAuthTokens, TokenGrant, TokenUpdate};
use crate::services::EncryptionService;

pub use cookie::{CookieSealer, CookieTokenStore};
pub use file::FileTokenStore;
pub use kv::KvTokenStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage not configured: {0}")]
    NotConfigured(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored data could not be decoded: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Exchanges a refresh token for a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, OAuthError>;
}

/// Storage for the one active OAuth session.
///
/// Backends only implement the raw read/write/delete primitives; merging,
/// validation and refresh live in the provided methods so every backend
/// behaves identically.
#[async_trait]
pub trait TokenStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn read_tokens(&self) -> Result<Option<OAuthTokens>, StorageError>;
    async fn write_tokens(&self, tokens: &OAuthTokens) -> Result<(), StorageError>;
    async fn delete_tokens(&self) -> Result<(), StorageError>;

    async fn read_state(&self) -> Result<Option<OAuthState>, StorageError>;
    async fn write_state(&self, state: &OAuthState) -> Result<(), StorageError>;
    async fn delete_state(&self) -> Result<(), StorageError>;

    /// Cookie changes to attach to the response; a no-op outside the cookie backend
    fn write_cookies(&self, jar: CookieJar) -> CookieJar {
        jar
    }

    async fn save_tokens(&self, update: TokenUpdate) -> Result<OAuthTokens, StorageError> {
        let existing = self.load_tokens().await;
        let tokens = update.merge(existing, now_millis());
        self.write_tokens(&tokens).await?;
        info!(
            backend = self.backend_name(),
            user_id = ?tokens.user_id,
            access_token = %safe_token_log(&tokens.access_token),
            expires_at = %tokens.expires_at,
            "OAuth tokens saved"
        );
        Ok(tokens)
    }

    /// Never fails: unreadable or undecodable data counts as "no tokens"
    async fn load_tokens(&self) -> Option<OAuthTokens> {
        match self.read_tokens().await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(backend = self.backend_name(), error = %e, "Could not load OAuth tokens");
                None
            }
        }
    }

    async fn are_tokens_valid(&self) -> bool {
        self.load_tokens()
            .await
            .map(|t| t.is_valid_at(now_millis()))
            .unwrap_or(false)
    }

    /// A valid access token, or at least a refresh token to recover one
    async fn has_valid_authentication(&self) -> bool {
        match self.load_tokens().await {
            Some(tokens) => tokens.is_valid_at(now_millis()) || tokens.has_refresh_token(),
            None => false,
        }
    }

    /// The current access token, refreshing it once if it has expired
    async fn get_valid_access_token(&self, refresher: &dyn TokenRefresher) -> Option<String> {
        let tokens = self.load_tokens().await?;

        if tokens.is_valid_at(now_millis()) {
            return Some(tokens.access_token);
        }

        if !tokens.has_refresh_token() {
            debug!(backend = self.backend_name(), "Access token expired and no refresh token stored");
            return None;
        }

        info!(backend = self.backend_name(), "Access token expired, refreshing");
        let grant = match refresher.refresh(&tokens.refresh_token).await {
            Ok(grant) => grant,
            Err(e) => {
                warn!(error = %e, "Failed to refresh access token");
                return None;
            }
        };
        if let Err(reason) = grant.check(now_millis()) {
            warn!(%reason, "Refresh returned an unusable grant, keeping stored tokens");
            return None;
        }

        match self
            .save_tokens(TokenUpdate::from_grant(grant, tokens.scopes))
            .await
        {
            Ok(saved) if !saved.access_token.is_empty() => Some(saved.access_token),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to store refreshed tokens");
                None
            }
        }
    }

    async fn save_oauth_state(&self, state: &OAuthState) -> Result<(), StorageError> {
        self.write_state(state).await?;
        debug!(backend = self.backend_name(), "OAuth state saved");
        Ok(())
    }

    /// The stored state if it matches `state_param` and is at most 15 minutes old
    async fn load_and_validate_oauth_state(&self, state_param: &str) -> Option<OAuthState> {
        let stored = match self.read_state().await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                warn!(backend = self.backend_name(), "No OAuth state found");
                return None;
            }
            Err(e) => {
                warn!(backend = self.backend_name(), error = %e, "Could not load OAuth state");
                return None;
            }
        };

        if stored.state != state_param {
            warn!("OAuth state mismatch - possible CSRF attack");
            return None;
        }

        if stored.is_expired_at(now_millis()) {
            warn!(created_at = %stored.created_at, "OAuth state expired");
            return None;
        }

        Some(stored)
    }

    async fn clear_oauth_state(&self) {
        if let Err(e) = self.delete_state().await {
            warn!(backend = self.backend_name(), error = %e, "Could not clear OAuth state");
        }
    }

    async fn clear_all_oauth_data(&self) {
        if let Err(e) = self.delete_tokens().await {
            warn!(backend = self.backend_name(), error = %e, "Could not clear OAuth tokens");
        }
        self.clear_oauth_state().await;
        info!(backend = self.backend_name(), "All OAuth data cleared");
    }
}

/// The deployment's token storage, chosen once at startup
#[derive(Clone)]
pub enum StorageBackend {
    File(Arc<FileTokenStore>),
    Cookie(Arc<CookieSealer>),
    KeyValue(Arc<KvTokenStore>),
}

impl StorageBackend {
    pub fn from_config(config: &StorageConfig, http: Client) -> Result<Self, StorageError> {
        match config.kind {
            StorageKind::File => Ok(Self::File(Arc::new(FileTokenStore::new(&config.data_dir)))),
            StorageKind::Cookie => {
                let secret = config.cookie_secret.as_deref().ok_or_else(|| {
                    StorageError::NotConfigured("COOKIE_SECRET is required for cookie storage".into())
                })?;
                let encryption = EncryptionService::from_secret(secret)
                    .map_err(|e| StorageError::NotConfigured(e.to_string()))?;
                Ok(Self::Cookie(Arc::new(CookieSealer::new(
                    encryption,
                    secret,
                    config.cookie_secure,
                ))))
            }
            StorageKind::KeyValue => {
                let (url, token) = match (&config.kv_url, &config.kv_token) {
                    (Some(url), Some(token)) => (url, token),
                    _ => {
                        return Err(StorageError::NotConfigured(
                            "KV_REST_API_URL and KV_REST_API_TOKEN are required for kv storage"
                                .into(),
                        ))
                    }
                };
                Ok(Self::KeyValue(Arc::new(KvTokenStore::new(http, url, token))))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::File(_) => StorageKind::File.as_str(),
            Self::Cookie(_) => StorageKind::Cookie.as_str(),
            Self::KeyValue(_) => StorageKind::KeyValue.as_str(),
        }
    }

    /// Exercise the backend once; `Ok` carries a human readable summary
    pub async fn health_check(&self) -> Result<String, StorageError> {
        match self {
            Self::File(store) => {
                store.check_data_dir().await?;
                Ok("Data directory is writable".to_string())
            }
            Self::Cookie(sealer) => {
                let sealed = sealer.seal(&"ping", chrono::Duration::minutes(1))?;
                let opened: String = sealer.open(&sealed)?;
                if opened == "ping" {
                    Ok("Cookie sealing round-trip succeeded".to_string())
                } else {
                    Err(StorageError::Backend("cookie round-trip mismatch".into()))
                }
            }
            Self::KeyValue(store) => {
                store.ping().await?;
                Ok("KV store connection working".to_string())
            }
        }
    }

    /// A store bound to the current request; only the cookie backend reads `jar`
    pub fn open(&self, jar: &CookieJar) -> Arc<dyn TokenStore> {
        match self {
            Self::File(store) => store.clone(),
            Self::Cookie(sealer) => Arc::new(CookieTokenStore::new(sealer.clone(), jar.clone())),
            Self::KeyValue(store) => store.clone(),
        }
    }
}
