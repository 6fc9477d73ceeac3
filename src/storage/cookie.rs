//! Encrypted-cookie backend.
//!
//! Each record is signed as an HS256 JWT with an `exp` claim, then encrypted
//! with AES-256-GCM and stored in an HTTP-only cookie. Anything that fails to
//! decrypt, verify or deserialize reads as absent.

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{StorageError, TokenStore};
use crate::oauth::models::{OAuthState, OAuthTokens, STATE_MAX_AGE_MINUTES};
use crate::services::EncryptionService;

pub const TOKENS_COOKIE: &str = "etsy_oauth_tokens";
pub const STATE_COOKIE: &str = "etsy_oauth_state";

const TOKENS_MAX_AGE_DAYS: i64 = 7;

#[derive(Serialize, Deserialize)]
struct SealedClaims<T> {
    data: T,
    iat: usize,
    exp: usize,
}

/// Signs, encrypts and reverses cookie payloads
pub struct CookieSealer {
    encryption: EncryptionService,
    signing_key: Vec<u8>,
    secure: bool,
}

impl CookieSealer {
    pub fn new(encryption: EncryptionService, signing_secret: &str, secure: bool) -> Self {
        Self {
            encryption,
            signing_key: signing_secret.as_bytes().to_vec(),
            secure,
        }
    }

    pub fn seal<T: Serialize>(&self, data: &T, ttl: Duration) -> Result<String, StorageError> {
        let now = Utc::now();
        let claims = SealedClaims {
            data,
            iat: now.timestamp() as usize,
            exp: (now + ttl).timestamp() as usize,
        };

        let jwt = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.signing_key),
        )
        .map_err(|e| StorageError::Backend(format!("jwt signing failed: {}", e)))?;

        self.encryption
            .encrypt(&jwt)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    /// Reverses [`CookieSealer::seal`]; rejects tampered, foreign and expired values
    pub fn open<T: DeserializeOwned>(&self, sealed: &str) -> Result<T, StorageError> {
        let jwt = self
            .encryption
            .decrypt(sealed)
            .map_err(|e| StorageError::Decode(e.to_string()))?;

        let decoded = decode::<SealedClaims<T>>(
            &jwt,
            &DecodingKey::from_secret(&self.signing_key),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| StorageError::Decode(format!("jwt verification failed: {}", e)))?;

        Ok(decoded.claims.data)
    }

    fn cookie(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::seconds(max_age.num_seconds()))
            .build()
    }
}

/// Cookie-backed store for a single request.
///
/// Writes are collected in the jar and sent back through
/// [`TokenStore::write_cookies`].
pub struct CookieTokenStore {
    sealer: Arc<CookieSealer>,
    jar: Mutex<CookieJar>,
}

impl CookieTokenStore {
    pub fn new(sealer: Arc<CookieSealer>, jar: CookieJar) -> Self {
        Self {
            sealer,
            jar: Mutex::new(jar),
        }
    }

    fn current(&self) -> CookieJar {
        self.jar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn update(&self, apply: impl FnOnce(CookieJar) -> CookieJar) {
        let mut jar = self.jar.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *jar = apply(jar.clone());
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StorageError> {
        match self.current().get(name) {
            Some(cookie) => self.sealer.open(cookie.value()).map(Some),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(
        &self,
        name: &'static str,
        data: &T,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        let sealed = self.sealer.seal(data, ttl)?;
        let cookie = self.sealer.cookie(name, sealed, ttl);
        self.update(|jar| jar.add(cookie));
        debug!(cookie = name, "Encrypted cookie written");
        Ok(())
    }

    fn remove(&self, name: &'static str) {
        self.update(|jar| jar.remove(Cookie::build(name).path("/").build()));
    }
}

#[async_trait]
impl TokenStore for CookieTokenStore {
    fn backend_name(&self) -> &'static str {
        "cookie"
    }

    async fn read_tokens(&self) -> Result<Option<OAuthTokens>, StorageError> {
        self.read(TOKENS_COOKIE)
    }

    async fn write_tokens(&self, tokens: &OAuthTokens) -> Result<(), StorageError> {
        self.write(TOKENS_COOKIE, tokens, Duration::days(TOKENS_MAX_AGE_DAYS))
    }

    async fn delete_tokens(&self) -> Result<(), StorageError> {
        self.remove(TOKENS_COOKIE);
        Ok(())
    }

    async fn read_state(&self) -> Result<Option<OAuthState>, StorageError> {
        self.read(STATE_COOKIE)
    }

    async fn write_state(&self, state: &OAuthState) -> Result<(), StorageError> {
        self.write(STATE_COOKIE, state, Duration::minutes(STATE_MAX_AGE_MINUTES))
    }

    async fn delete_state(&self) -> Result<(), StorageError> {
        self.remove(STATE_COOKIE);
        Ok(())
    }

    fn write_cookies(&self, _jar: CookieJar) -> CookieJar {
        self.current()
    }
}
