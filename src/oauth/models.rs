//! OAuth data models

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Scopes requested from the marketplace: read shop info and read listings
pub const REQUIRED_SCOPES: [&str; 2] = ["shops_r", "listings_r"];

/// Authorization state lives for 15 minutes
pub const STATE_MAX_AGE_MINUTES: i64 = 15;

/// Access token lifetime assumed when the provider omits `expires_in`
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Current time at millisecond precision, the resolution records are stored at
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Transient authorization state kept between `/start` and `/callback`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthState {
    pub state: String,
    pub code_verifier: String,
    pub code_challenge: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl OAuthState {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::minutes(STATE_MAX_AGE_MINUTES)
    }
}

/// The single active marketplace credential record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl OAuthTokens {
    /// Expiry is exclusive: a token whose `expires_at` equals `now` is expired
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && now < self.expires_at
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

/// Marketplace user ids prefix every access token as `<digits>.`
pub fn user_id_from_access_token(access_token: &str) -> Option<String> {
    let (prefix, _) = access_token.split_once('.')?;
    if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
        Some(prefix.to_string())
    } else {
        None
    }
}

/// Partial token record merged into whatever is already stored
#[derive(Debug, Clone, Default)]
pub struct TokenUpdate {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub user_id: Option<String>,
    pub scopes: Option<Vec<String>>,
}

impl TokenUpdate {
    /// Update produced by a token endpoint response
    pub fn from_grant(grant: TokenGrant, scopes: Vec<String>) -> Self {
        Self {
            access_token: Some(grant.access_token),
            refresh_token: grant.refresh_token,
            expires_in: Some(grant.expires_in),
            token_type: grant.token_type,
            scopes: Some(scopes),
            ..Default::default()
        }
    }

    /// Merge into `existing`, keeping every field this update leaves out.
    ///
    /// `updated_at` always moves forward, even when two saves land in the
    /// same millisecond.
    pub fn merge(self, existing: Option<OAuthTokens>, now: DateTime<Utc>) -> OAuthTokens {
        let now = now.trunc_subsecs(3);
        let supplied = |value: Option<String>| value.filter(|v| !v.is_empty());

        let access_token = supplied(self.access_token)
            .or_else(|| existing.as_ref().map(|t| t.access_token.clone()))
            .unwrap_or_default();
        let refresh_token = supplied(self.refresh_token)
            .or_else(|| existing.as_ref().map(|t| t.refresh_token.clone()))
            .unwrap_or_default();

        let default_expiry = now + Duration::seconds(DEFAULT_EXPIRES_IN_SECS);
        let expires_at = match (self.expires_at, self.expires_in, existing.as_ref()) {
            (Some(at), _, _) => at.trunc_subsecs(3),
            (None, Some(secs), _) => expiry_after(now, secs).unwrap_or(default_expiry),
            (None, None, Some(prev)) => prev.expires_at,
            (None, None, None) => default_expiry,
        };

        let token_type = supplied(self.token_type)
            .or_else(|| existing.as_ref().map(|t| t.token_type.clone()))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Bearer".to_string());

        let user_id = supplied(self.user_id)
            .or_else(|| existing.as_ref().and_then(|t| t.user_id.clone()))
            .or_else(|| user_id_from_access_token(&access_token));

        let scopes = self
            .scopes
            .or_else(|| existing.as_ref().map(|t| t.scopes.clone()))
            .unwrap_or_default();

        let created_at = existing.as_ref().map(|t| t.created_at).unwrap_or(now);
        let updated_at = match existing.as_ref() {
            Some(prev) if prev.updated_at >= now => prev.updated_at + Duration::milliseconds(1),
            _ => now,
        };

        OAuthTokens {
            access_token,
            refresh_token,
            expires_at,
            token_type,
            user_id,
            scopes,
            created_at,
            updated_at,
        }
    }
}

/// `now + secs`, or `None` when the sum does not fit a timestamp
pub fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|lifetime| now.checked_add_signed(lifetime))
}

/// Token endpoint response (authorization code or refresh grant)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

fn default_expires_in() -> i64 {
    DEFAULT_EXPIRES_IN_SECS
}

impl TokenGrant {
    /// A grant must carry an access token and a lifetime that yields a
    /// representable, future expiry
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), String> {
        if self.access_token.trim().is_empty() {
            return Err("token endpoint returned an empty access_token".to_string());
        }
        if self.expires_in <= 0 || expiry_after(now, self.expires_in).is_none() {
            return Err(format!(
                "token endpoint returned an unusable expires_in of {}",
                self.expires_in
            ));
        }
        Ok(())
    }
}

/// Query parameters the marketplace sends back to the callback
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Response body of `GET /api/admin/oauth/status`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub authenticated: bool,
    pub has_tokens: bool,
    pub token_valid: bool,
    pub has_refresh_token: bool,
    pub user_id: Option<String>,
    pub scopes: Vec<String>,
    pub expires_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl StatusResponse {
    pub fn from_tokens(tokens: Option<&OAuthTokens>, now: DateTime<Utc>) -> Self {
        let token_valid = tokens.map(|t| t.is_valid_at(now)).unwrap_or(false);
        let has_refresh_token = tokens.map(|t| t.has_refresh_token()).unwrap_or(false);

        Self {
            authenticated: tokens.is_some() && (token_valid || has_refresh_token),
            has_tokens: tokens.is_some(),
            token_valid,
            has_refresh_token,
            user_id: tokens.and_then(|t| t.user_id.clone()),
            scopes: tokens.map(|t| t.scopes.clone()).unwrap_or_default(),
            expires_at: tokens.map(|t| t.expires_at.timestamp_millis()),
            updated_at: tokens.map(|t| t.updated_at.timestamp_millis()),
        }
    }
}
