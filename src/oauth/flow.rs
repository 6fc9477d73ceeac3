// Authorization code + PKCE flow against the marketplace token endpoint

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::errors::{CallbackFailure, OAuthError, OAuthErrorKind};
use super::models::{now_millis, CallbackParams, OAuthState, OAuthTokens, TokenGrant, TokenUpdate};
use super::pkce::{generate_pkce, generate_state, CHALLENGE_METHOD};
use crate::common::config::MarketplaceConfig;
use crate::common::helpers::safe_token_log;
use crate::storage::{TokenRefresher, TokenStore};

/// A freshly started authorization attempt
#[derive(Debug, Clone)]
pub struct Authorization {
    pub state: OAuthState,
    pub url: String,
}

#[derive(Clone)]
pub struct OAuthService {
    client: Client,
    config: Arc<MarketplaceConfig>,
}

impl OAuthService {
    pub fn new(config: Arc<MarketplaceConfig>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    /// The API key doubles as the OAuth client id
    fn client_id(&self) -> Result<&str, OAuthError> {
        self.config.api_key.as_deref().ok_or(OAuthError::NotConfigured)
    }

    /// Generate state and PKCE for a new attempt and build the consent URL.
    ///
    /// The caller persists `state` before redirecting.
    pub fn begin_authorization(&self) -> Result<Authorization, OAuthError> {
        let client_id = self.client_id()?;
        let pkce = generate_pkce();

        let state = OAuthState {
            state: generate_state(),
            code_verifier: pkce.verifier,
            code_challenge: pkce.challenge,
            redirect_uri: self.config.redirect_uri.clone(),
            scopes: self.config.scopes.clone(),
            created_at: now_millis(),
        };
        let url = self.authorization_url(client_id, &state);

        Ok(Authorization { state, url })
    }

    pub fn authorization_url(&self, client_id: &str, state: &OAuthState) -> String {
        let scope = state.scopes.join(" ");
        let params = [
            ("response_type", "code"),
            ("client_id", client_id),
            ("redirect_uri", state.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state.state.as_str()),
            ("code_challenge", state.code_challenge.as_str()),
            ("code_challenge_method", CHALLENGE_METHOD),
        ];

        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.config.oauth_url, query)
    }

    /// Exchange an authorization code for tokens. Single attempt, no retry.
    pub async fn exchange_code(
        &self,
        code: &str,
        oauth_state: &OAuthState,
    ) -> Result<TokenGrant, OAuthError> {
        let client_id = self.client_id()?;
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", client_id),
            ("code", code),
            ("redirect_uri", oauth_state.redirect_uri.as_str()),
            ("code_verifier", oauth_state.code_verifier.as_str()),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token exchange failed");
            return Err(OAuthError::ExchangeFailed {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let grant = response
            .json::<TokenGrant>()
            .await
            .map_err(|e| OAuthError::SerializationError(e.to_string()))?;
        grant.check(now_millis()).map_err(OAuthError::InvalidGrant)?;

        info!(
            access_token = %safe_token_log(&grant.access_token),
            expires_in = grant.expires_in,
            "Exchanged authorization code for tokens"
        );
        Ok(grant)
    }

    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, OAuthError> {
        if refresh_token.is_empty() {
            return Err(OAuthError::NoRefreshToken);
        }
        let client_id = self.client_id()?;
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token refresh failed");
            return Err(OAuthError::RefreshFailed {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let grant = response
            .json::<TokenGrant>()
            .await
            .map_err(|e| OAuthError::SerializationError(e.to_string()))?;
        grant.check(now_millis()).map_err(OAuthError::InvalidGrant)?;

        info!("Access token refreshed");
        Ok(grant)
    }

    /// Drive a callback to completion.
    ///
    /// Every outcome clears the stored state, so a pending attempt is
    /// consumed by the first callback that reaches it.
    pub async fn handle_callback(
        &self,
        store: &dyn TokenStore,
        params: CallbackParams,
    ) -> Result<OAuthTokens, CallbackFailure> {
        if let Some(code) = params.error.as_deref().filter(|c| !c.is_empty()) {
            warn!(error = %code, description = ?params.error_description, "Provider returned an OAuth error");
            store.clear_oauth_state().await;
            let kind = OAuthErrorKind::from_code(code);
            let description = params
                .error_description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| code.to_string());
            return Err(CallbackFailure::with_description(kind, description));
        }

        let (code, state_param) = match (
            params.code.filter(|c| !c.is_empty()),
            params.state.filter(|s| !s.is_empty()),
        ) {
            (Some(code), Some(state)) => (code, state),
            (code, state) => {
                warn!(code = code.is_some(), state = state.is_some(), "Missing OAuth parameters");
                store.clear_oauth_state().await;
                return Err(CallbackFailure::new(OAuthErrorKind::MissingParameters));
            }
        };

        let oauth_state = match store.load_and_validate_oauth_state(&state_param).await {
            Some(oauth_state) => oauth_state,
            None => {
                store.clear_oauth_state().await;
                return Err(CallbackFailure::new(OAuthErrorKind::InvalidState));
            }
        };

        let grant = match self.exchange_code(&code, &oauth_state).await {
            Ok(grant) => grant,
            Err(e) => {
                store.clear_oauth_state().await;
                return Err(CallbackFailure::with_description(
                    OAuthErrorKind::TokenExchangeFailed,
                    e.to_string(),
                ));
            }
        };

        let saved = store
            .save_tokens(TokenUpdate::from_grant(grant, oauth_state.scopes))
            .await;
        store.clear_oauth_state().await;

        match saved {
            Ok(tokens) => {
                info!(user_id = ?tokens.user_id, "OAuth flow completed");
                Ok(tokens)
            }
            Err(e) => {
                error!(error = %e, "Failed to store exchanged tokens");
                Err(CallbackFailure::with_description(
                    OAuthErrorKind::TokenExchangeFailed,
                    e.to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl TokenRefresher for OAuthService {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, OAuthError> {
        self.refresh_access_token(refresh_token).await
    }
}
