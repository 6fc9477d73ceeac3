//! Key-value backend speaking the Upstash-compatible Redis REST protocol.
//!
//! Every command is a `POST` to the base URL whose body is the command as a
//! JSON array, e.g. `["SETEX", "key", 900, "value"]`. Replies are either
//! `{"result": ...}` or `{"error": "..."}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use super::{StorageError, TokenStore};
use crate::oauth::models::{OAuthState, OAuthTokens, STATE_MAX_AGE_MINUTES};

pub const TOKENS_KEY: &str = "lanina:oauth:tokens";
pub const STATE_KEY: &str = "lanina:oauth:state";

const TOKENS_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const STATE_TTL_SECS: i64 = STATE_MAX_AGE_MINUTES * 60;
const PING_KEY: &str = "lanina:storage:ping";

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

pub struct KvTokenStore {
    http: Client,
    base_url: String,
    token: String,
}

impl KvTokenStore {
    pub fn new(http: Client, base_url: &str, token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn command(&self, args: Value) -> Result<Value, StorageError> {
        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("kv request failed: {}", e)))?;

        let status = response.status();
        let reply: CommandReply = response
            .json()
            .await
            .map_err(|e| StorageError::Backend(format!("kv reply unreadable (HTTP {}): {}", status, e)))?;

        if let Some(message) = reply.error {
            error!(status = %status, error = %message, "KV command rejected");
            return Err(StorageError::Backend(message));
        }
        if !status.is_success() {
            return Err(StorageError::Backend(format!("kv returned HTTP {}", status)));
        }

        Ok(reply.result.unwrap_or(Value::Null))
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.command(json!(["GET", key])).await? {
            Value::Null => Ok(None),
            Value::String(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            other => Ok(Some(serde_json::from_value(other)?)),
        }
    }

    async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: i64,
    ) -> Result<(), StorageError> {
        let body = serde_json::to_string(value)?;
        self.command(json!(["SETEX", key, ttl_secs, body])).await?;
        debug!(key = key, ttl_secs = ttl_secs, "KV record written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.command(json!(["DEL", key])).await?;
        Ok(())
    }

    /// Write, read back and delete a throwaway key
    pub async fn ping(&self) -> Result<(), StorageError> {
        let sample = json!({ "ok": true });
        self.set_with_ttl(PING_KEY, &sample, 60).await?;
        let read: Option<Value> = self.get(PING_KEY).await?;
        self.delete(PING_KEY).await?;

        if read.as_ref() == Some(&sample) {
            Ok(())
        } else {
            Err(StorageError::Backend(format!(
                "health value did not round-trip, read back {:?}",
                read
            )))
        }
    }
}

#[async_trait]
impl TokenStore for KvTokenStore {
    fn backend_name(&self) -> &'static str {
        "kv"
    }

    async fn read_tokens(&self) -> Result<Option<OAuthTokens>, StorageError> {
        self.get(TOKENS_KEY).await
    }

    async fn write_tokens(&self, tokens: &OAuthTokens) -> Result<(), StorageError> {
        self.set_with_ttl(TOKENS_KEY, tokens, TOKENS_TTL_SECS).await
    }

    async fn delete_tokens(&self) -> Result<(), StorageError> {
        self.delete(TOKENS_KEY).await
    }

    async fn read_state(&self) -> Result<Option<OAuthState>, StorageError> {
        self.get(STATE_KEY).await
    }

    async fn write_state(&self, state: &OAuthState) -> Result<(), StorageError> {
        self.set_with_ttl(STATE_KEY, state, STATE_TTL_SECS).await
    }

    async fn delete_state(&self) -> Result<(), StorageError> {
        self.delete(STATE_KEY).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::models::TokenUpdate;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_tokens_stored_with_seven_day_ttl() {
        let (server, fake) = fake::start("kv-token").await;
        let store = KvTokenStore::new(Client::new(), &server.uri(), "kv-token");

        let saved = store
            .save_tokens(TokenUpdate {
                access_token: Some("12345678.abc".into()),
                refresh_token: Some("r".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        {
            let entries = fake.entries.lock().unwrap();
            let (_, ttl) = entries.get(TOKENS_KEY).unwrap();
            assert_eq!(*ttl, 604_800);
        }
        assert_eq!(store.load_tokens().await, Some(saved));
    }

    #[tokio::test]
    async fn test_state_ttl_and_delete() {
        let (server, fake) = fake::start("kv-token").await;
        let store = KvTokenStore::new(Client::new(), &server.uri(), "kv-token");

        let state = OAuthState {
            state: "s".into(),
            code_verifier: "v".into(),
            code_challenge: "c".into(),
            redirect_uri: "http://site/api/admin/oauth/callback".into(),
            scopes: vec!["shops_r".into()],
            created_at: crate::oauth::models::now_millis(),
        };
        store.save_oauth_state(&state).await.unwrap();
        assert_eq!(fake.entries.lock().unwrap().get(STATE_KEY).unwrap().1, 900);

        store.clear_oauth_state().await;
        assert!(fake.entries.lock().unwrap().get(STATE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_wrong_token_is_treated_as_absent() {
        let (server, _fake) = fake::start("kv-token").await;
        let store = KvTokenStore::new(Client::new(), &server.uri(), "wrong");

        assert!(store.read_tokens().await.is_err());
        assert!(store.load_tokens().await.is_none());
    }

    #[tokio::test]
    async fn test_error_reply_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "ERR wrong number of arguments"})),
            )
            .mount(&server)
            .await;

        let store = KvTokenStore::new(Client::new(), &server.uri(), "t");
        match store.read_tokens().await {
            Err(StorageError::Backend(message)) => assert!(message.contains("wrong number")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_ping() {
        let (server, fake) = fake::start("kv-token").await;
        let store = KvTokenStore::new(Client::new(), &server.uri(), "kv-token");

        store.ping().await.unwrap();
        assert!(fake.entries.lock().unwrap().is_empty());
    }
}
