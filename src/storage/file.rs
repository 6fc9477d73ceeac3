// Token storage on local disk, one pretty-printed JSON file per record

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::{StorageError, TokenStore};
use crate::oauth::models::{OAuthState, OAuthTokens};

pub const TOKENS_FILE: &str = ".oauth-tokens.json";
pub const STATE_FILE: &str = ".oauth-state.json";

/// Suitable only for a single long-running instance with a writable disk.
pub struct FileTokenStore {
    tokens_path: PathBuf,
    state_path: PathBuf,
}

impl FileTokenStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            tokens_path: data_dir.join(TOKENS_FILE),
            state_path: data_dir.join(STATE_FILE),
        }
    }

    /// Create the data directory if needed and make sure it is not read-only
    pub async fn check_data_dir(&self) -> Result<(), StorageError> {
        let dir = match self.tokens_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).await?;
        let metadata = fs::metadata(dir).await?;
        if metadata.permissions().readonly() {
            return Err(StorageError::Backend(format!(
                "{} is read-only",
                dir.display()
            )));
        }
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // a cleared record is written as `{}`
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "{}" {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(trimmed)?))
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string_pretty(value)?;
        fs::write(path, body).await?;
        debug!(path = %path.display(), "Wrote OAuth record");
        Ok(())
    }

    async fn clear(path: &Path) -> Result<(), StorageError> {
        match fs::metadata(path).await {
            Ok(_) => {
                fs::write(path, "{}").await?;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn read_tokens(&self) -> Result<Option<OAuthTokens>, StorageError> {
        Self::read_json(&self.tokens_path).await
    }

    async fn write_tokens(&self, tokens: &OAuthTokens) -> Result<(), StorageError> {
        Self::write_json(&self.tokens_path, tokens).await
    }

    async fn delete_tokens(&self) -> Result<(), StorageError> {
        Self::clear(&self.tokens_path).await
    }

    async fn read_state(&self) -> Result<Option<OAuthState>, StorageError> {
        Self::read_json(&self.state_path).await
    }

    async fn write_state(&self, state: &OAuthState) -> Result<(), StorageError> {
        Self::write_json(&self.state_path, state).await
    }

    async fn delete_state(&self) -> Result<(), StorageError> {
        Self::clear(&self.state_path).await
    }
}
