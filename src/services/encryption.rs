// src/services/encryption.rs
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Encryption secret not configured")]
    KeyNotConfigured,

    #[error("Invalid encryption key format")]
    InvalidKeyFormat,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid encrypted data format")]
    InvalidDataFormat,
}

pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("cipher", &"<encrypted>")
            .finish()
    }
}

impl EncryptionService {
    /// Derive an AES-256 key from an arbitrary-length secret (SHA-256 of the secret)
    pub fn from_secret(secret: &str) -> Result<Self, EncryptionError> {
        if secret.trim().is_empty() {
            return Err(EncryptionError::KeyNotConfigured);
        }

        let key = Sha256::digest(secret.as_bytes());
        let cipher =
            Aes256Gcm::new_from_slice(&key).map_err(|_| EncryptionError::InvalidKeyFormat)?;

        Ok(Self { cipher })
    }

    /// Generate a new random secret (URL-safe base64 of 32 random bytes)
    pub fn generate_secret() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    /// Encrypt a plaintext string into URL-safe base64 of nonce + ciphertext
    #[allow(deprecated)]
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypt the output of [`EncryptionService::encrypt`]
    #[allow(deprecated)]
    pub fn decrypt(&self, encrypted: &str) -> Result<String, EncryptionError> {
        let combined = BASE64
            .decode(encrypted.as_bytes())
            .map_err(|_| EncryptionError::InvalidDataFormat)?;

        if combined.len() < NONCE_LEN {
            return Err(EncryptionError::InvalidDataFormat);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext_bytes = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext_bytes)
            .map_err(|_| EncryptionError::DecryptionFailed("invalid UTF-8".to_string()))
    }
}
