//! PKCE (RFC 7636) and CSRF state generation for the marketplace OAuth flow

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Only S256 is ever used
pub const CHALLENGE_METHOD: &str = "S256";

const RANDOM_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct PkcePair {
    /// Kept server-side until the token exchange
    pub verifier: String,
    /// Sent with the authorization request
    pub challenge: String,
}

fn random_url_safe() -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Random single-use state parameter (43 chars, 256 bits of entropy)
pub fn generate_state() -> String {
    random_url_safe()
}

/// `BASE64URL(SHA256(ASCII(verifier)))`
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

pub fn generate_pkce() -> PkcePair {
    let verifier = random_url_safe();
    let challenge = code_challenge(&verifier);
    PkcePair {
        verifier,
        challenge,
    }
}
