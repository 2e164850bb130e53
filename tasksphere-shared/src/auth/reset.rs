/// Password-reset token generation
///
/// A reset token is 20 random bytes, hex-encoded, handed to the user once.
/// Only its SHA-256 hex digest is stored; a presented token is re-digested
/// and looked up, so a database leak never exposes usable tokens. Tokens
/// expire 15 minutes after issuance.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Token validity window
const RESET_TOKEN_MINUTES: i64 = 15;

/// A freshly generated reset token with its storable digest
#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Hex token to hand to the user (never stored)
    pub token: String,

    /// SHA-256 hex digest to store on the user row
    pub token_hash: String,

    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Generates a new reset token
pub fn generate_reset_token() -> ResetToken {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);

    ResetToken {
        token_hash: hash_reset_token(&token),
        token,
        expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_MINUTES),
    }
}

/// Digests a presented token for database lookup
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reset_token() {
        let reset = generate_reset_token();

        // 20 bytes hex-encoded
        assert_eq!(reset.token.len(), 40);
        // SHA-256 hex digest
        assert_eq!(reset.token_hash.len(), 64);
        assert_eq!(reset.token_hash, hash_reset_token(&reset.token));
        assert!(reset.expires_at > Utc::now());
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a.token, b.token);
        assert_ne!(a.token_hash, b.token_hash);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_reset_token("abc123"), hash_reset_token("abc123"));
        assert_ne!(hash_reset_token("abc123"), hash_reset_token("abc124"));
    }
}
