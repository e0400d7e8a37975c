//! Token issue/verify and credential digests.
//!
//! Bearer tokens are HS256 JWTs whose subject is the underwriter's email.
//! Credentials are stored as salted SHA-256 digests; raw passwords never
//! leave this module's call stack.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use credo_core::error::{CredoError, Result};
use credo_core::session::{Principal, TokenVerifier};
use credo_core::underwriter::CredentialDigest;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Issues and verifies the session tokens for this deployment.
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl_minutes: i64,
}

impl AuthKeys {
    pub fn new(secret: &str, token_ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl_minutes,
        }
    }

    /// Issues a bearer token for the given subject.
    pub fn issue(&self, subject: &str) -> Result<String> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (Utc::now() + chrono::Duration::minutes(self.token_ttl_minutes)).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|err| CredoError::internal(format!("token encoding failed: {err}")))
    }

    fn decode(&self, token: &str) -> Option<Principal> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default()).ok()?;
        Some(Principal {
            subject: data.claims.sub,
        })
    }
}

#[async_trait::async_trait]
impl TokenVerifier for AuthKeys {
    async fn verify(&self, token: &str) -> Option<Principal> {
        self.decode(token)
    }
}

/// Digests a credential with a fresh random salt.
pub fn hash_credential(password: &str) -> CredentialDigest {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = hex_string(&salt_bytes);
    CredentialDigest {
        digest: digest_with_salt(password, &salt),
        salt,
    }
}

/// Recomputes the digest and compares against the stored value.
pub fn verify_credential(password: &str, credential: &CredentialDigest) -> bool {
    digest_with_salt(password, &credential.salt) == credential.digest
}

fn digest_with_salt(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex_string(&hasher.finalize())
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_then_verify_roundtrip() {
        let keys = AuthKeys::new("unit-test-secret", 60);
        let token = keys.issue("analyst@example.com").unwrap();

        let principal = keys.verify(&token).await.unwrap();
        assert_eq!(principal.subject, "analyst@example.com");
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let keys = AuthKeys::new("unit-test-secret", 60);
        assert!(keys.verify("not-a-token").await.is_none());
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = AuthKeys::new("secret-a", 60);
        let verifier = AuthKeys::new("secret-b", 60);

        let token = issuer.issue("analyst@example.com").unwrap();
        assert!(verifier.verify(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let keys = AuthKeys::new("unit-test-secret", -5);
        let token = keys.issue("analyst@example.com").unwrap();

        assert!(keys.verify(&token).await.is_none());
    }

    #[test]
    fn test_credential_digest_roundtrip() {
        let credential = hash_credential("hunter2-but-longer");

        assert!(verify_credential("hunter2-but-longer", &credential));
        assert!(!verify_credential("wrong password", &credential));
    }

    #[test]
    fn test_salts_differ_between_hashes() {
        let a = hash_credential("same password");
        let b = hash_credential("same password");

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.digest, b.digest);
    }
}
