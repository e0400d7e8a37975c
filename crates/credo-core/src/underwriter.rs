//! Underwriter identity entity and repository port.
//!
//! The core never sees raw credentials: callers hash before storing, and
//! verification happens against the stored digest in the auth layer.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Salted digest of a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDigest {
    pub digest: String,
    pub salt: String,
}

/// A registered credit underwriter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Underwriter {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub credential: CredentialDigest,
    pub security_question: String,
    pub security_answer: String,
}

/// Fields supplied at signup, with the credential already digested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUnderwriter {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub credential: CredentialDigest,
    pub security_question: String,
    pub security_answer: String,
}

/// Persistence port for underwriter identities.
#[async_trait::async_trait]
pub trait UnderwriterRepository: Send + Sync {
    /// Registers a new underwriter and assigns an id.
    ///
    /// # Errors
    ///
    /// `Auth` when the email is already registered.
    async fn create(&self, new: NewUnderwriter) -> Result<Underwriter>;

    /// Looks an underwriter up by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Underwriter>>;

    /// Replaces the stored credential digest.
    ///
    /// # Errors
    ///
    /// `NotFound` when no underwriter has the given email.
    async fn update_credential(&self, email: &str, credential: CredentialDigest) -> Result<()>;
}
