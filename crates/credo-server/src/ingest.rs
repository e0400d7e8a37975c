//! Document-bundle ingestion.
//!
//! Members of an uploaded bundle are validated against the MIME allow-list
//! and written to an object-store directory under fresh UUID keys. Archive
//! expansion happens upstream; this module only sees extracted members, and
//! nothing downstream ever inspects the stored bytes. Documents reach the
//! model as opaque context assembled elsewhere.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use credo_core::error::{CredoError, Result};

/// MIME types accepted into the document store.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "image/jpeg",
    "image/png",
    "text/plain",
];

/// A stored bundle member.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredDocument {
    /// Name the member carried inside the bundle.
    pub original_name: String,
    /// Object key in the store.
    pub key: String,
}

/// UUID-keyed object-store directory for uploaded documents.
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Checks a member name against the MIME allow-list.
    pub fn is_allowed(name: &str) -> bool {
        let mime = mime_guess::from_path(name).first_or_octet_stream();
        ALLOWED_MIME_TYPES.contains(&mime.essence_str())
    }

    /// Stores one member under a fresh UUID key, keeping its extension.
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredDocument> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let key = format!("{}{extension}", Uuid::new_v4());

        tokio::fs::write(self.root.join(&key), bytes).await?;
        info!(original = %original_name, key = %key, "stored document");
        Ok(StoredDocument {
            original_name: original_name.to_string(),
            key,
        })
    }

    /// Stores every allowed member of a bundle, skipping rejected ones with
    /// a warning.
    ///
    /// # Errors
    ///
    /// `Validation` when no member passes the allow-list.
    pub async fn store_bundle(&self, members: Vec<(String, Vec<u8>)>) -> Result<Vec<StoredDocument>> {
        let mut stored = Vec::new();
        for (name, bytes) in members {
            if !Self::is_allowed(&name) {
                warn!(member = %name, "skipping member with disallowed file type");
                continue;
            }
            stored.push(self.store(&name, &bytes).await?);
        }

        if stored.is_empty() {
            return Err(CredoError::validation(
                "no valid files found in the uploaded bundle",
            ));
        }
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_by_member_name() {
        assert!(DocumentStore::is_allowed("bank-statement.pdf"));
        assert!(DocumentStore::is_allowed("financials.xlsx"));
        assert!(DocumentStore::is_allowed("kyc.png"));
        assert!(DocumentStore::is_allowed("notes.txt"));
        assert!(!DocumentStore::is_allowed("malware.exe"));
        assert!(!DocumentStore::is_allowed("archive.zip"));
        assert!(!DocumentStore::is_allowed("no-extension"));
    }

    #[tokio::test]
    async fn test_store_keeps_extension_and_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();

        let stored = store.store("itr.pdf", b"%PDF-1.7").await.unwrap();

        assert!(stored.key.ends_with(".pdf"));
        let written = std::fs::read(dir.path().join(&stored.key)).unwrap();
        assert_eq!(written, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_bundle_skips_rejected_members() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();

        let stored = store
            .store_bundle(vec![
                ("statement.pdf".to_string(), b"%PDF".to_vec()),
                ("virus.exe".to_string(), b"MZ".to_vec()),
            ])
            .await
            .unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].original_name, "statement.pdf");
    }

    #[tokio::test]
    async fn test_bundle_with_no_valid_members_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();

        let err = store
            .store_bundle(vec![("virus.exe".to_string(), b"MZ".to_vec())])
            .await
            .unwrap_err();

        assert!(err.is_validation());
    }
}
