//! Single-slot token store
//!
//! Persists the current brokerage access token as one JSON record at a fixed
//! path. Reads are self-expiring: a record whose decoded expiry is not
//! strictly in the future is deleted on load and reported as absent, so a
//! caller can never observe an expired token as valid.
//!
//! The file is shared mutable state for the whole process (one token per
//! server, not per session). Writes are plain overwrites with no lock file or
//! atomic rename; concurrent logins race last-writer-wins. That matches the
//! single-operator deployment this targets.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::models::{TokenPayload, TokenRecord};

/// Error type for token store operations
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("Failed to write token file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to delete token file '{path}': {source}")]
    Delete {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize token record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable single-record storage for the brokerage access token
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a freshly issued token, stamping `created_at` with the
    /// current instant. Any prior record is fully replaced.
    ///
    /// I/O errors propagate: the caller must treat them as fatal for the
    /// login attempt.
    pub fn save(&self, payload: TokenPayload) -> Result<TokenRecord, TokenStoreError> {
        let record = TokenRecord::from_payload(payload, Utc::now());
        let json = serde_json::to_string_pretty(&record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| TokenStoreError::Write {
                    path: self.path.display().to_string(),
                    source: e,
                })?;
            }
        }

        std::fs::write(&self.path, json).map_err(|e| TokenStoreError::Write {
            path: self.path.display().to_string(),
            source: e,
        })?;

        tracing::info!(path = %self.path.display(), "access token saved");
        Ok(record)
    }

    /// Read the stored record, if a valid one exists.
    ///
    /// Not a pure read: a record whose expiry is malformed or not strictly
    /// after now is deleted as a side effect. A missing file or corrupt JSON
    /// reads as absence, never as an error.
    pub fn load(&self) -> Option<TokenRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read token file");
                return None;
            }
        };

        let record: TokenRecord = match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "token file is corrupt, treating as absent");
                return None;
            }
        };

        if !record.is_valid_at(Utc::now()) {
            tracing::info!(
                expires_dt = %record.expires_dt,
                "stored token is expired or has a malformed expiry, deleting"
            );
            self.remove_best_effort();
            return None;
        }

        Some(record)
    }

    /// Remove the token file. Absent file is a no-op, not an error.
    pub fn delete(&self) -> Result<(), TokenStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "token file deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TokenStoreError::Delete {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }

    /// The currently valid bearer string, if any
    pub fn get_valid_token(&self) -> Option<String> {
        self.load().map(|record| record.token)
    }

    fn remove_best_effort(&self) {
        if let Err(e) = self.delete() {
            tracing::warn!(error = %e, "failed to delete stale token file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EXPIRES_DT_FORMAT;
    use chrono::Duration;
    use tempfile::TempDir;

    fn store() -> (TempDir, TokenStore) {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        (dir, store)
    }

    fn payload(expires_dt: &str) -> TokenPayload {
        TokenPayload {
            token: "abc".to_string(),
            expires_dt: expires_dt.to_string(),
            token_type: "bearer".to_string(),
            return_code: Some(0),
            return_msg: Some("ok".to_string()),
        }
    }

    fn future_expiry() -> String {
        (Utc::now() + Duration::hours(6))
            .format(EXPIRES_DT_FORMAT)
            .to_string()
    }

    fn past_expiry() -> String {
        (Utc::now() - Duration::seconds(1))
            .format(EXPIRES_DT_FORMAT)
            .to_string()
    }

    #[test]
    fn test_load_absent_returns_none() {
        let (_dir, store) = store();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let (_dir, store) = store();
        let saved = store.save(payload(&future_expiry())).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_save_overwrites_prior_record() {
        let (_dir, store) = store();
        store.save(payload(&future_expiry())).unwrap();

        let mut replacement = payload(&future_expiry());
        replacement.token = "replacement".to_string();
        store.save(replacement).unwrap();

        assert_eq!(store.load().unwrap().token, "replacement");
    }

    #[test]
    fn test_expired_record_is_deleted_on_load() {
        let (_dir, store) = store();
        store.save(payload(&past_expiry())).unwrap();

        assert!(store.load().is_none());
        assert!(!store.path().exists());
        // Second load is also absent, without error
        assert!(store.load().is_none());
    }

    #[test]
    fn test_boundary_expiry_is_treated_as_expired() {
        let (_dir, store) = store();
        let now = Utc::now().format(EXPIRES_DT_FORMAT).to_string();
        store.save(payload(&now)).unwrap();

        assert!(store.load().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_malformed_expiry_is_deleted_on_load() {
        let (_dir, store) = store();
        store.save(payload("not-a-date")).unwrap();

        assert!(store.load().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_json_reads_as_absent() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "{ this is not json").unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn test_old_schema_file_still_loads() {
        let (_dir, store) = store();
        let json = format!(
            r#"{{"token":"old","expires_dt":"{}","token_type":"bearer","created_at":"2025-01-01T00:00:00Z"}}"#,
            future_expiry()
        );
        std::fs::write(store.path(), json).unwrap();

        let record = store.load().unwrap();
        assert_eq!(record.token, "old");
        assert_eq!(record.return_code, None);
        assert_eq!(record.return_msg, None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, store) = store();
        store.save(payload(&future_expiry())).unwrap();

        store.delete().unwrap();
        assert!(!store.path().exists());
        // Deleting again is a no-op
        store.delete().unwrap();
    }

    #[test]
    fn test_get_valid_token_projects_bearer_string() {
        let (_dir, store) = store();
        assert_eq!(store.get_valid_token(), None);

        store.save(payload(&future_expiry())).unwrap();
        assert_eq!(store.get_valid_token(), Some("abc".to_string()));

        store.delete().unwrap();
        assert_eq!(store.get_valid_token(), None);
    }

    #[test]
    fn test_far_future_expiry_scenario() {
        let (_dir, store) = store();
        store.save(payload("20991231235959")).unwrap();

        let record = store.load().unwrap();
        let expires_at = record.expires_at().unwrap();
        assert_eq!(expires_at.to_rfc3339(), "2099-12-31T23:59:59+00:00");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::models::EXPIRES_DT_FORMAT;
    use chrono::Duration;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn payload(token: String, expires_dt: String) -> TokenPayload {
        TokenPayload {
            token,
            expires_dt,
            token_type: "bearer".to_string(),
            return_code: Some(0),
            return_msg: None,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Any record with a future expiry round-trips through save/load.
        #[test]
        fn property_future_expiry_round_trips(
            token in "[A-Za-z0-9]{8,64}",
            offset_secs in 60i64..86_400 * 365,
        ) {
            let dir = TempDir::new().unwrap();
            let store = TokenStore::new(dir.path().join("token.json"));
            let expires_dt = (Utc::now() + Duration::seconds(offset_secs))
                .format(EXPIRES_DT_FORMAT)
                .to_string();

            let saved = store.save(payload(token, expires_dt)).unwrap();
            let loaded = store.load();
            prop_assert_eq!(loaded, Some(saved));
        }

        /// Any record with a past-or-now expiry reads as absent and the file
        /// is gone afterward.
        #[test]
        fn property_stale_expiry_self_heals(
            token in "[A-Za-z0-9]{8,64}",
            offset_secs in 0i64..86_400 * 30,
        ) {
            let dir = TempDir::new().unwrap();
            let store = TokenStore::new(dir.path().join("token.json"));
            let expires_dt = (Utc::now() - Duration::seconds(offset_secs))
                .format(EXPIRES_DT_FORMAT)
                .to_string();

            store.save(payload(token, expires_dt)).unwrap();
            prop_assert!(store.load().is_none());
            prop_assert!(!store.path().exists());
        }

        /// Any non-decodable expiry string behaves like an expired record.
        #[test]
        fn property_malformed_expiry_self_heals(expires_dt in "[a-z :/-]{0,20}") {
            let dir = TempDir::new().unwrap();
            let store = TokenStore::new(dir.path().join("token.json"));

            store.save(payload("tok".to_string(), expires_dt)).unwrap();
            prop_assert!(store.load().is_none());
            prop_assert!(!store.path().exists());
        }

        /// get_valid_token returns the token string iff load returns a record.
        #[test]
        fn property_get_valid_token_matches_load(
            token in "[A-Za-z0-9]{8,64}",
            future in prop::bool::ANY,
        ) {
            let dir = TempDir::new().unwrap();
            let store = TokenStore::new(dir.path().join("token.json"));
            let offset = if future { Duration::hours(1) } else { Duration::hours(-1) };
            let expires_dt = (Utc::now() + offset).format(EXPIRES_DT_FORMAT).to_string();

            store.save(payload(token.clone(), expires_dt)).unwrap();
            let expected = if future { Some(token) } else { None };
            prop_assert_eq!(store.get_valid_token(), expected);
        }
    }
}
