//! Access token model
//!
//! The Kiwoom OAuth endpoint issues a bearer token with an expiry in the
//! fixed-width `YYYYMMDDHHmmss` format. The record persisted to disk keeps
//! that raw string and decodes it on every read.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed-width date-time format used by the Kiwoom API for `expires_dt`.
pub const EXPIRES_DT_FORMAT: &str = "%Y%m%d%H%M%S";

/// Token payload as returned by a successful issuance call, before the
/// store stamps `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Opaque bearer credential
    pub token: String,
    /// Expiry in `YYYYMMDDHHmmss`
    pub expires_dt: String,
    /// Token type passthrough (e.g. "bearer")
    pub token_type: String,
    /// Application-level return code from the issuing call.
    /// Absent in the first schema revision of stored files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i64>,
    /// Application-level return message from the issuing call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_msg: Option<String>,
}

/// The persisted token record. At most one exists at any time: the store is
/// a single slot, not a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    pub expires_dt: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_msg: Option<String>,
    /// Stamped locally at write time, not supplied by the external service
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Build a record from an issuance payload, stamping `created_at` now.
    pub fn from_payload(payload: TokenPayload, created_at: DateTime<Utc>) -> Self {
        Self {
            token: payload.token,
            expires_dt: payload.expires_dt,
            token_type: payload.token_type,
            return_code: payload.return_code,
            return_msg: payload.return_msg,
            created_at,
        }
    }

    /// Decode `expires_dt` to an absolute instant.
    ///
    /// The format carries no zone marker; it is interpreted as UTC so that
    /// validity comparisons stay internally consistent.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.expires_dt, EXPIRES_DT_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Whether the record is still valid at `now`.
    ///
    /// The boundary instant counts as expired: a token whose expiry equals
    /// `now` must never be observed as valid. A malformed `expires_dt` also
    /// reads as expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => expires_at > now,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(expires_dt: &str) -> TokenRecord {
        TokenRecord {
            token: "abc".to_string(),
            expires_dt: expires_dt.to_string(),
            token_type: "bearer".to_string(),
            return_code: Some(0),
            return_msg: Some("ok".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_expires_at_decodes_fixed_format() {
        let record = record("20991231235959");
        let expected = Utc.with_ymd_and_hms(2099, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(record.expires_at(), Some(expected));
    }

    #[test]
    fn test_expires_at_malformed_is_none() {
        assert_eq!(record("not-a-date").expires_at(), None);
        assert_eq!(record("2099-12-31").expires_at(), None);
        assert_eq!(record("").expires_at(), None);
    }

    #[test]
    fn test_validity_boundary_is_expired() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let record = record("20250601120000");
        assert_eq!(record.expires_at(), Some(now));
        assert!(!record.is_valid_at(now));
        assert!(record.is_valid_at(now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_malformed_expiry_reads_as_expired() {
        assert!(!record("garbage").is_valid_at(Utc::now()));
    }

    #[test]
    fn test_old_schema_without_return_fields_deserializes() {
        // First schema revision lacked return_code/return_msg
        let json = r#"{
            "token": "old-token",
            "expires_dt": "20991231235959",
            "token_type": "bearer",
            "created_at": "2025-01-01T00:00:00Z"
        }"#;
        let record: TokenRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.token, "old-token");
        assert_eq!(record.return_code, None);
        assert_eq!(record.return_msg, None);
    }
}
