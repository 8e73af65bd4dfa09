//! Snapshot document types and on-disk naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vault_store::{EncryptedRecord, User};

/// Raw store file copy inside a snapshot.
pub(crate) const DB_FILE: &str = "database.db";
/// Serialized Users collection.
pub(crate) const USERS_FILE: &str = "users.json";
/// Serialized EncryptedRecords collection.
pub(crate) const RECORDS_FILE: &str = "encrypted_data.json";
/// Snapshot metadata document.
pub(crate) const METADATA_FILE: &str = "metadata.json";

const DIR_PREFIX: &str = "backup_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Renders the compact snapshot timestamp (`YYYYMMDD_HHMMSS`).
pub(crate) fn timestamp_string(stamp: DateTime<Utc>) -> String {
    stamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Renders the snapshot directory name for a timestamp.
pub(crate) fn dir_name(stamp: DateTime<Utc>) -> String {
    format!("{DIR_PREFIX}{}", timestamp_string(stamp))
}

/// ISO-8601 (de)serialization for document timestamps.
///
/// Serializes as `2024-03-01T12:00:00.000000`; parsing also accepts an
/// RFC 3339 offset suffix and missing fractional seconds.
mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
    const LENIENT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(stamp: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&stamp.naive_utc().format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(d)?;
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, LENIENT_FORMAT) {
            return Ok(naive.and_utc());
        }
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// One user as exported to `users.json`.
///
/// The export format predates the admin flag and does not carry it; a
/// restored user is never an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserDoc {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDoc {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

impl UserDoc {
    pub(crate) fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            email: self.email,
            created_at: self.created_at,
            is_admin: false,
        }
    }
}

/// One encrypted record as exported to `encrypted_data.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RecordDoc {
    pub id: i64,
    pub user_id: i64,
    pub data_type: String,
    pub encrypted_content: String,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub updated_at: DateTime<Utc>,
}

impl From<&EncryptedRecord> for RecordDoc {
    fn from(record: &EncryptedRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            data_type: record.data_type.clone(),
            encrypted_content: record.encrypted_content.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl RecordDoc {
    pub(crate) fn into_record(self) -> EncryptedRecord {
        EncryptedRecord {
            id: self.id,
            user_id: self.user_id,
            data_type: self.data_type,
            encrypted_content: self.encrypted_content,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Per-collection item counts recorded in `metadata.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounts {
    /// Number of users in the snapshot.
    pub users: usize,
    /// Number of encrypted records in the snapshot.
    pub encrypted_data: usize,
}

/// The `metadata.json` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Compact snapshot timestamp (`YYYYMMDD_HHMMSS`), matching the
    /// directory name suffix.
    pub timestamp: String,
    /// Locator of the store the snapshot was taken from - not necessarily
    /// the store it is restored into.
    pub database_url: String,
    /// Always `"full"`.
    pub backup_type: String,
    /// Item counts per collection.
    pub items: ItemCounts,
}

/// A snapshot as returned by `list_backups`, most recent first.
#[derive(Debug, Clone)]
pub struct BackupInfo {
    /// Snapshot directory.
    pub path: PathBuf,
    /// Compact snapshot timestamp.
    pub timestamp: String,
    /// Item counts per collection.
    pub items: ItemCounts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn directory_name_uses_compact_timestamp() {
        let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 34, 56).unwrap();
        assert_eq!(timestamp_string(stamp), "20240301_123456");
        assert_eq!(dir_name(stamp), "backup_20240301_123456");
    }

    #[test]
    fn user_doc_drops_admin_flag() {
        let user = User {
            id: 1,
            username: "root".into(),
            password_hash: "hash".into(),
            email: "root@example.com".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            is_admin: true,
        };

        let doc = UserDoc::from(&user);
        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("is_admin"));

        let restored: UserDoc = serde_json::from_str(&json).unwrap();
        assert!(!restored.into_user().is_admin);
    }

    #[test]
    fn document_timestamps_are_iso8601() {
        let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let doc = UserDoc {
            id: 1,
            username: "a".into(),
            password_hash: "h".into(),
            email: "a@x".into(),
            created_at: stamp,
        };

        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"2024-03-01T12:00:00.000000\""));
    }

    #[test]
    fn timestamp_parsing_is_lenient() {
        for text in [
            "\"2024-03-01T12:00:00.000000\"",
            "\"2024-03-01T12:00:00\"",
            "\"2024-03-01T12:00:00Z\"",
            "\"2024-03-01T12:00:00+00:00\"",
        ] {
            let json = format!(
                "{{\"id\":1,\"username\":\"a\",\"password_hash\":\"h\",\"email\":\"a@x\",\"created_at\":{text}}}"
            );
            let doc: UserDoc = serde_json::from_str(&json).unwrap();
            assert_eq!(
                doc.created_at,
                Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                "failed for {text}"
            );
        }
    }
}
