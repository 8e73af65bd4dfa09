//! Vault entities: users and their encrypted records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A vault account.
///
/// Ids are assigned by the application layer and are globally stable: the
/// user with id 7 in the local store and the user with id 7 in the remote
/// store are the same logical user. The replication engine relies on this
/// without verifying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable unique id.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Opaque password hash produced by the application layer.
    pub password_hash: String,
    /// Unique email address.
    pub email: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Whether the user has administrative rights.
    pub is_admin: bool,
}

/// An encrypted secret owned by a [`User`].
///
/// `encrypted_content` is an opaque ciphertext blob produced by the external
/// cipher collaborator; this crate never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    /// Stable unique id.
    pub id: i64,
    /// Id of the owning user.
    pub user_id: i64,
    /// Free-form tag, e.g. "password", "note", "credit_card".
    pub data_type: String,
    /// Opaque ciphertext.
    pub encrypted_content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last content change time.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn entities_roundtrip_through_json() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let user = User {
            id: 1,
            username: "alice".into(),
            password_hash: "$2b$12$abc".into(),
            email: "alice@example.com".into(),
            created_at: created,
            is_admin: true,
        };

        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back, user);

        let record = EncryptedRecord {
            id: 10,
            user_id: 1,
            data_type: "note".into(),
            encrypted_content: "gAAAAAB...".into(),
            created_at: created,
            updated_at: created,
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: EncryptedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
