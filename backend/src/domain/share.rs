//! Public share records.
//!
//! A share maps an opaque token to a root-relative path so that the target
//! can be fetched without a session. Shares are resolved lazily: the record
//! stores only the path, and the target is re-resolved on every public
//! download, so a share whose target has since been deleted simply stops
//! working.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;

use super::auth::UserId;

/// Number of random bytes in a share token before hex encoding.
const TOKEN_BYTES: usize = 24;

/// A persisted share record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    /// Store-assigned identifier.
    pub id: i64,
    /// Root-relative path of the shared entry.
    pub path: String,
    /// The user who created the share.
    pub owner: UserId,
    /// Opaque capability token used in public URLs.
    pub token: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether the share still grants access.
    pub active: bool,
}

/// A share awaiting insertion; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewShare {
    /// Root-relative path of the shared entry.
    pub path: String,
    /// The user creating the share.
    pub owner: UserId,
    /// Pre-generated token.
    pub token: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// How a revocation request identifies the share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareSelector {
    /// Revoke by the public token.
    Token(String),
    /// Revoke by the store-assigned id.
    Id(i64),
}

/// Generate a fresh unguessable share token.
///
/// 24 bytes from the operating system RNG, hex encoded: 48 lowercase hex
/// characters, safe to embed in a URL path segment without escaping.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn tokens_are_hex_of_expected_length() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[rstest]
    fn tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[rstest]
    fn share_serialises_with_camel_case_keys() {
        let share = Share {
            id: 7,
            path: "docs/report.txt".into(),
            owner: UserId::new(3),
            token: "abc123".into(),
            created_at: DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
                .expect("valid timestamp")
                .with_timezone(&Utc),
            active: true,
        };
        let json = serde_json::to_value(&share).expect("serialise");
        assert_eq!(json["path"], "docs/report.txt");
        assert_eq!(json["owner"], 3);
        assert_eq!(json["createdAt"], "2025-06-01T12:00:00Z");
        assert_eq!(json["active"], true);
    }
}
