//! Ports the domain depends on; adapters implement them in `outbound`.

use async_trait::async_trait;
use thiserror::Error;

use super::auth::{Credentials, UserId};
use super::share::{NewShare, Share, ShareSelector};

/// Failures surfaced by an [`IdentityProvider`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The username/password pair did not match a known account.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Registration collided with an existing username.
    #[error("username already taken")]
    UsernameTaken,
    /// The backing store could not be reached.
    #[error("identity store unavailable: {message}")]
    Unavailable {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl IdentityError {
    /// Build an [`IdentityError::Unavailable`] from any displayable cause.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Verifies and registers user accounts.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check credentials and return the account's id.
    async fn authenticate(&self, credentials: &Credentials) -> Result<UserId, IdentityError>;

    /// Create a new account and return its id.
    async fn register(&self, credentials: &Credentials) -> Result<UserId, IdentityError>;
}

/// Failures surfaced by a [`ShareStore`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareStoreError {
    /// A generated token collided with an existing one.
    #[error("share token already exists")]
    DuplicateToken,
    /// The backing store could not be reached.
    #[error("share store unavailable: {message}")]
    Unavailable {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl ShareStoreError {
    /// Build a [`ShareStoreError::Unavailable`] from any displayable cause.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Persists share records.
#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Insert a new share, returning the stored record with its id.
    async fn insert(&self, share: NewShare) -> Result<Share, ShareStoreError>;

    /// Look up a share by token, active or not.
    async fn find_by_token(&self, token: &str) -> Result<Option<Share>, ShareStoreError>;

    /// Deactivate a share owned by `owner`; returns whether a row changed.
    ///
    /// A selector matching another owner's share deactivates nothing.
    async fn deactivate(
        &self,
        selector: &ShareSelector,
        owner: UserId,
    ) -> Result<bool, ShareStoreError>;

    /// All shares created by `owner`, newest first.
    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Share>, ShareStoreError>;
}

impl From<IdentityError> for super::error::Error {
    fn from(error: IdentityError) -> Self {
        match error {
            IdentityError::InvalidCredentials => Self::unauthorized("invalid credentials"),
            IdentityError::UsernameTaken => Self::conflict("username already taken"),
            IdentityError::Unavailable { message } => Self::internal(message),
        }
    }
}

impl From<ShareStoreError> for super::error::Error {
    fn from(error: ShareStoreError) -> Self {
        match error {
            ShareStoreError::DuplicateToken => Self::internal("share token collision"),
            ShareStoreError::Unavailable { message } => Self::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::error::{Error, ErrorCode};
    use rstest::rstest;

    #[rstest]
    #[case(IdentityError::InvalidCredentials, ErrorCode::Unauthorized)]
    #[case(IdentityError::UsernameTaken, ErrorCode::Conflict)]
    #[case(IdentityError::unavailable("db down"), ErrorCode::InternalError)]
    fn identity_errors_map_to_expected_codes(
        #[case] error: IdentityError,
        #[case] expected: ErrorCode,
    ) {
        assert_eq!(Error::from(error).code(), expected);
    }

    #[rstest]
    #[case(ShareStoreError::DuplicateToken)]
    #[case(ShareStoreError::unavailable("db down"))]
    fn share_store_errors_map_to_internal(#[case] error: ShareStoreError) {
        assert_eq!(Error::from(error).code(), ErrorCode::InternalError);
    }
}
