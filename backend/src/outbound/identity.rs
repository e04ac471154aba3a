//! In-memory identity provider with salted password hashing.
//!
//! Accounts live for the lifetime of the process. Passwords are hashed with
//! Argon2id so they never sit in memory or logs in the clear, and
//! authentication failures are uniform: a missing account and a wrong
//! password produce the same error.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicI64, Ordering};

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use tracing::info;

use crate::domain::auth::{Credentials, UserId};
use crate::domain::ports::{IdentityError, IdentityProvider};

struct StoredUser {
    id: UserId,
    password_hash: String,
}

/// Process-local account store.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    users: Mutex<HashMap<String, StoredUser>>,
    next_id: AtomicI64,
}

impl InMemoryIdentityProvider {
    /// Build an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| IdentityError::unavailable(error.to_string()))
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn authenticate(&self, credentials: &Credentials) -> Result<UserId, IdentityError> {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        users
            .get(credentials.username())
            .filter(|user| verify_password(credentials.password(), &user.password_hash))
            .map(|user| user.id)
            .ok_or(IdentityError::InvalidCredentials)
    }

    async fn register(&self, credentials: &Credentials) -> Result<UserId, IdentityError> {
        // Hash before taking the lock; Argon2 is deliberately slow.
        let password_hash = hash_password(credentials.password())?;
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(credentials.username()) {
            return Err(IdentityError::UsernameTaken);
        }
        let id = UserId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        users.insert(
            credentials.username().to_owned(),
            StoredUser { id, password_hash },
        );
        info!(user_id = %id, "registered account");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials::try_from_parts(username, password).expect("valid credentials")
    }

    #[rstest]
    #[tokio::test]
    async fn register_then_authenticate_round_trip() {
        let provider = InMemoryIdentityProvider::new();
        let id = provider
            .register(&credentials("alice", "hunter2"))
            .await
            .expect("register");
        let authed = provider
            .authenticate(&credentials("alice", "hunter2"))
            .await
            .expect("authenticate");
        assert_eq!(id, authed);
    }

    #[rstest]
    #[tokio::test]
    async fn wrong_password_and_unknown_user_fail_alike() {
        let provider = InMemoryIdentityProvider::new();
        provider
            .register(&credentials("alice", "hunter2"))
            .await
            .expect("register");

        let wrong_password = provider
            .authenticate(&credentials("alice", "letmein"))
            .await
            .expect_err("wrong password");
        let unknown_user = provider
            .authenticate(&credentials("mallory", "hunter2"))
            .await
            .expect_err("unknown user");
        assert_eq!(wrong_password, IdentityError::InvalidCredentials);
        assert_eq!(unknown_user, IdentityError::InvalidCredentials);
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let provider = InMemoryIdentityProvider::new();
        provider
            .register(&credentials("alice", "hunter2"))
            .await
            .expect("first registration");
        let err = provider
            .register(&credentials("alice", "other"))
            .await
            .expect_err("duplicate");
        assert_eq!(err, IdentityError::UsernameTaken);
    }

    #[rstest]
    #[tokio::test]
    async fn distinct_accounts_get_distinct_ids() {
        let provider = InMemoryIdentityProvider::new();
        let a = provider
            .register(&credentials("alice", "pw"))
            .await
            .expect("alice");
        let b = provider
            .register(&credentials("bob", "pw"))
            .await
            .expect("bob");
        assert_ne!(a, b);
    }
}
