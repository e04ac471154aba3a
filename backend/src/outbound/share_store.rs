//! In-memory share store.
//!
//! Records live for the lifetime of the process; `deactivate` flips the
//! `active` flag rather than removing rows so revoked shares still appear in
//! their owner's listing.

use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;

use crate::domain::auth::UserId;
use crate::domain::ports::{ShareStore, ShareStoreError};
use crate::domain::share::{NewShare, Share, ShareSelector};

#[derive(Default)]
struct State {
    shares: Vec<Share>,
    next_id: i64,
}

/// Process-local share store.
#[derive(Default)]
pub struct InMemoryShareStore {
    state: Mutex<State>,
}

impl InMemoryShareStore {
    /// Build an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(share: &Share, selector: &ShareSelector) -> bool {
    match selector {
        ShareSelector::Token(token) => share.token == *token,
        ShareSelector::Id(id) => share.id == *id,
    }
}

#[async_trait]
impl ShareStore for InMemoryShareStore {
    async fn insert(&self, share: NewShare) -> Result<Share, ShareStoreError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.shares.iter().any(|existing| existing.token == share.token) {
            return Err(ShareStoreError::DuplicateToken);
        }
        state.next_id += 1;
        let stored = Share {
            id: state.next_id,
            path: share.path,
            owner: share.owner,
            token: share.token,
            created_at: share.created_at,
            active: true,
        };
        state.shares.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Share>, ShareStoreError> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state
            .shares
            .iter()
            .find(|share| share.token == token)
            .cloned())
    }

    async fn deactivate(
        &self,
        selector: &ShareSelector,
        owner: UserId,
    ) -> Result<bool, ShareStoreError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(share) = state
            .shares
            .iter_mut()
            .find(|share| share.owner == owner && matches(share, selector))
        else {
            return Ok(false);
        };
        let changed = share.active;
        share.active = false;
        Ok(changed)
    }

    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Share>, ShareStoreError> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut shares: Vec<Share> = state
            .shares
            .iter()
            .filter(|share| share.owner == owner)
            .cloned()
            .collect();
        shares.reverse();
        Ok(shares)
    }
}
