//! Share lifecycle: create, list, revoke, and resolve public downloads.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::auth::UserId;
use super::error::Error;
use super::path::{ResolvedPath, StorageRoot};
use super::ports::ShareStore;
use super::share::{NewShare, Share, ShareSelector, generate_token};

/// Creates and resolves public shares backed by a [`ShareStore`].
pub struct ShareRegistry {
    store: Arc<dyn ShareStore>,
    root: StorageRoot,
}

impl ShareRegistry {
    /// Build a registry over a store and the storage root it shares from.
    #[must_use]
    pub fn new(store: Arc<dyn ShareStore>, root: StorageRoot) -> Self {
        Self { store, root }
    }

    /// Create a share for `path`, owned by `owner`.
    ///
    /// The target must exist at creation time; later deletion is tolerated
    /// and simply makes the share resolve to nothing.
    ///
    /// # Errors
    /// `not_found` when the target is absent, `invalid_request` when the
    /// path resolves out of the root, `internal_error` on store failures.
    pub async fn create(&self, owner: UserId, path: &str) -> Result<Share, Error> {
        let resolved = self.root.resolve(path)?;
        if stat(resolved.as_path().to_path_buf()).await?.is_err() {
            return Err(Error::not_found("no such file or directory"));
        }
        let share = self
            .store
            .insert(NewShare {
                path: resolved.relative_string(),
                owner,
                token: generate_token(),
                created_at: Utc::now(),
            })
            .await?;
        info!(share_id = share.id, owner = %owner, path = %share.path, "created share");
        Ok(share)
    }

    /// List the shares `owner` has created, newest first.
    ///
    /// # Errors
    /// `internal_error` on store failures.
    pub async fn list_for(&self, owner: UserId) -> Result<Vec<Share>, Error> {
        Ok(self.store.list_for_owner(owner).await?)
    }

    /// Revoke one of `owner`'s shares; returns whether anything changed.
    ///
    /// Revoking an already-revoked or unknown share is not an error, the
    /// caller just learns nothing matched. Selectors naming another owner's
    /// share match nothing.
    ///
    /// # Errors
    /// `internal_error` on store failures.
    pub async fn revoke(&self, selector: &ShareSelector, owner: UserId) -> Result<bool, Error> {
        let revoked = self.store.deactivate(selector, owner).await?;
        if revoked {
            info!(owner = %owner, ?selector, "revoked share");
        } else {
            debug!(owner = %owner, ?selector, "revocation matched no share");
        }
        Ok(revoked)
    }

    /// Resolve a public token to its on-disk target.
    ///
    /// Unknown tokens, revoked shares, and shares whose target has been
    /// deleted or no longer resolves all produce the same `not_found`, so a
    /// caller probing tokens learns nothing about which case occurred.
    ///
    /// # Errors
    /// `not_found` for every unusable token, `internal_error` on store
    /// failures.
    pub async fn resolve_target(&self, token: &str) -> Result<(ResolvedPath, fs::Metadata), Error> {
        let gone = || Error::not_found("share not found");
        let share = self.store.find_by_token(token).await?.ok_or_else(gone)?;
        if !share.active {
            return Err(gone());
        }
        let resolved = self.root.resolve(&share.path).map_err(|_| gone())?;
        let metadata = stat(resolved.as_path().to_path_buf())
            .await?
            .map_err(|_| gone())?;
        Ok((resolved, metadata))
    }
}

/// Stat a path on the blocking pool; registry methods run on the executor.
async fn stat(path: PathBuf) -> Result<io::Result<fs::Metadata>, Error> {
    tokio::task::spawn_blocking(move || fs::metadata(path))
        .await
        .map_err(|error| Error::internal(format!("blocking task failed: {error}")))
}
