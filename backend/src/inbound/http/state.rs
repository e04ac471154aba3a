//! Shared application state handed to HTTP handlers.

use std::sync::Arc;

use crate::domain::ports::IdentityProvider;
use crate::domain::{ShareRegistry, Storage};

/// Ports and services the HTTP adapter depends on.
#[derive(Clone)]
pub struct HttpState {
    /// Account verification and registration.
    pub identity: Arc<dyn IdentityProvider>,
    /// Filesystem operations confined to the storage root.
    pub storage: Arc<Storage>,
    /// Public share lifecycle.
    pub shares: Arc<ShareRegistry>,
    /// Hard ceiling on a single upload request body, in bytes.
    pub max_upload_bytes: u64,
}
