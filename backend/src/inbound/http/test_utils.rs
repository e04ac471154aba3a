//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;
use tempfile::TempDir;

use crate::domain::{ShareRegistry, Storage, StorageRoot};
use crate::inbound::http::state::HttpState;
use crate::outbound::{InMemoryIdentityProvider, InMemoryShareStore};

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// State plus the temp dir keeping its storage root alive.
pub struct TestState {
    /// Deleted when dropped; hold it for the duration of the test.
    pub dir: TempDir,
    /// Fully wired application state over in-memory adapters.
    pub state: HttpState,
}

/// Build [`HttpState`] over a fresh temporary storage root.
///
/// # Panics
/// On temp dir or root creation failure; tests have no recovery path.
#[must_use]
pub fn test_state() -> TestState {
    test_state_with_limit(16 * 1024 * 1024)
}

/// As [`test_state`] but with an explicit upload ceiling.
///
/// # Panics
/// On temp dir or root creation failure; tests have no recovery path.
#[must_use]
pub fn test_state_with_limit(max_upload_bytes: u64) -> TestState {
    let dir = TempDir::new().expect("create temp dir");
    let root = StorageRoot::open(dir.path()).expect("open storage root");
    let state = HttpState {
        identity: Arc::new(InMemoryIdentityProvider::new()),
        storage: Arc::new(Storage::new(root.clone())),
        shares: Arc::new(ShareRegistry::new(Arc::new(InMemoryShareStore::new()), root)),
        max_upload_bytes,
    };
    TestState { dir, state }
}
