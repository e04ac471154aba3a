//! Domain types and services, free of transport concerns.
//!
//! The HTTP layer in `inbound::http` adapts these to the wire; `outbound`
//! adapters implement the [`ports`] the domain depends on.

pub mod archive;
pub mod auth;
pub mod entry;
pub mod error;
pub mod locks;
pub mod path;
pub mod ports;
pub mod share;
pub mod shares;
pub mod storage;
pub mod trace_id;

pub use auth::{Credentials, CredentialsValidationError, UserId};
pub use entry::DirectoryEntry;
pub use error::{Error, ErrorCode, StorageError};
pub use path::{ResolvedPath, StorageRoot};
pub use share::{Share, ShareSelector};
pub use shares::ShareRegistry;
pub use storage::Storage;
pub use trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient alias for fallible domain and handler results.
pub type ApiResult<T> = Result<T, Error>;
