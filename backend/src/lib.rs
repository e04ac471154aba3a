//! Multi-user networked file storage service.
//!
//! Users upload, browse, rename, move, delete, and download files confined
//! to a single storage root. Directories download as streamed zip archives,
//! and any entry can be published through a revocable share token fetched
//! without a session.
//!
//! The crate is laid out hexagonally: [`domain`] holds the storage, archive,
//! and share logic; [`inbound::http`] adapts it to REST; [`outbound`]
//! implements the identity and share-store ports.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

pub use middleware::Trace;
