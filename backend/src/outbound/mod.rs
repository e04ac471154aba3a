//! Outbound adapters implementing the domain's ports.

pub mod identity;
pub mod share_store;

pub use identity::InMemoryIdentityProvider;
pub use share_store::InMemoryShareStore;
