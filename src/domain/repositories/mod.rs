//! Store trait definitions for the domain layer.
//!
//! Traits define the contract for declarative-object access; concrete
//! implementations live in `crate::infrastructure::store`. Mock
//! implementations are auto-generated via `mockall` for testing.

pub mod link_store;

pub use link_store::{LinkStore, StoreError};

#[cfg(test)]
pub use link_store::MockLinkStore;
