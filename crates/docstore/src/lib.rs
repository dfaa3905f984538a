//! Document-store abstraction for the ledger node.
//!
//! The repositories persist entities as JSON documents and query them with a
//! small, fixed operator language. This crate defines that contract
//! ([`Collection`]) and ships the in-memory backend the node and its tests
//! run on. A server-backed document database would implement the same trait.

pub mod collection;
pub mod error;
pub mod filter;
pub mod geo;
pub mod memory;

pub use collection::{Collection, Query, SortOrder};
pub use error::{DocstoreError, Result};
pub use memory::MemoryCollection;
