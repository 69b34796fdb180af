//! # idm-store-file
//!
//! File-backed implementation of [`idm_storage::IdentityStore`].
//!
//! Data is held in memory, partitioned by realm. When a working directory
//! is configured every realm is mirrored to `realm-<name>.json` after each
//! write and reloaded when the store is reopened. This is the store the
//! runtime falls back to when no other backend is configured.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod partition;
mod persist;
pub mod store;

pub use store::FileIdentityStore;
