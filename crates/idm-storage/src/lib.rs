//! # idm-storage
//!
//! Storage abstraction for the identity runtime.
//!
//! This crate defines the interface every backend (relational, directory,
//! file, ...) implements. The runtime only talks to backends through
//! [`IdentityStore`]; drivers live in their own crates.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::IdentityStore;
