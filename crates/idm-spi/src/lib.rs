//! # idm-spi
//!
//! Service Provider Interface for the identity runtime.
//!
//! ## Design
//!
//! - [`IdentityContext`] - per-scope execution context handed to stores
//! - [`ContextFactory`] - produces a context from the caller's [`Scope`]
//! - [`ContextInitializer`] - opaque hook run before a store serves its
//!   first request in a scope (e.g. binding a transactional unit)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod context;
pub mod provider;

pub use context::{IdentityContext, Scope};
pub use provider::{ContextFactory, ContextInitializer, DefaultContextFactory, SpiError};
