//! # idm-core
//!
//! Core utilities shared by every crate of the identity runtime: the error
//! taxonomy, runtime settings loaded from the environment, and audit events.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod event;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
