//! # idm-model
//!
//! Domain models for the identity runtime: users, groups, roles, agents and
//! the relationships between them.
//!
//! Every entity exposes a derived key (see [`IdentityType::key`]). Keys are
//! recomputed from identifying fields on demand and are the cross-store
//! identity of an entity; they are never stored on their own.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod agent;
pub mod attribute;
pub mod error;
pub mod group;
pub mod identity;
pub mod relationship;
pub mod role;
pub mod user;

pub use agent::Agent;
pub use attribute::{AttributeValue, Attributes};
pub use error::{ModelError, ModelResult};
pub use group::{Group, GroupPath};
pub use identity::{Identity, IdentityKind, IdentityType, parse_key};
pub use relationship::{Relationship, RelationshipKind, RelationshipQuery};
pub use role::Role;
pub use user::User;
