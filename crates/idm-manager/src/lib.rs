//! # idm-manager
//!
//! Runtime side of the identity runtime: turns a frozen
//! [`idm_config::RuntimeTopology`] into backends and hands out identity
//! managers.
//!
//! ## Design
//!
//! - [`BackendRegistry`] - store kind to [`BackendFactory`]; new backends are
//!   registered, never hard-coded
//! - [`IdentityManagerFactory`] - one backend per configured store, shared
//!   by every manager it creates
//! - [`DefaultIdentityManager`] - per-scope facade dispatching each call to
//!   the first store supporting it
//! - [`SecuredIdentityManager`] - decorator consulting a [`SecurityPolicy`]
//!   and auditing every call
//! - [`IdentityManagerProducer`] - process-level bootstrap tying it together

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod factory;
pub mod manager;
pub mod producer;
pub mod registry;
pub mod secured;

pub use error::{IdentityManagerError, ManagerResult};
pub use factory::IdentityManagerFactory;
pub use manager::{DefaultIdentityManager, IdentityManager};
pub use producer::{IdentityManagerProducer, IdentityManagerProducerBuilder};
pub use registry::{BackendFactory, BackendRegistry, FileBackendFactory};
pub use secured::{
    AccessRequest, AllowAll, AuditSink, InMemoryAuditSink, PolicyDecision, SecuredIdentityManager,
    SecurityPolicy, TracingAuditSink,
};
