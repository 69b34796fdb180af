//! # idm-config
//!
//! Configuration and capability negotiation for the identity runtime.
//!
//! Data flow: discovery ([`ConfigurationSupply`]) → listeners
//! ([`ConfigurationListener`]) → [`IdentityConfiguration::build`], which
//! auto-configures a store when none was declared
//! ([`AutoConfigurationResolver`]), attaches context hooks, validates the
//! per-store [`FeatureSet`]s and freezes everything into a
//! [`RuntimeTopology`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod auto;
pub mod discovery;
pub mod error;
pub mod feature;
pub mod identity;
pub mod listener;
pub mod store;

pub use auto::{AutoConfigurationResolver, ConfigProbe, ReadinessProbe, UnconfiguredProbe};
pub use discovery::ConfigurationSupply;
pub use error::{ConfigError, ConfigResult};
pub use feature::{Capability, FeatureSet};
pub use identity::{IdentityConfiguration, RuntimeTopology};
pub use listener::ConfigurationListener;
pub use store::{FileSettings, JpaSettings, LdapSettings, StoreConfiguration, StoreKind, StoreSettings};
