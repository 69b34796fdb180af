//! Configuration resolution, auto-configuration and build failures.

use std::collections::HashMap;
use std::sync::Arc;

use idm_config::{
    ConfigError, ConfigResult, ConfigurationListener, ConfigurationSupply, FileSettings,
    IdentityConfiguration, JpaSettings, StoreConfiguration, StoreKind,
};
use idm_config::store::IDENTITY_TYPE_ENTITY;
use idm_core::Config;
use idm_manager::{IdentityManager, IdentityManagerError, IdentityManagerProducer};
use idm_model::{IdentityKind, RelationshipKind, User};
use idm_spi::Scope;

use crate::common::{CountingInitializer, RecordingFactory, init_tracing};

struct AddUsersStore;

impl ConfigurationListener for AddUsersStore {
    fn name(&self) -> &str {
        "add-users-store"
    }

    fn on_configuration_resolved(&self, configuration: &mut IdentityConfiguration) -> ConfigResult<()> {
        let mut store = StoreConfiguration::file(FileSettings::in_memory()).with_name("users");
        store.features_mut().set_identity_support(IdentityKind::User, true);
        configuration.add_config(store)?;
        Ok(())
    }
}

fn jpa_store() -> StoreConfiguration {
    StoreConfiguration::jpa(JpaSettings::new("identity").with_entity(IDENTITY_TYPE_ENTITY))
}

#[tokio::test]
async fn test_no_stores_auto_configures_full_feature_set() -> anyhow::Result<()> {
    init_tracing();
    let producer = IdentityManagerProducer::builder().init().await?;
    let topology = producer.topology();

    assert_eq!(topology.stores().len(), 1);
    assert_eq!(topology.stores()[0].kind(), &StoreKind::File);

    let features = topology.features();
    for kind in IdentityKind::ALL {
        assert!(features.supports_identity(kind), "{kind} unsupported");
    }
    for kind in RelationshipKind::standard() {
        assert!(features.supports_relationship(&kind), "{kind} unsupported");
    }
    assert!(features.supports_custom_relationships());
    assert!(features.supports_multi_realm());

    Ok(())
}

#[tokio::test]
async fn test_explicit_store_suppresses_auto_configuration() -> anyhow::Result<()> {
    init_tracing();
    let producer = IdentityManagerProducer::builder()
        .listener(Arc::new(AddUsersStore))
        .init()
        .await?;

    let stores = producer.topology().stores();
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0].name(), "users");

    let manager = producer.create_identity_manager(&Scope::new());
    manager.create_user(&User::new("hank")).await?;
    assert!(matches!(
        manager.get_group("any").await,
        Err(IdentityManagerError::Unsupported(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_ambiguous_supply_is_fatal() {
    init_tracing();
    let supply = ConfigurationSupply::from_candidates(vec![
        IdentityConfiguration::new(),
        IdentityConfiguration::new(),
    ]);

    let err = IdentityManagerProducer::builder()
        .supply(supply)
        .init()
        .await
        .unwrap_err();
    assert!(err.kind().is_fatal());
    assert!(err.to_string().contains("2 identity configurations"));
}

#[tokio::test]
async fn test_conflicting_multi_realm_claims_fail_build() {
    init_tracing();
    let mut a = StoreConfiguration::file(FileSettings::in_memory()).with_name("a");
    a.features_mut().set_supports_multi_realm(true);
    let mut b = StoreConfiguration::file(FileSettings::in_memory()).with_name("b");
    b.features_mut().set_supports_multi_realm(false);

    let mut configuration = IdentityConfiguration::new();
    configuration.add_config(a).unwrap().add_config(b).unwrap();

    let err = IdentityManagerProducer::builder()
        .configuration(configuration)
        .init()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IdentityManagerError::Configuration(ConfigError::FeatureConflict { .. })
    ));
}

#[tokio::test]
async fn test_jpa_store_requires_initializer() {
    init_tracing();
    let factory = Arc::new(RecordingFactory::default());
    let mut configuration = IdentityConfiguration::new();
    configuration.add_config(jpa_store()).unwrap();

    let err = IdentityManagerProducer::builder()
        .configuration(configuration)
        .backend_registry(RecordingFactory::registry(&factory))
        .init()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IdentityManagerError::Configuration(ConfigError::MissingContextInitializer { .. })
    ));
}

#[tokio::test]
async fn test_jpa_initializer_runs_once_per_scope() -> anyhow::Result<()> {
    init_tracing();
    let factory = Arc::new(RecordingFactory::default());
    let initializer = Arc::new(CountingInitializer::default());

    let mut store = jpa_store();
    store.features_mut().add_feature_support();
    let mut configuration = IdentityConfiguration::new();
    configuration.add_config(store)?;

    let producer = IdentityManagerProducer::builder()
        .configuration(configuration)
        .jpa_context_initializer(initializer.clone())
        .backend_registry(RecordingFactory::registry(&factory))
        .init()
        .await?;

    let manager = producer.create_identity_manager(&Scope::new());
    manager.create_user(&User::new("ivy")).await?;
    manager.get_user("ivy").await?;
    assert_eq!(initializer.runs(), 1);
    assert_eq!(manager.context().get_attribute("tx:jpa").as_deref(), Some("bound"));

    let second = producer.create_identity_manager(&Scope::new());
    second.get_user("ivy").await?;
    assert_eq!(initializer.runs(), 2);
    assert_eq!(initializer.stores(), vec!["jpa", "jpa"]);

    Ok(())
}

#[tokio::test]
async fn test_environment_selects_relational_backend() -> anyhow::Result<()> {
    init_tracing();
    let env: HashMap<&str, &str> = HashMap::from([
        ("IDM_JPA_PERSISTENCE_UNIT", "identity"),
        ("IDM_JPA_ENTITIES", "IdentityType, Relationship"),
        ("IDM_DEFAULT_REALM", "main"),
    ]);
    let runtime = Config::from_lookup(|key| env.get(key).map(ToString::to_string))?;

    let factory = Arc::new(RecordingFactory::default());
    let producer = IdentityManagerProducer::builder()
        .runtime_config(runtime)
        .jpa_context_initializer(Arc::new(CountingInitializer::default()))
        .backend_registry(RecordingFactory::registry(&factory))
        .init()
        .await?;

    let store = &producer.topology().stores()[0];
    assert_eq!(store.kind(), &StoreKind::Jpa);
    assert!(store.features().supports_multi_realm());

    let manager = producer.create_identity_manager(&Scope::realm("main"));
    assert!(manager.context().is_default_realm());
    manager.create_user(&User::new("jack")).await?;
    assert_eq!(factory.served("create"), vec!["jpa"]);

    Ok(())
}

#[tokio::test]
async fn test_configuration_frozen_after_build() {
    let mut configuration = IdentityConfiguration::new();
    configuration.build().unwrap();

    assert!(matches!(configuration.build(), Err(ConfigError::AlreadyBuilt)));
    assert!(matches!(
        configuration.add_config(StoreConfiguration::file(FileSettings::in_memory())),
        Err(ConfigError::Frozen { .. })
    ));
}
