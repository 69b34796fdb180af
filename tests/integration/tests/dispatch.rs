//! First-match dispatch across several stores.

use std::sync::Arc;

use idm_config::IdentityConfiguration;
use idm_manager::{
    AccessRequest, IdentityManager, IdentityManagerError, IdentityManagerProducer, InMemoryAuditSink,
    PolicyDecision, SecurityPolicy,
};
use idm_core::event::{EventOutcome, EventType};
use idm_model::{Group, IdentityKind, Relationship, RelationshipKind, RelationshipQuery, Role, User};
use idm_spi::Scope;

use crate::common::{RecordingFactory, init_tracing};

/// Two recording stores: `first` holds identities, `second` holds grants
/// and custom relationships.
async fn two_store_producer(factory: &Arc<RecordingFactory>) -> anyhow::Result<IdentityManagerProducer> {
    init_tracing();
    let mut first = RecordingFactory::store("first");
    first.features_mut().add_feature_support();
    let mut second = RecordingFactory::store("second");
    second
        .features_mut()
        .set_relationship_support(RelationshipKind::Grant, true)
        .set_supports_custom_relationships(true);

    let mut configuration = IdentityConfiguration::new();
    configuration.add_config(first)?.add_config(second)?;

    Ok(IdentityManagerProducer::builder()
        .configuration(configuration)
        .backend_registry(RecordingFactory::registry(factory))
        .init()
        .await?)
}

#[tokio::test]
async fn test_relationship_reaches_only_supporting_store() -> anyhow::Result<()> {
    let factory = Arc::new(RecordingFactory::default());
    let producer = two_store_producer(&factory).await?;
    let manager = producer.create_identity_manager(&Scope::new());

    let user = User::new("kate");
    let role = Role::new("operator");
    manager.create_user(&user).await?;
    manager.create_role(&role).await?;
    assert_eq!(factory.served("create"), vec!["first", "first"]);

    manager.grant_role(&user, &role).await?;
    assert_eq!(factory.served("add_relationship"), vec!["second"]);
    assert!(manager.has_role(&user, &role).await?);

    Ok(())
}

#[tokio::test]
async fn test_unsupported_relationship_kind() -> anyhow::Result<()> {
    let factory = Arc::new(RecordingFactory::default());
    let producer = two_store_producer(&factory).await?;
    let manager = producer.create_identity_manager(&Scope::new());

    let user = User::new("liam");
    let group = Group::new("ops");
    manager.create_user(&user).await?;
    manager.create_group(&group).await?;

    let err = manager.add_to_group(&user, &group).await.unwrap_err();
    assert!(matches!(err, IdentityManagerError::Unsupported(ref what) if what.contains("GroupMembership")));
    assert!(factory.served("add_relationship").is_empty());

    Ok(())
}

#[tokio::test]
async fn test_custom_relationship_follows_custom_flag() -> anyhow::Result<()> {
    let factory = Arc::new(RecordingFactory::default());
    let producer = two_store_producer(&factory).await?;
    let manager = producer.create_identity_manager(&Scope::new());

    let mentor = User::new("mona");
    let mentee = User::new("ned");
    let relationship = Relationship::custom("Mentorship")
        .with_identity("mentor", &mentor)
        .with_identity("mentee", &mentee);
    manager.add_relationship(&relationship).await?;

    let found = manager
        .get_relationships(
            &RelationshipQuery::of_kind(RelationshipKind::Custom("Mentorship".into()))
                .with_identity("mentee", "USER://ned"),
        )
        .await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].identity("mentor"), Some("USER://mona"));

    let everything = manager.get_relationships(&RelationshipQuery::new()).await?;
    assert_eq!(everything.len(), 1);

    manager.remove_relationship(&relationship).await?;
    assert!(manager.remove_relationship(&relationship).await.unwrap_err().is_not_found());
    assert_eq!(factory.served("remove_relationship"), vec!["second", "second"]);

    Ok(())
}

#[tokio::test]
async fn test_foreign_realm_rejected_without_multi_realm() -> anyhow::Result<()> {
    let factory = Arc::new(RecordingFactory::default());
    let producer = two_store_producer(&factory).await?;

    let manager = producer.create_identity_manager(&Scope::realm("acme"));
    let err = manager.create_user(&User::new("olga")).await.unwrap_err();
    assert!(matches!(err, IdentityManagerError::Unsupported(ref what) if what.contains("multi-realm")));
    assert!(factory.served("create").is_empty());

    Ok(())
}

#[tokio::test]
async fn test_realms_are_isolated_on_multi_realm_store() -> anyhow::Result<()> {
    init_tracing();
    let producer = IdentityManagerProducer::builder().init().await?;
    let acme = producer.create_identity_manager(&Scope::realm("acme"));
    let globex = producer.create_identity_manager(&Scope::realm("globex"));

    acme.create_user(&User::new("pat")).await?;
    assert!(acme.get_user("pat").await?.is_some());
    assert!(globex.get_user("pat").await?.is_none());

    let found = acme.lookup_identity_by_key(&IdentityKind::User.key_for("pat")).await?;
    assert!(found.is_some());

    Ok(())
}

#[derive(Debug)]
struct NoRemovals;

impl SecurityPolicy for NoRemovals {
    fn check(&self, request: &AccessRequest<'_>) -> PolicyDecision {
        if request.operation.starts_with("remove_") {
            PolicyDecision::Deny(format!("{} is disabled in realm {}", request.operation, request.realm))
        } else {
            PolicyDecision::Permit
        }
    }
}

#[tokio::test]
async fn test_policy_denial_is_audited() -> anyhow::Result<()> {
    init_tracing();
    let audit = Arc::new(InMemoryAuditSink::new());
    let producer = IdentityManagerProducer::builder()
        .security_policy(Arc::new(NoRemovals))
        .audit_sink(audit.clone())
        .init()
        .await?;
    let manager = producer.create_identity_manager(&Scope::new());

    let user = User::new("quinn");
    manager.create_user(&user).await?;
    let err = manager.remove_user(&user).await.unwrap_err();
    assert!(err.is_access_denied());
    assert!(manager.get_user("quinn").await?.is_some());

    let denied: Vec<_> = audit
        .events()
        .into_iter()
        .filter(|e| e.outcome == EventOutcome::Denied)
        .collect();
    assert_eq!(denied.len(), 1);
    assert_eq!(denied[0].event_type, EventType::IdentityRemoved);
    assert_eq!(denied[0].subject.as_deref(), Some("USER://quinn"));

    Ok(())
}
