//! File store persistence across producer restarts.

use idm_core::Config;
use idm_manager::{IdentityManager, IdentityManagerProducer};
use idm_model::{Group, Role, User};
use idm_spi::Scope;

use crate::common::init_tracing;

fn runtime_in(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.file_store.working_dir = Some(dir.to_path_buf());
    config
}

#[tokio::test]
async fn test_data_survives_restart() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;

    {
        let producer = IdentityManagerProducer::builder()
            .runtime_config(runtime_in(dir.path()))
            .init()
            .await?;
        let manager = producer.create_identity_manager(&Scope::new());

        let parent = Group::new("parentGroup");
        let child = Group::new_child("childGroup", &parent);
        let user = User::new("rosa");
        let role = Role::new("reviewer");
        manager.create_group(&parent).await?;
        manager.create_group(&child).await?;
        manager.create_user(&user).await?;
        manager.create_role(&role).await?;
        manager.add_to_group(&user, &child).await?;
        manager.grant_role(&user, &role).await?;
    }

    let producer = IdentityManagerProducer::builder()
        .runtime_config(runtime_in(dir.path()))
        .init()
        .await?;
    let manager = producer.create_identity_manager(&Scope::new());

    let child = manager.get_group("childGroup").await?.expect("group persisted");
    assert_eq!(child.parent().map(|p| p.name.as_str()), Some("parentGroup"));

    let user = manager.get_user("rosa").await?.expect("user persisted");
    let role = manager.get_role("reviewer").await?.expect("role persisted");
    assert!(manager.is_member(&user, &child).await?);
    assert!(manager.has_role(&user, &role).await?);

    Ok(())
}

#[tokio::test]
async fn test_always_create_files_discards_previous_data() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let producer = IdentityManagerProducer::builder()
        .runtime_config(runtime_in(dir.path()))
        .init()
        .await?;
    producer
        .create_identity_manager(&Scope::new())
        .create_user(&User::new("sam"))
        .await?;

    let mut runtime = runtime_in(dir.path());
    runtime.file_store.always_create_files = true;
    let producer = IdentityManagerProducer::builder()
        .runtime_config(runtime)
        .init()
        .await?;

    let manager = producer.create_identity_manager(&Scope::new());
    assert!(manager.get_user("sam").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_realms_persist_to_separate_files() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let producer = IdentityManagerProducer::builder()
        .runtime_config(runtime_in(dir.path()))
        .init()
        .await?;

    for realm in ["acme", "globex"] {
        producer
            .create_identity_manager(&Scope::realm(realm))
            .create_user(&User::new("tess"))
            .await?;
    }

    assert!(dir.path().join("realm-acme.json").exists());
    assert!(dir.path().join("realm-globex.json").exists());

    Ok(())
}
