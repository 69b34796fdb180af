//! Group management through the secured facade.

use idm_manager::{IdentityManager, IdentityManagerError};
use idm_model::{AttributeValue, Group, IdentityType};

use crate::common::default_manager;

#[tokio::test]
async fn test_create() -> anyhow::Result<()> {
    let manager = default_manager().await?;

    let group = Group::new("someGroup");
    manager.create_group(&group).await?;

    let stored = manager.get_group("someGroup").await?.expect("group stored");
    assert_eq!(stored.key(), "GROUP:///someGroup");
    assert_eq!(stored.key(), group.key());
    assert_eq!(stored.name, group.name);
    assert!(stored.parent().is_none());

    Ok(())
}

#[tokio::test]
async fn test_create_with_parent_group() -> anyhow::Result<()> {
    let manager = default_manager().await?;

    let parent = Group::new("parentGroup");
    let child = Group::new_child("childGroup", &parent);
    manager.create_group(&parent).await?;
    manager.create_group(&child).await?;

    let stored = manager.get_group("childGroup").await?.expect("child stored");
    assert_eq!(stored.key(), "GROUP:///parentGroup/childGroup");
    assert_eq!(stored.name, "childGroup");
    assert_eq!(stored.parent().map(|p| p.name.as_str()), Some("parentGroup"));

    Ok(())
}

#[tokio::test]
async fn test_get() -> anyhow::Result<()> {
    let manager = default_manager().await?;

    let parent = Group::new("Test Parent Group");
    manager.create_group(&parent).await?;
    manager.create_group(&Group::new_child("Test Group", &parent)).await?;

    let stored = manager.get_group("Test Group").await?.expect("group stored");
    assert!(stored.parent().is_some());
    assert_eq!(stored.key(), "GROUP:///Test Parent Group/Test Group");
    assert_eq!(stored.name, "Test Group");

    let by_path = manager
        .get_group_by_path("/Test Parent Group/Test Group")
        .await?
        .expect("group stored");
    assert_eq!(by_path.id, stored.id);

    Ok(())
}

#[tokio::test]
async fn test_remove() -> anyhow::Result<()> {
    let manager = default_manager().await?;
    manager.create_group(&Group::new("Test Group")).await?;

    let stored = manager.get_group("Test Group").await?.expect("group stored");
    manager.remove_group(&stored).await?;

    assert!(manager.get_group("Test Group").await?.is_none());
    assert!(manager.remove_group(&stored).await.unwrap_err().is_not_found());

    Ok(())
}

#[tokio::test]
async fn test_three_levels_keep_full_chain() -> anyhow::Result<()> {
    let manager = default_manager().await?;
    let root = Group::new("company");
    let dept = Group::new_child("engineering", &root);
    let team = Group::new_child("platform", &dept);
    for group in [&root, &dept, &team] {
        manager.create_group(group).await?;
    }

    let stored = manager.get_group("platform").await?.expect("team stored");
    let chain: Vec<&str> = stored.ancestors().map(|g| g.name.as_str()).collect();
    assert_eq!(chain, vec!["engineering", "company"]);
    assert_eq!(stored.key(), "GROUP:///company/engineering/platform");

    let children = manager.get_child_groups(&root).await?;
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].key(), dept.key());

    Ok(())
}

#[tokio::test]
async fn test_parent_must_exist() -> anyhow::Result<()> {
    let manager = default_manager().await?;
    let orphan = Group::new_child("orphan", &Group::new("ghost"));

    let err = manager.create_group(&orphan).await.unwrap_err();
    assert!(matches!(err, IdentityManagerError::ParentNotFound { ref parent } if parent == "GROUP:///ghost"));
    assert!(manager.get_group("orphan").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_duplicate_key() -> anyhow::Result<()> {
    let manager = default_manager().await?;
    manager.create_group(&Group::new("admins")).await?;

    let err = manager.create_group(&Group::new("admins")).await.unwrap_err();
    assert!(err.is_duplicate());

    Ok(())
}

#[tokio::test]
async fn test_remove_parent_with_children_fails() -> anyhow::Result<()> {
    let manager = default_manager().await?;
    let parent = Group::new("parent");
    let child = Group::new_child("child", &parent);
    manager.create_group(&parent).await?;
    manager.create_group(&child).await?;

    let err = manager.remove_group(&parent).await.unwrap_err();
    assert!(matches!(err, IdentityManagerError::HasChildren { children: 1, .. }));
    assert!(manager.get_group("parent").await?.is_some());

    manager.remove_group(&child).await?;
    manager.remove_group(&parent).await?;
    assert!(manager.get_group("parent").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_update_keeps_hierarchy() -> anyhow::Result<()> {
    let manager = default_manager().await?;
    let parent = Group::new("sales");
    let mut child = Group::new_child("emea", &parent);
    manager.create_group(&parent).await?;
    manager.create_group(&child).await?;

    child.set_attribute("region", "europe");
    manager.update_group(&child).await?;

    let stored = manager.get_group_by_path("/sales/emea").await?.expect("group stored");
    assert_eq!(
        stored.attributes.first("region"),
        Some(&AttributeValue::Text("europe".into()))
    );
    assert_eq!(stored.parent().map(|p| p.name.as_str()), Some("sales"));

    Ok(())
}

#[tokio::test]
async fn test_group_name_may_not_contain_separator() -> anyhow::Result<()> {
    let manager = default_manager().await?;
    let err = manager.create_group(&Group::new("a/b")).await.unwrap_err();
    assert!(matches!(err, IdentityManagerError::InvalidIdentity(_)));
    Ok(())
}
