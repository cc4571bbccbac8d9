use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::permission::{FieldPermission, FieldPermissionKey, PermissionLevel};
use crate::store::{FieldPermissionStore, InstanceRecord, InstanceStore, UserRoleStore};
use crate::types::{InstanceId, RoleId, UserId};

/// In-memory store implementation for tests and demos.
///
/// Writes never bump the adjuncts timestamp on their own, which makes the
/// store suitable for simulating updates that bypass [`crate::Engine`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    instances: RwLock<HashMap<InstanceId, InstanceRecord>>,
    user_roles: RwLock<HashMap<InstanceId, HashMap<UserId, RoleId>>>,
    field_permissions: RwLock<HashMap<FieldPermissionKey, PermissionLevel>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instance with its default role and a zero timestamp.
    ///
    /// Registering an existing instance replaces its default role and keeps
    /// its timestamp.
    pub fn add_instance(&self, instance: InstanceId, default_role: RoleId) {
        let mut guard = self.inner.instances.write().expect("poisoned lock");
        guard
            .entry(instance)
            .and_modify(|record| record.default_role = default_role.clone())
            .or_insert(InstanceRecord {
                adjuncts_timestamp: 0,
                default_role,
            });
    }

    /// Returns the current adjuncts timestamp of an instance.
    pub fn adjuncts_timestamp(&self, instance: &InstanceId) -> Option<u64> {
        let guard = self.inner.instances.read().expect("poisoned lock");
        guard.get(instance).map(|record| record.adjuncts_timestamp)
    }

    /// Number of stored field permissions for an instance.
    pub fn field_permission_count(&self, instance: &InstanceId) -> usize {
        let guard = self.inner.field_permissions.read().expect("poisoned lock");
        guard.keys().filter(|key| &key.instance == instance).count()
    }
}

#[async_trait]
impl InstanceStore for MemoryStore {
    async fn instance(
        &self,
        instance: InstanceId,
    ) -> std::result::Result<Option<InstanceRecord>, StoreError> {
        let guard = self.inner.instances.read().expect("poisoned lock");
        Ok(guard.get(&instance).cloned())
    }

    async fn bump_adjuncts_timestamp(
        &self,
        instance: InstanceId,
    ) -> std::result::Result<u64, StoreError> {
        let mut guard = self.inner.instances.write().expect("poisoned lock");
        let record = guard
            .get_mut(&instance)
            .ok_or_else(|| format!("unknown instance {instance}"))?;
        record.adjuncts_timestamp += 1;
        Ok(record.adjuncts_timestamp)
    }
}

#[async_trait]
impl UserRoleStore for MemoryStore {
    async fn user_roles(
        &self,
        instance: InstanceId,
    ) -> std::result::Result<Vec<(UserId, RoleId)>, StoreError> {
        let guard = self.inner.user_roles.read().expect("poisoned lock");
        Ok(guard
            .get(&instance)
            .map(|roles| {
                roles
                    .iter()
                    .map(|(user, role)| (user.clone(), role.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_user_role(
        &self,
        instance: InstanceId,
        user: UserId,
        role: Option<RoleId>,
    ) -> std::result::Result<(), StoreError> {
        if !self
            .inner
            .instances
            .read()
            .expect("poisoned lock")
            .contains_key(&instance)
        {
            return Err(format!("unknown instance {instance}").into());
        }
        let mut guard = self.inner.user_roles.write().expect("poisoned lock");
        let roles = guard.entry(instance).or_default();
        match role {
            Some(role) => {
                roles.insert(user, role);
            }
            None => {
                roles.remove(&user);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FieldPermissionStore for MemoryStore {
    async fn field_permissions(
        &self,
        instance: InstanceId,
    ) -> std::result::Result<Vec<FieldPermission>, StoreError> {
        let guard = self.inner.field_permissions.read().expect("poisoned lock");
        Ok(guard
            .iter()
            .filter(|(key, _)| key.instance == instance)
            .map(|(key, level)| {
                FieldPermission::new(
                    key.model_name.clone(),
                    key.field_name.clone(),
                    key.role.clone(),
                    key.instance.clone(),
                    *level,
                )
            })
            .collect())
    }

    async fn upsert_field_permission(
        &self,
        permission: FieldPermission,
    ) -> std::result::Result<(), StoreError> {
        let mut guard = self.inner.field_permissions.write().expect("poisoned lock");
        guard.insert(permission.key(), permission.permission_level);
        Ok(())
    }

    async fn update_permission_level(
        &self,
        key: FieldPermissionKey,
        level: PermissionLevel,
    ) -> std::result::Result<usize, StoreError> {
        let mut guard = self.inner.field_permissions.write().expect("poisoned lock");
        Ok(match guard.get_mut(&key) {
            Some(existing) => {
                *existing = level;
                1
            }
            None => 0,
        })
    }

    async fn delete_field_permission(
        &self,
        key: FieldPermissionKey,
    ) -> std::result::Result<bool, StoreError> {
        let mut guard = self.inner.field_permissions.write().expect("poisoned lock");
        Ok(guard.remove(&key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldName, ModelName};
    use futures::executor::block_on;

    fn key(role: &str) -> FieldPermissionKey {
        FieldPermissionKey::new(
            ModelName::try_from("Plot").unwrap(),
            FieldName::try_from("geom").unwrap(),
            RoleId::try_from(role).unwrap(),
            InstanceId::try_from("city").unwrap(),
        )
    }

    #[test]
    fn upsert_should_keep_one_record_per_key() {
        let store = MemoryStore::new();
        let city = InstanceId::try_from("city").unwrap();
        let key = key("editor");
        let record = |level| {
            FieldPermission::new(
                key.model_name.clone(),
                key.field_name.clone(),
                key.role.clone(),
                key.instance.clone(),
                level,
            )
        };

        block_on(store.upsert_field_permission(record(PermissionLevel::ReadOnly))).unwrap();
        block_on(store.upsert_field_permission(record(PermissionLevel::WriteDirectly))).unwrap();

        let perms = block_on(store.field_permissions(city.clone())).unwrap();
        assert_eq!(perms.len(), 1);
        assert_eq!(perms[0].permission_level, PermissionLevel::WriteDirectly);
        assert_eq!(store.field_permission_count(&city), 1);
    }

    #[test]
    fn update_should_report_affected_rows() {
        let store = MemoryStore::new();

        let read_only = PermissionLevel::ReadOnly;
        let missing = block_on(store.update_permission_level(key("editor"), read_only)).unwrap();
        assert_eq!(missing, 0);

        block_on(store.upsert_field_permission(FieldPermission::new(
            ModelName::try_from("Plot").unwrap(),
            FieldName::try_from("geom").unwrap(),
            RoleId::try_from("editor").unwrap(),
            InstanceId::try_from("city").unwrap(),
            PermissionLevel::WriteDirectly,
        )))
        .unwrap();
        let updated = block_on(store.update_permission_level(key("editor"), read_only)).unwrap();
        assert_eq!(updated, 1);
        assert!(block_on(store.delete_field_permission(key("editor"))).unwrap());
        assert!(!block_on(store.delete_field_permission(key("editor"))).unwrap());
    }

    #[test]
    fn writes_should_not_bump_timestamp() {
        let store = MemoryStore::new();
        let city = InstanceId::try_from("city").unwrap();
        store.add_instance(city.clone(), RoleId::try_from("public").unwrap());

        block_on(store.set_user_role(
            city.clone(),
            UserId::try_from("alice").unwrap(),
            Some(RoleId::try_from("editor").unwrap()),
        ))
        .unwrap();
        assert_eq!(store.adjuncts_timestamp(&city), Some(0));

        assert_eq!(block_on(store.bump_adjuncts_timestamp(city.clone())).unwrap(), 1);
        assert_eq!(store.adjuncts_timestamp(&city), Some(1));
    }

    #[test]
    fn bump_should_fail_for_unknown_instance() {
        let store = MemoryStore::new();
        let nowhere = InstanceId::try_from("nowhere").unwrap();
        let result = block_on(store.bump_adjuncts_timestamp(nowhere));
        assert!(result.is_err());
    }

    #[test]
    fn set_user_role_should_reject_unknown_instance() {
        let store = MemoryStore::new();
        let nowhere = InstanceId::try_from("nowhere").unwrap();
        let result = block_on(store.set_user_role(
            nowhere.clone(),
            UserId::try_from("alice").unwrap(),
            Some(RoleId::try_from("editor").unwrap()),
        ));

        assert!(result.is_err());
        assert!(block_on(store.user_roles(nowhere.clone())).unwrap().is_empty());
        assert!(store.inner.user_roles.read().unwrap().get(&nowhere).is_none());
    }
}
