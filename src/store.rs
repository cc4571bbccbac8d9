use crate::error::StoreError;
use crate::permission::{FieldPermission, FieldPermissionKey, PermissionLevel};
use crate::types::{InstanceId, RoleId, UserId};
use async_trait::async_trait;

/// Persisted per-instance state read on every query.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceRecord {
    /// Cache epoch; bumped whenever permission-affecting state changes.
    pub adjuncts_timestamp: u64,
    /// Role used for users without an explicit assignment.
    pub default_role: RoleId,
}

/// Store interface for instances.
#[async_trait]
pub trait InstanceStore {
    /// Returns the instance record, or `None` for an unknown instance.
    async fn instance(
        &self,
        instance: InstanceId,
    ) -> std::result::Result<Option<InstanceRecord>, StoreError>;

    /// Increments the instance's adjuncts timestamp and returns the new value.
    async fn bump_adjuncts_timestamp(
        &self,
        instance: InstanceId,
    ) -> std::result::Result<u64, StoreError>;
}

/// Store interface for user role assignments.
#[async_trait]
pub trait UserRoleStore {
    /// Returns every explicit user-to-role assignment within an instance.
    async fn user_roles(
        &self,
        instance: InstanceId,
    ) -> std::result::Result<Vec<(UserId, RoleId)>, StoreError>;

    /// Sets or clears the role assigned to a user within an instance.
    ///
    /// This does not touch the adjuncts timestamp.
    async fn set_user_role(
        &self,
        instance: InstanceId,
        user: UserId,
        role: Option<RoleId>,
    ) -> std::result::Result<(), StoreError>;
}

/// Store interface for field permission records.
///
/// None of these writes touch the adjuncts timestamp. Callers going
/// through [`crate::Engine`] get invalidation; direct callers get a
/// possibly stale cache until the timestamp is bumped.
#[async_trait]
pub trait FieldPermissionStore {
    /// Returns all field permissions of an instance, across roles and models.
    async fn field_permissions(
        &self,
        instance: InstanceId,
    ) -> std::result::Result<Vec<FieldPermission>, StoreError>;

    /// Inserts a record or replaces the one with the same key.
    async fn upsert_field_permission(
        &self,
        permission: FieldPermission,
    ) -> std::result::Result<(), StoreError>;

    /// Sets the level of an existing record in place. Returns the number of
    /// updated records (0 or 1).
    async fn update_permission_level(
        &self,
        key: FieldPermissionKey,
        level: PermissionLevel,
    ) -> std::result::Result<usize, StoreError>;

    /// Deletes a record. Returns whether a record was removed.
    async fn delete_field_permission(
        &self,
        key: FieldPermissionKey,
    ) -> std::result::Result<bool, StoreError>;
}

/// Composite store trait.
pub trait Store: InstanceStore + UserRoleStore + FieldPermissionStore + Send + Sync {}

impl<T> Store for T where T: InstanceStore + UserRoleStore + FieldPermissionStore + Send + Sync {}
