use std::sync::Arc;

use crate::adjuncts::InstanceAdjuncts;
use crate::cache::{Cache, NoCache};
use crate::config::CacheSettings;
use crate::error::{Error, Result};
use crate::permission::{FieldPermission, FieldPermissionKey, PermissionLevel};
use crate::store::{InstanceRecord, Store};
use crate::types::{FieldName, InstanceId, ModelName, RoleId, UserId};

/// Field permission service with pluggable store and optional cache.
///
/// Every query compares the instance's current `adjuncts_timestamp` with the
/// timestamp of the cached snapshot and reloads on mismatch. Writes made
/// through the engine bump the timestamp; writes made directly against the
/// store do not, and stay invisible until something else bumps it.
#[derive(Debug)]
pub struct Engine<S, C = NoCache> {
    store: S,
    cache: C,
    use_object_caches: bool,
}

/// Builder for [`Engine`].
pub struct EngineBuilder<S, C = NoCache> {
    store: S,
    cache: C,
    use_object_caches: bool,
}

impl<S> EngineBuilder<S, NoCache> {
    /// Creates a new builder with default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: NoCache,
            use_object_caches: true,
        }
    }
}

impl<S, C> EngineBuilder<S, C> {
    /// Enables or disables serving queries from cached snapshots.
    pub fn use_object_caches(mut self, on: bool) -> Self {
        self.use_object_caches = on;
        self
    }

    /// Applies cache settings that do not depend on the cache type.
    pub fn settings(self, settings: &CacheSettings) -> Self {
        self.use_object_caches(settings.use_object_caches)
    }

    /// Sets the cache implementation.
    pub fn cache<C2: Cache>(self, cache: C2) -> EngineBuilder<S, C2> {
        EngineBuilder {
            store: self.store,
            cache,
            use_object_caches: self.use_object_caches,
        }
    }

    /// Builds the engine.
    pub fn build(self) -> Engine<S, C> {
        Engine {
            store: self.store,
            cache: self.cache,
            use_object_caches: self.use_object_caches,
        }
    }
}

impl<S, C> Engine<S, C>
where
    S: Store,
    C: Cache,
{
    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the permissions a role holds within an instance.
    ///
    /// With `model_name` set, only that model's records are returned. An
    /// unknown role or model yields an empty vector.
    pub async fn role_permissions(
        &self,
        role: &RoleId,
        instance: &InstanceId,
        model_name: Option<&ModelName>,
    ) -> Result<Vec<FieldPermission>> {
        let adjuncts = self.adjuncts(instance).await?;
        Ok(adjuncts.role_permissions(role, model_name))
    }

    /// Returns the effective permissions of a user within an instance.
    ///
    /// Anonymous users and users without a role in the instance get the
    /// instance's default role.
    pub async fn permissions(
        &self,
        user: Option<&UserId>,
        instance: &InstanceId,
        model_name: Option<&ModelName>,
    ) -> Result<Vec<FieldPermission>> {
        let adjuncts = self.adjuncts(instance).await?;
        let role = adjuncts.resolve_role(user);
        Ok(adjuncts.role_permissions(role, model_name))
    }

    /// Returns the role a user resolves to within an instance.
    pub async fn user_role(&self, user: Option<&UserId>, instance: &InstanceId) -> Result<RoleId> {
        let adjuncts = self.adjuncts(instance).await?;
        Ok(adjuncts.resolve_role(user).clone())
    }

    /// Returns a user's level on one field, [`PermissionLevel::None`] when no
    /// record exists.
    pub async fn permission_level(
        &self,
        user: Option<&UserId>,
        instance: &InstanceId,
        model_name: &ModelName,
        field_name: &FieldName,
    ) -> Result<PermissionLevel> {
        let perms = self.permissions(user, instance, Some(model_name)).await?;
        Ok(perms
            .iter()
            .find(|perm| &perm.field_name == field_name)
            .map(|perm| perm.permission_level)
            .unwrap_or_default())
    }

    /// Inserts or replaces a field permission and invalidates its instance.
    pub async fn save_field_permission(&self, permission: FieldPermission) -> Result<()> {
        let instance = permission.instance.clone();
        self.instance_record(&instance).await?;
        self.store
            .upsert_field_permission(permission)
            .await
            .map_err(Error::from)?;
        self.invalidate(&instance).await?;
        Ok(())
    }

    /// Deletes a field permission. Invalidates the instance when a record
    /// was removed.
    pub async fn delete_field_permission(&self, key: FieldPermissionKey) -> Result<bool> {
        let instance = key.instance.clone();
        self.instance_record(&instance).await?;
        let removed = self
            .store
            .delete_field_permission(key)
            .await
            .map_err(Error::from)?;
        if removed {
            self.invalidate(&instance).await?;
        }
        Ok(removed)
    }

    /// Assigns a role to a user within an instance, or clears the assignment
    /// so the user falls back to the default role.
    pub async fn assign_role(
        &self,
        user: &UserId,
        instance: &InstanceId,
        role: Option<RoleId>,
    ) -> Result<()> {
        self.instance_record(instance).await?;
        self.store
            .set_user_role(instance.clone(), user.clone(), role)
            .await
            .map_err(Error::from)?;
        self.invalidate(instance).await?;
        Ok(())
    }

    /// Bumps the instance's adjuncts timestamp and drops its cached snapshot.
    ///
    /// Returns the new timestamp. The cached snapshot is dropped even when
    /// the bump fails.
    pub async fn invalidate(&self, instance: &InstanceId) -> Result<u64> {
        self.cache.invalidate_instance(instance).await;
        let timestamp = self
            .store
            .bump_adjuncts_timestamp(instance.clone())
            .await
            .map_err(Error::from)?;
        tracing::debug!(instance = %instance, timestamp, "adjuncts invalidated");
        Ok(timestamp)
    }

    /// Drops every cached snapshot. Safe to call at any time.
    pub async fn clear_caches(&self) {
        self.cache.clear().await;
        tracing::debug!("adjuncts caches cleared");
    }

    async fn instance_record(&self, instance: &InstanceId) -> Result<InstanceRecord> {
        self.store
            .instance(instance.clone())
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::InstanceNotFound {
                instance: instance.clone(),
            })
    }

    async fn adjuncts(&self, instance: &InstanceId) -> Result<Arc<InstanceAdjuncts>> {
        let record = self.instance_record(instance).await?;

        if self.use_object_caches
            && let Some(cached) = self.cache.get_adjuncts(instance).await
        {
            if cached.timestamp() == record.adjuncts_timestamp {
                tracing::trace!(
                    instance = %instance,
                    timestamp = cached.timestamp(),
                    "adjuncts cache hit"
                );
                return Ok(cached);
            }
            tracing::debug!(
                instance = %instance,
                cached = cached.timestamp(),
                current = record.adjuncts_timestamp,
                "adjuncts cache stale"
            );
        }

        // The record was read before the rows below, so a concurrent write can
        // only make this snapshot newer than its timestamp.
        let user_roles = self
            .store
            .user_roles(instance.clone())
            .await
            .map_err(Error::from)?;
        let permissions = self
            .store
            .field_permissions(instance.clone())
            .await
            .map_err(Error::from)?;
        let adjuncts = Arc::new(InstanceAdjuncts::build(&record, user_roles, permissions));
        tracing::debug!(
            instance = %instance,
            timestamp = adjuncts.timestamp(),
            permissions = adjuncts.len(),
            "adjuncts loaded"
        );

        if self.use_object_caches {
            self.cache
                .set_adjuncts(instance, Arc::clone(&adjuncts))
                .await;
        }
        Ok(adjuncts)
    }
}
