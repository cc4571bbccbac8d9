use std::collections::{BTreeMap, HashMap};

use crate::permission::FieldPermission;
use crate::store::InstanceRecord;
use crate::types::{ModelName, RoleId, UserId};

/// Immutable snapshot of the permission-related state of one instance.
///
/// A snapshot is valid for exactly one `adjuncts_timestamp`; the engine
/// discards it as soon as the instance reports a different value.
#[derive(Debug, Clone)]
pub struct InstanceAdjuncts {
    timestamp: u64,
    default_role: RoleId,
    user_roles: HashMap<UserId, RoleId>,
    role_permissions: HashMap<RoleId, BTreeMap<ModelName, Vec<FieldPermission>>>,
}

impl InstanceAdjuncts {
    /// Builds a snapshot from store rows.
    ///
    /// Permissions are grouped by role then model, sorted by field name.
    pub fn build(
        record: &InstanceRecord,
        user_roles: Vec<(UserId, RoleId)>,
        permissions: Vec<FieldPermission>,
    ) -> Self {
        let mut role_permissions: HashMap<RoleId, BTreeMap<ModelName, Vec<FieldPermission>>> =
            HashMap::new();
        for permission in permissions {
            role_permissions
                .entry(permission.role.clone())
                .or_default()
                .entry(permission.model_name.clone())
                .or_default()
                .push(permission);
        }
        for models in role_permissions.values_mut() {
            for perms in models.values_mut() {
                perms.sort_by(|a, b| a.field_name.cmp(&b.field_name));
            }
        }

        Self {
            timestamp: record.adjuncts_timestamp,
            default_role: record.default_role.clone(),
            user_roles: user_roles.into_iter().collect(),
            role_permissions,
        }
    }

    /// Timestamp the snapshot was loaded at.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Resolves the role of a user, falling back to the default role.
    pub fn resolve_role(&self, user: Option<&UserId>) -> &RoleId {
        user.and_then(|user| self.user_roles.get(user)).unwrap_or(&self.default_role)
    }

    /// Returns permissions of a role, optionally restricted to one model.
    pub fn role_permissions(
        &self,
        role: &RoleId,
        model_name: Option<&ModelName>,
    ) -> Vec<FieldPermission> {
        let Some(models) = self.role_permissions.get(role) else {
            return Vec::new();
        };
        match model_name {
            Some(model_name) => models.get(model_name).cloned().unwrap_or_default(),
            None => models.values().flatten().cloned().collect(),
        }
    }

    /// Total number of records in the snapshot.
    pub fn len(&self) -> usize {
        self.role_permissions
            .values()
            .flat_map(|models| models.values())
            .map(Vec::len)
            .sum()
    }

    /// Returns whether the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionLevel;
    use crate::types::{FieldName, InstanceId};

    fn perm(role: &str, model: &str, field: &str, level: PermissionLevel) -> FieldPermission {
        FieldPermission::new(
            ModelName::try_from(model).unwrap(),
            FieldName::try_from(field).unwrap(),
            RoleId::try_from(role).unwrap(),
            InstanceId::try_from("city").unwrap(),
            level,
        )
    }

    fn record() -> InstanceRecord {
        InstanceRecord {
            adjuncts_timestamp: 4,
            default_role: RoleId::try_from("public").unwrap(),
        }
    }

    #[test]
    fn build_should_group_and_sort_permissions() {
        let adjuncts = InstanceAdjuncts::build(
            &record(),
            Vec::new(),
            vec![
                perm("editor", "Tree", "height", PermissionLevel::WriteDirectly),
                perm("editor", "Plot", "width", PermissionLevel::ReadOnly),
                perm("editor", "Plot", "geom", PermissionLevel::WriteDirectly),
                perm("public", "Plot", "geom", PermissionLevel::ReadOnly),
            ],
        );
        let editor = RoleId::try_from("editor").unwrap();

        let all = adjuncts.role_permissions(&editor, None);
        let fields: Vec<&str> = all.iter().map(|p| p.field_name.as_str()).collect();
        assert_eq!(fields, vec!["geom", "width", "height"]);

        let plot = ModelName::try_from("Plot").unwrap();
        assert_eq!(adjuncts.role_permissions(&editor, Some(&plot)).len(), 2);
        assert_eq!(adjuncts.len(), 4);
        assert_eq!(adjuncts.timestamp(), 4);
    }

    #[test]
    fn unknown_role_or_model_should_be_empty() {
        let adjuncts = InstanceAdjuncts::build(
            &record(),
            Vec::new(),
            vec![perm("editor", "Plot", "geom", PermissionLevel::ReadOnly)],
        );
        let editor = RoleId::try_from("editor").unwrap();
        let missing_role = RoleId::try_from("ghost").unwrap();
        let missing_model = ModelName::try_from("foo").unwrap();

        assert!(adjuncts.role_permissions(&editor, Some(&missing_model)).is_empty());
        assert!(adjuncts.role_permissions(&missing_role, None).is_empty());
    }

    #[test]
    fn resolve_role_should_fall_back_to_default() {
        let alice = UserId::try_from("alice").unwrap();
        let bob = UserId::try_from("bob").unwrap();
        let adjuncts = InstanceAdjuncts::build(
            &record(),
            vec![(alice.clone(), RoleId::try_from("editor").unwrap())],
            Vec::new(),
        );

        assert_eq!(adjuncts.resolve_role(Some(&alice)).as_str(), "editor");
        assert_eq!(adjuncts.resolve_role(Some(&bob)).as_str(), "public");
        assert_eq!(adjuncts.resolve_role(None).as_str(), "public");
    }
}
