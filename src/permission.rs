use crate::error::{Error, Result};
use crate::types::{FieldName, InstanceId, ModelName, RoleId};
use std::fmt;

/// Access level a role holds on a single model field.
///
/// Levels are ordered: every level grants what the lower ones grant.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PermissionLevel {
    /// The field is hidden.
    #[default]
    None = 0,
    /// The field can be read.
    ReadOnly = 1,
    /// Writes are queued for review before they apply.
    WriteWithAudit = 2,
    /// Writes apply immediately.
    WriteDirectly = 3,
}

impl PermissionLevel {
    /// Returns the numeric value stored by the backing database.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns whether the level allows reading the field.
    pub fn allows_reads(self) -> bool {
        self >= Self::ReadOnly
    }

    /// Returns whether the level allows writing the field, audited or not.
    pub fn allows_writes(self) -> bool {
        self >= Self::WriteWithAudit
    }

    /// Returns whether writes at this level must go through review.
    pub fn requires_audit(self) -> bool {
        self == Self::WriteWithAudit
    }
}

impl TryFrom<u8> for PermissionLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::ReadOnly),
            2 => Ok(Self::WriteWithAudit),
            3 => Ok(Self::WriteDirectly),
            other => Err(Error::InvalidPermissionLevel(other)),
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::ReadOnly => "read_only",
            Self::WriteWithAudit => "write_with_audit",
            Self::WriteDirectly => "write_directly",
        };
        f.write_str(name)
    }
}

/// Unique key of a field permission record.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldPermissionKey {
    /// Model the field belongs to.
    pub model_name: ModelName,
    /// Field name.
    pub field_name: FieldName,
    /// Role holding the permission.
    pub role: RoleId,
    /// Owning instance.
    pub instance: InstanceId,
}

impl FieldPermissionKey {
    /// Creates a key from its parts.
    pub fn new(
        model_name: ModelName,
        field_name: FieldName,
        role: RoleId,
        instance: InstanceId,
    ) -> Self {
        Self {
            model_name,
            field_name,
            role,
            instance,
        }
    }
}

/// A rule granting a role a [`PermissionLevel`] on one field of one model.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldPermission {
    /// Model the field belongs to.
    pub model_name: ModelName,
    /// Field name.
    pub field_name: FieldName,
    /// Role holding the permission.
    pub role: RoleId,
    /// Owning instance.
    pub instance: InstanceId,
    /// Granted level.
    pub permission_level: PermissionLevel,
}

impl FieldPermission {
    /// Creates a permission record.
    pub fn new(
        model_name: ModelName,
        field_name: FieldName,
        role: RoleId,
        instance: InstanceId,
        permission_level: PermissionLevel,
    ) -> Self {
        Self {
            model_name,
            field_name,
            role,
            instance,
            permission_level,
        }
    }

    /// Returns the unique key of this record.
    pub fn key(&self) -> FieldPermissionKey {
        FieldPermissionKey::new(
            self.model_name.clone(),
            self.field_name.clone(),
            self.role.clone(),
            self.instance.clone(),
        )
    }

    /// Returns whether this record has the given key.
    pub fn matches_key(&self, key: &FieldPermissionKey) -> bool {
        self.model_name == key.model_name
            && self.field_name == key.field_name
            && self.role == key.role
            && self.instance == key.instance
    }
}
