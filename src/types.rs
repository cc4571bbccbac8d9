use crate::error::{Error, Result};
use std::borrow::Borrow;
use std::fmt;

const MAX_NAME_LEN: usize = 255;

fn validate_simple_name(value: &str, kind: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidId(format!("{kind} must not be empty")));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(Error::InvalidId(format!(
            "{kind} length must be <= {MAX_NAME_LEN}"
        )));
    }
    if !trimmed.chars().all(is_allowed_name_char) {
        return Err(Error::InvalidId(format!(
            "{kind} contains invalid characters"
        )));
    }
    Ok(trimmed.to_string())
}

// Custom field names look like `udf:Stewardship`, model names like `Plot`.
fn is_allowed_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, ':' | '_' | '-' | '.')
}

macro_rules! define_name_type {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            /// Creates a validated value.
            pub fn new(value: impl AsRef<str>) -> Result<Self> {
                validate_simple_name(value.as_ref(), $kind).map(Self)
            }

            /// Creates a value from a trusted string without validation.
            pub fn from_string(value: String) -> Self {
                Self(value)
            }

            /// Returns the underlying string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $name {
            type Error = Error;

            fn try_from(value: &str) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from_string(value)
            }
        }
    };
}

define_name_type!(
    /// Instance (tenant) identifier.
    InstanceId,
    "instance id"
);
define_name_type!(
    /// Role identifier, scoped to an instance.
    RoleId,
    "role id"
);
define_name_type!(
    /// User identifier.
    UserId,
    "user id"
);
define_name_type!(
    /// Model name a field permission applies to, e.g. `Plot`.
    ModelName,
    "model name"
);
define_name_type!(
    /// Field name within a model, e.g. `geom`.
    FieldName,
    "field name"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_should_trim_whitespace() {
        let model = ModelName::try_from("  Plot ").expect("model name");
        assert_eq!(model.as_str(), "Plot");
    }

    #[test]
    fn names_should_keep_case() {
        let model = ModelName::try_from("TreePhoto").expect("model name");
        assert_ne!(model, ModelName::from_string("treephoto".to_string()));
    }

    #[test]
    fn field_name_should_accept_udf_prefix() {
        let field = FieldName::try_from("udf:Stewardship").expect("field name");
        assert_eq!(field.to_string(), "udf:Stewardship");
    }

    #[test]
    fn names_should_reject_empty_input() {
        let err = RoleId::try_from("   ").expect_err("must reject");
        assert!(err.to_string().contains("role id"));
    }

    #[test]
    fn names_should_reject_invalid_chars() {
        let err = InstanceId::try_from("city one").expect_err("must reject");
        assert!(err.to_string().contains("instance id"));
    }
}
