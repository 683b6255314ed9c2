//! Object identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Namespace used when a key is parsed without one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Errors produced when parsing an [`ObjectKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("object key is empty")]
    Empty,

    #[error("invalid object key '{0}': expected 'namespace/name'")]
    Malformed(String),
}

/// Identity of a stored object: `namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ObjectKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(KeyError::Empty);
        }

        match s.split_once('/') {
            None => Ok(Self::new(DEFAULT_NAMESPACE, s)),
            Some((namespace, name))
                if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(namespace, name))
            }
            Some(_) => Err(KeyError::Malformed(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_namespace() {
        let key: ObjectKey = "tools/logger".parse().unwrap();
        assert_eq!(key, ObjectKey::new("tools", "logger"));
        assert_eq!(key.to_string(), "tools/logger");
    }

    #[test]
    fn test_parse_bare_name_uses_default_namespace() {
        let key: ObjectKey = "logger".parse().unwrap();
        assert_eq!(key.namespace, DEFAULT_NAMESPACE);
        assert_eq!(key.name, "logger");
    }

    #[test]
    fn test_parse_rejects_bad_keys() {
        assert_eq!("".parse::<ObjectKey>(), Err(KeyError::Empty));
        assert!(matches!(
            "/logger".parse::<ObjectKey>(),
            Err(KeyError::Malformed(_))
        ));
        assert!(matches!(
            "tools/".parse::<ObjectKey>(),
            Err(KeyError::Malformed(_))
        ));
        assert!(matches!(
            "a/b/c".parse::<ObjectKey>(),
            Err(KeyError::Malformed(_))
        ));
    }
}
