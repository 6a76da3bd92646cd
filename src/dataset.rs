//! Dataset identifiers
//!
//! A [`DatasetId`] names both the remote resource to fetch (an ASN such as
//! `AS14593`) and the table holding its prefixes. The only way to build one
//! is through [`DatasetId::parse`], so any value of this type is known to
//! consist of uppercase ASCII letters and digits.

use crate::reconcile::ReconcileError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Default identifier used by the scheduled trigger
pub const DEFAULT_ASN: &str = "AS14593";

/// Validated dataset identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetId(String);

impl DatasetId {
    /// Validate an identifier token against `^[A-Z0-9]+$`
    pub fn parse(identifier: &str) -> Result<Self, ReconcileError> {
        if is_valid_identifier(identifier) {
            Ok(DatasetId(identifier.to_string()))
        } else {
            Err(ReconcileError::InvalidIdentifier(identifier.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quoted table name for use in statement text
    ///
    /// Identifiers such as `14593` are not valid bare SQL names, so the name
    /// is always double-quoted. Quoting cannot be escaped since the value
    /// never contains a quote character.
    pub fn table_name(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

impl Default for DatasetId {
    /// The scheduled dataset, [`DEFAULT_ASN`]
    fn default() -> Self {
        DatasetId(DEFAULT_ASN.to_string())
    }
}

impl FromStr for DatasetId {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DatasetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for DatasetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        for id in ["AS14593", "AS1", "14593", "RIPE", "A"] {
            let parsed = DatasetId::parse(id).unwrap();
            assert_eq!(parsed.as_str(), id);
        }
    }

    #[test]
    fn test_parse_invalid() {
        for id in [
            "",
            "as14593",
            "AS 14593",
            "AS14593;",
            "AS14593\"; DROP TABLE x; --",
            "AS-14593",
            "ÄS1",
        ] {
            match DatasetId::parse(id) {
                Err(ReconcileError::InvalidIdentifier(v)) => assert_eq!(v, id),
                other => panic!("expected InvalidIdentifier for {:?}, got {:?}", id, other),
            }
        }
    }

    #[test]
    fn test_default_is_valid() {
        let id = DatasetId::default();
        assert_eq!(DatasetId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn test_table_name_is_quoted() {
        let id: DatasetId = "14593".parse().unwrap();
        assert_eq!(id.table_name(), "\"14593\"");
    }

    #[test]
    fn test_serialize_as_string() {
        let id = DatasetId::parse("AS14593").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"AS14593\"");
    }
}
