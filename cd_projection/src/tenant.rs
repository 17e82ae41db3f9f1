//! Validated tenant schema identifiers.
//!
//! Every table lives in a per-tenant Postgres schema. The schema name is the
//! one piece of SQL that cannot be bound as a parameter, so it is only ever
//! built from a `TenantSchema`, which enforces a strict identifier pattern.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;

static SCHEMA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,62}$").expect("valid schema pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantSchema(String);

impl TenantSchema {
    pub fn new(name: impl Into<String>) -> Result<Self, ProjectionError> {
        let name = name.into();
        if SCHEMA_REGEX.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(ProjectionError::InvalidTenant(name))
        }
    }

    /// Derive the tenant from an orchestrator namespace such as `acme-edp-cicd`.
    pub fn from_namespace(namespace: &str, suffix: &str) -> Result<Self, ProjectionError> {
        let tenant = namespace.strip_suffix(suffix).unwrap_or(namespace);
        Self::new(tenant)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Statement selecting this schema for the rest of the current transaction.
    pub fn search_path_statement(&self) -> String {
        // The pattern excludes quotes, so quoting cannot be escaped.
        format!("SET LOCAL search_path TO \"{}\"", self.0)
    }
}

impl fmt::Display for TenantSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantSchema {
    type Error = ProjectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantSchema> for String {
    fn from(value: TenantSchema) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        for name in ["acme", "team_a", "_internal", "t1", "py-test", "acme-prod"] {
            assert_eq!(TenantSchema::new(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn rejects_anything_that_could_escape_the_identifier() {
        for name in ["", "Acme", "acme\"; drop table cd_stage; --", "a b", "1acme", "-acme"] {
            assert!(
                matches!(TenantSchema::new(name), Err(ProjectionError::InvalidTenant(_))),
                "{name:?} should be rejected"
            );
        }
        assert!(TenantSchema::new("a".repeat(64)).is_err());
        assert!(TenantSchema::new("a".repeat(63)).is_ok());
    }

    #[test]
    fn namespace_suffix_is_trimmed() {
        let tenant = TenantSchema::from_namespace("py-test-edp-cicd", "-edp-cicd").unwrap();
        assert_eq!(tenant.as_str(), "py-test");
        assert_eq!(
            tenant.search_path_statement(),
            "SET LOCAL search_path TO \"py-test\""
        );

        let tenant = TenantSchema::from_namespace("acme", "-edp-cicd").unwrap();
        assert_eq!(tenant.as_str(), "acme");
    }

    #[test]
    fn search_path_is_quoted() {
        let tenant = TenantSchema::new("acme").unwrap();
        assert_eq!(tenant.search_path_statement(), "SET LOCAL search_path TO \"acme\"");
    }

    #[test]
    fn deserialization_validates() {
        let ok: TenantSchema = serde_json::from_str("\"acme\"").unwrap();
        assert_eq!(ok.as_str(), "acme");
        assert!(serde_json::from_str::<TenantSchema>("\"ACME;\"").is_err());
    }
}
