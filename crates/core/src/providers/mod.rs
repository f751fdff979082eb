//! Provider model
//!
//! One [`ProviderKind`] per supported engine, each with a static
//! [`CodeClassifier`] allow-list and connection-string rules. The
//! [`ProviderRegistry`] maps names and aliases to those entries explicitly;
//! [`ProviderRetry`] binds the retry engine to one engine's classifier.

pub mod classifier;
pub mod fault;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod registry;
pub mod retry;
pub mod sqlite;
pub mod sqlserver;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use classifier::CodeClassifier;
pub use fault::{DriverError, DriverFault};
pub use registry::{ProviderEntry, ProviderRegistry, RegistryError};
pub use retry::ProviderRetry;

/// Relational engines with a built-in classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    SqlServer,
    PostgreSql,
    MySql,
    Sqlite,
    Oracle,
}

impl ProviderKind {
    pub const ALL: [Self; 5] =
        [Self::SqlServer, Self::PostgreSql, Self::MySql, Self::Sqlite, Self::Oracle];

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::SqlServer => "sqlserver",
            Self::PostgreSql => "postgresql",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Oracle => "oracle",
        }
    }

    /// Accepted alternative spellings, canonical name excluded
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::SqlServer => &["mssql", "sql server", "microsoft.data.sqlclient"],
            Self::PostgreSql => &["postgres", "pgsql", "npgsql"],
            Self::MySql => &["mariadb", "mysqlconnector"],
            Self::Sqlite => &["sqlite3", "microsoft.data.sqlite"],
            Self::Oracle => &["oracle.manageddataaccess", "odp.net"],
        }
    }

    pub fn classifier(self) -> &'static CodeClassifier {
        match self {
            Self::SqlServer => &sqlserver::CLASSIFIER,
            Self::PostgreSql => &postgres::CLASSIFIER,
            Self::MySql => &mysql::CLASSIFIER,
            Self::Sqlite => &sqlite::CLASSIFIER,
            Self::Oracle => &oracle::CLASSIFIER,
        }
    }

    fn matches(self, alias: &str) -> bool {
        self.name() == alias || self.aliases().contains(&alias)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = RegistryError;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alias = registry::normalize_alias(s);
        if alias.is_empty() {
            return Err(RegistryError::EmptyAlias);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.matches(&alias))
            .ok_or(RegistryError::UnknownProvider { alias })
    }
}
