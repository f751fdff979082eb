use std::fmt;
use std::str::FromStr;

use polytx_common::error::CommonError;
use serde::{Deserialize, Serialize};

/// Transaction isolation level requested from each participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
    /// SQL Server row versioning; engines without it map to their closest level
    Snapshot,
}

impl IsolationLevel {
    pub const ALL: [Self; 5] = [
        Self::ReadUncommitted,
        Self::ReadCommitted,
        Self::RepeatableRead,
        Self::Serializable,
        Self::Snapshot,
    ];

    /// SQL keyword form, as used in `SET TRANSACTION ISOLATION LEVEL ...`
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
            Self::Snapshot => "SNAPSHOT",
        }
    }

    /// Whether the level needs stable reads for the whole transaction
    pub fn is_at_least_repeatable_read(self) -> bool {
        !matches!(self, Self::ReadUncommitted | Self::ReadCommitted)
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for IsolationLevel {
    type Err = CommonError;

    /// Accepts the SQL keywords and the snake/camel/kebab spellings
    /// (`READ COMMITTED`, `read_committed`, `ReadCommitted`, `read-committed`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squashed: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match squashed.as_str() {
            "readuncommitted" => Ok(Self::ReadUncommitted),
            "readcommitted" => Ok(Self::ReadCommitted),
            "repeatableread" => Ok(Self::RepeatableRead),
            "serializable" => Ok(Self::Serializable),
            "snapshot" => Ok(Self::Snapshot),
            _ => Err(CommonError::validation_with_value(
                "isolation_level",
                "unknown isolation level",
                s,
            )),
        }
    }
}

impl TryFrom<String> for IsolationLevel {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IsolationLevel> for String {
    fn from(level: IsolationLevel) -> Self {
        level.as_sql().to_owned()
    }
}
