//! Per-engine connection-string rules
//!
//! Keys are stored lowercase. A required group is satisfied when any one of
//! its keys is present with a non-empty value.

use crate::providers::ProviderKind;

#[derive(Debug, PartialEq, Eq)]
pub struct ConnectionRules {
    pub provider: ProviderKind,
    pub required: &'static [&'static [&'static str]],
    pub known: &'static [&'static str],
    pub integer: &'static [&'static str],
    pub boolean: &'static [&'static str],
}

impl ConnectionRules {
    pub fn is_known(&self, key: &str) -> bool {
        self.known.contains(&key)
    }

    pub fn is_integer(&self, key: &str) -> bool {
        self.integer.contains(&key)
    }

    pub fn is_boolean(&self, key: &str) -> bool {
        self.boolean.contains(&key)
    }
}

pub static SQLSERVER: ConnectionRules = ConnectionRules {
    provider: ProviderKind::SqlServer,
    required: &[&["server", "data source", "address", "addr", "network address"]],
    known: &[
        "server",
        "data source",
        "address",
        "addr",
        "network address",
        "database",
        "initial catalog",
        "user id",
        "uid",
        "user",
        "password",
        "pwd",
        "integrated security",
        "trusted_connection",
        "encrypt",
        "trustservercertificate",
        "trust server certificate",
        "connect timeout",
        "connection timeout",
        "timeout",
        "command timeout",
        "application name",
        "app",
        "applicationintent",
        "multipleactiveresultsets",
        "multisubnetfailover",
        "pooling",
        "min pool size",
        "max pool size",
        "packet size",
        "persist security info",
        "workstation id",
        "failover partner",
        "connectretrycount",
        "connectretryinterval",
    ],
    integer: &[
        "connect timeout",
        "connection timeout",
        "timeout",
        "command timeout",
        "min pool size",
        "max pool size",
        "packet size",
        "connectretrycount",
        "connectretryinterval",
    ],
    boolean: &[
        "trusted_connection",
        "trustservercertificate",
        "trust server certificate",
        "multipleactiveresultsets",
        "multisubnetfailover",
        "pooling",
        "persist security info",
    ],
};

pub static POSTGRESQL: ConnectionRules = ConnectionRules {
    provider: ProviderKind::PostgreSql,
    required: &[&["host", "server"]],
    known: &[
        "host",
        "server",
        "port",
        "database",
        "db",
        "username",
        "user id",
        "userid",
        "user",
        "password",
        "pwd",
        "ssl mode",
        "sslmode",
        "trust server certificate",
        "timeout",
        "command timeout",
        "pooling",
        "minimum pool size",
        "maximum pool size",
        "keepalive",
        "application name",
        "search path",
        "include error detail",
    ],
    integer: &[
        "port",
        "timeout",
        "command timeout",
        "minimum pool size",
        "maximum pool size",
        "keepalive",
    ],
    boolean: &["trust server certificate", "pooling", "include error detail"],
};

pub static MYSQL: ConnectionRules = ConnectionRules {
    provider: ProviderKind::MySql,
    required: &[&["server", "host", "data source", "datasource", "address", "addr"]],
    known: &[
        "server",
        "host",
        "data source",
        "datasource",
        "address",
        "addr",
        "port",
        "database",
        "initial catalog",
        "user id",
        "uid",
        "user",
        "username",
        "password",
        "pwd",
        "sslmode",
        "ssl mode",
        "connection timeout",
        "connect timeout",
        "default command timeout",
        "pooling",
        "minimum pool size",
        "maximum pool size",
        "allow user variables",
        "allowuservariables",
        "convert zero datetime",
        "allow public key retrieval",
        "character set",
        "charset",
    ],
    integer: &[
        "port",
        "connection timeout",
        "connect timeout",
        "default command timeout",
        "minimum pool size",
        "maximum pool size",
    ],
    boolean: &[
        "pooling",
        "allow user variables",
        "allowuservariables",
        "convert zero datetime",
        "allow public key retrieval",
    ],
};

pub static SQLITE: ConnectionRules = ConnectionRules {
    provider: ProviderKind::Sqlite,
    required: &[&["data source", "datasource", "filename"]],
    known: &[
        "data source",
        "datasource",
        "filename",
        "mode",
        "cache",
        "password",
        "foreign keys",
        "recursive triggers",
        "default timeout",
        "pooling",
        "version",
        "journal mode",
        "synchronous",
        "read only",
    ],
    integer: &["default timeout", "version"],
    boolean: &["foreign keys", "recursive triggers", "pooling", "read only"],
};

pub static ORACLE: ConnectionRules = ConnectionRules {
    provider: ProviderKind::Oracle,
    required: &[&["data source", "datasource"], &["user id", "uid", "user"]],
    known: &[
        "data source",
        "datasource",
        "user id",
        "uid",
        "user",
        "password",
        "pwd",
        "connection timeout",
        "connection lifetime",
        "pooling",
        "min pool size",
        "max pool size",
        "incr pool size",
        "decr pool size",
        "statement cache size",
        "dba privilege",
        "proxy user id",
        "proxy password",
        "validate connection",
        "persist security info",
    ],
    integer: &[
        "connection timeout",
        "connection lifetime",
        "min pool size",
        "max pool size",
        "incr pool size",
        "decr pool size",
        "statement cache size",
    ],
    boolean: &["pooling", "validate connection", "persist security info"],
};

pub fn rules_for(kind: ProviderKind) -> &'static ConnectionRules {
    match kind {
        ProviderKind::SqlServer => &SQLSERVER,
        ProviderKind::PostgreSql => &POSTGRESQL,
        ProviderKind::MySql => &MYSQL,
        ProviderKind::Sqlite => &SQLITE,
        ProviderKind::Oracle => &ORACLE,
    }
}
