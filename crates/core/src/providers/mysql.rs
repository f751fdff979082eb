//! MySQL / MariaDB transient error numbers

use super::classifier::CodeClassifier;
use super::ProviderKind;

pub const TRANSIENT_ERRORS: &[i64] = &[
    1040, // ER_CON_COUNT_ERROR
    1203, // ER_TOO_MANY_USER_CONNECTIONS
    1205, // ER_LOCK_WAIT_TIMEOUT
    1213, // ER_LOCK_DEADLOCK
    2002, // CR_CONNECTION_ERROR
    2003, // CR_CONN_HOST_ERROR
    2006, // CR_SERVER_GONE_ERROR
    2013, // CR_SERVER_LOST
];

pub static CLASSIFIER: CodeClassifier =
    CodeClassifier::new(ProviderKind::MySql, TRANSIENT_ERRORS, &[]);
