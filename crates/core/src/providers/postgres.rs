//! PostgreSQL transient SQLSTATEs

use super::classifier::CodeClassifier;
use super::ProviderKind;

pub const SERIALIZATION_FAILURE: &str = "40001";
pub const DEADLOCK_DETECTED: &str = "40P01";

pub const TRANSIENT_STATES: &[&str] = &[
    SERIALIZATION_FAILURE,
    DEADLOCK_DETECTED,
    "55P03", // lock_not_available
    "53300", // too_many_connections
    "57P03", // cannot_connect_now
    "08000", // connection_exception
    "08001", // sqlclient_unable_to_establish_sqlconnection
    "08003", // connection_does_not_exist
    "08004", // sqlserver_rejected_establishment_of_sqlconnection
    "08006", // connection_failure
];

pub static CLASSIFIER: CodeClassifier =
    CodeClassifier::new(ProviderKind::PostgreSql, &[], TRANSIENT_STATES);
