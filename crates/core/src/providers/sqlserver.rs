//! SQL Server transient error numbers
//!
//! Covers lock contention, transport loss, and the throttling / failover
//! family Azure SQL reports while a database moves between nodes.

use super::classifier::CodeClassifier;
use super::ProviderKind;

/// Transaction was chosen as deadlock victim
pub const DEADLOCK_VICTIM: i64 = 1205;
/// Lock request time out period exceeded
pub const LOCK_REQUEST_TIMEOUT: i64 = 1222;
/// Client-side timeout raised by the driver
pub const CLIENT_TIMEOUT: i64 = -2;
/// Snapshot isolation update conflict
pub const SNAPSHOT_UPDATE_CONFLICT: i64 = 3960;

pub const TRANSIENT_ERRORS: &[i64] = &[
    DEADLOCK_VICTIM,
    LOCK_REQUEST_TIMEOUT,
    CLIENT_TIMEOUT,
    // transport-level loss / host unreachable
    233,
    64,
    10053,
    10054,
    10060,
    // cannot open database requested by the login
    4060,
    // service busy / unavailable
    40197,
    40501,
    40613,
    // resource limits
    10928,
    10929,
    // too many requests
    49918,
    49919,
    49920,
    SNAPSHOT_UPDATE_CONFLICT,
];

pub static CLASSIFIER: CodeClassifier =
    CodeClassifier::new(ProviderKind::SqlServer, TRANSIENT_ERRORS, &[]);
