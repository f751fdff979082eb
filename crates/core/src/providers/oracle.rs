//! Oracle transient error numbers (`ORA-nnnnn` without the prefix)

use super::classifier::CodeClassifier;
use super::ProviderKind;

pub const TRANSIENT_ERRORS: &[i64] = &[
    18,    // maximum number of sessions exceeded
    20,    // maximum number of processes exceeded
    54,    // resource busy and acquire with NOWAIT specified
    60,    // deadlock detected while waiting for resource
    8177,  // can't serialize access for this transaction
    3113,  // end-of-file on communication channel
    3114,  // not connected to ORACLE
    12170, // TNS: connect timeout occurred
    12516, // TNS: listener could not find available handler
    12519, // TNS: no appropriate service handler found
    12520, // TNS: listener could not find available handler for requested type
    12541, // TNS: no listener
    12543, // TNS: destination host unreachable
];

pub static CLASSIFIER: CodeClassifier =
    CodeClassifier::new(ProviderKind::Oracle, TRANSIENT_ERRORS, &[]);
