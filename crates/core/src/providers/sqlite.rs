use super::classifier::CodeClassifier;
use super::ProviderKind;

pub const SQLITE_BUSY: i64 = 5;
pub const SQLITE_LOCKED: i64 = 6;

pub static CLASSIFIER: CodeClassifier =
    CodeClassifier::new(ProviderKind::Sqlite, &[SQLITE_BUSY, SQLITE_LOCKED], &[]);
