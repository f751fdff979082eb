//! Connection-string validation
//!
//! A pure check of `key=value;key=value` strings against static per-engine
//! rules. It reports the first problem found as a [`ValidationOutcome`]; it
//! never opens a connection and nothing in the transaction scope calls it.
//!
//! Checks run in order: provider, emptiness, syntax, unknown keys, typed
//! values, required keys.

pub mod rules;

use std::fmt;

use serde::Serialize;

pub use rules::{rules_for, ConnectionRules};

use crate::providers::ProviderKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "parameter", rename_all = "snake_case")]
pub enum ValidationStatus {
    Ok,
    MissingProvider,
    MissingConnectionString,
    Malformed,
    UnsupportedProvider,
    MissingRequiredParameter(String),
    UnsupportedOption(String),
    InvalidParameterValue(String),
}

impl ValidationStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub status: ValidationStatus,
    pub message: String,
}

impl ValidationOutcome {
    fn new(status: ValidationStatus, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn ok() -> Self {
        Self::new(ValidationStatus::Ok, "connection string is valid")
    }

    pub fn missing_provider() -> Self {
        Self::new(ValidationStatus::MissingProvider, "no provider name given")
    }

    pub fn unsupported_provider(alias: &str) -> Self {
        Self::new(
            ValidationStatus::UnsupportedProvider,
            format!("provider '{}' is not supported", alias.trim()),
        )
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validate `raw` for the built-in provider named `provider`
pub fn validate_connection_string(provider: &str, raw: &str) -> ValidationOutcome {
    if provider.trim().is_empty() {
        return ValidationOutcome::missing_provider();
    }
    match provider.parse::<ProviderKind>() {
        Ok(kind) => validate_with_rules(rules_for(kind), raw),
        Err(_) => ValidationOutcome::unsupported_provider(provider),
    }
}

/// Validate `raw` against an explicit rule set
pub fn validate_with_rules(rules: &ConnectionRules, raw: &str) -> ValidationOutcome {
    if raw.trim().is_empty() {
        return ValidationOutcome::new(
            ValidationStatus::MissingConnectionString,
            "connection string is empty",
        );
    }

    let pairs = match parse_pairs(raw) {
        Ok(pairs) => pairs,
        Err(segment) => {
            return ValidationOutcome::new(
                ValidationStatus::Malformed,
                format!("segment '{segment}' is not a key=value pair"),
            );
        }
    };

    if let Some((key, _)) = pairs.iter().find(|(key, _)| !rules.is_known(key)) {
        return ValidationOutcome::new(
            ValidationStatus::UnsupportedOption(key.clone()),
            format!("option '{key}' is not recognised by {}", rules.provider),
        );
    }

    for (key, value) in &pairs {
        let valid = if rules.is_integer(key) {
            value.parse::<u32>().is_ok()
        } else if rules.is_boolean(key) {
            parse_bool(value).is_some()
        } else {
            true
        };
        if !valid {
            return ValidationOutcome::new(
                ValidationStatus::InvalidParameterValue(key.clone()),
                format!("value '{value}' is not valid for '{key}'"),
            );
        }
    }

    for group in rules.required {
        let present = group
            .iter()
            .any(|name| pairs.iter().any(|(key, value)| key.as_str() == *name && !value.is_empty()));
        if !present {
            let name = group.first().copied().unwrap_or_default();
            return ValidationOutcome::new(
                ValidationStatus::MissingRequiredParameter(name.to_owned()),
                format!("required parameter '{name}' is missing"),
            );
        }
    }

    ValidationOutcome::ok()
}

/// Split into lowercase keys and trimmed, unquoted values
///
/// Empty segments (`a=1;;b=2`, trailing `;`) are skipped. The offending
/// segment is returned when a pair has no `=` or an empty key.
fn parse_pairs(raw: &str) -> Result<Vec<(String, String)>, String> {
    let mut pairs = Vec::new();
    for segment in raw.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let Some((key, value)) = segment.split_once('=') else {
            return Err(segment.to_owned());
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(segment.to_owned());
        }
        pairs.push((normalize_key(key), unquote(value.trim()).to_owned()));
    }
    Ok(pairs)
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}
