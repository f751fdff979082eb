//! Explicit provider registry
//!
//! Providers are registered by name up front; nothing is discovered at
//! runtime. [`ProviderRegistry::builtin`] carries the five engines under their
//! canonical names and aliases, and callers may add their own aliases or
//! entries with [`ProviderRegistry::register`].

use std::collections::HashMap;

use polytx_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use polytx_common::impl_error_classification;
use thiserror::Error;

use super::classifier::CodeClassifier;
use super::ProviderKind;
use crate::validation::{self, ConnectionRules, ValidationOutcome};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("provider name is empty")]
    EmptyAlias,

    #[error("no provider registered under '{alias}'")]
    UnknownProvider { alias: String },

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_classification!(RegistryError, Common,
    Self::EmptyAlias => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::UnknownProvider { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    }
);

/// What a registered name resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderEntry {
    pub kind: ProviderKind,
    pub classifier: &'static CodeClassifier,
    pub rules: &'static ConnectionRules,
}

impl ProviderEntry {
    /// Built-in classifier and connection rules for `kind`
    pub fn builtin(kind: ProviderKind) -> Self {
        Self { kind, classifier: kind.classifier(), rules: validation::rules_for(kind) }
    }

    /// Entry with a caller-supplied allow-list
    pub fn with_classifier(kind: ProviderKind, classifier: &'static CodeClassifier) -> Self {
        Self { classifier, ..Self::builtin(kind) }
    }
}

/// Name-to-provider table used to pick a classifier and connection rules
///
/// Lookups trim the name and ignore ASCII case, so `" SqlServer "` and
/// `"sqlserver"` resolve to the same entry. An alias maps to exactly one
/// entry; registering it again replaces the earlier one.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = ProviderRegistry::builtin();
/// registry.register("cockroachdb", ProviderEntry::builtin(ProviderKind::PostgreSql))?;
/// let retry = ProviderRetry::from_entry(registry.resolve("CockroachDB")?, options);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: HashMap<String, ProviderEntry>,
}

impl ProviderRegistry {
    /// Registry with no names, for callers that register every alias themselves
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every built-in engine under its name and aliases
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        for kind in ProviderKind::ALL {
            let entry = ProviderEntry::builtin(kind);
            entries.insert(kind.name().to_owned(), entry);
            for alias in kind.aliases() {
                entries.insert((*alias).to_owned(), entry);
            }
        }
        Self { entries }
    }

    /// Register `entry` under `alias`, returning the entry it replaces
    ///
    /// # Errors
    ///
    /// [`RegistryError::EmptyAlias`] when `alias` is blank after trimming.
    pub fn register(
        &mut self,
        alias: &str,
        entry: ProviderEntry,
    ) -> Result<Option<ProviderEntry>, RegistryError> {
        let alias = normalize_alias(alias);
        if alias.is_empty() {
            return Err(RegistryError::EmptyAlias);
        }
        tracing::debug!(alias = %alias, provider = %entry.kind, "Registering provider alias");
        Ok(self.entries.insert(alias, entry))
    }

    /// Look up the entry registered under `alias`
    ///
    /// # Errors
    ///
    /// [`RegistryError::EmptyAlias`] for a blank name and
    /// [`RegistryError::UnknownProvider`] when nothing is registered under it.
    pub fn resolve(&self, alias: &str) -> Result<&ProviderEntry, RegistryError> {
        let alias = normalize_alias(alias);
        if alias.is_empty() {
            return Err(RegistryError::EmptyAlias);
        }
        self.entries.get(&alias).ok_or(RegistryError::UnknownProvider { alias })
    }

    /// Whether `alias` resolves to an entry
    pub fn contains(&self, alias: &str) -> bool {
        self.resolve(alias).is_ok()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Validate `raw` against the rules of the provider registered as `alias`
    ///
    /// Never fails: a blank alias yields `MissingProvider` and an unknown one
    /// `UnsupportedProvider` in the returned outcome.
    pub fn validate_connection_string(&self, alias: &str, raw: &str) -> ValidationOutcome {
        if normalize_alias(alias).is_empty() {
            return ValidationOutcome::missing_provider();
        }
        match self.resolve(alias) {
            Ok(entry) => validation::validate_with_rules(entry.rules, raw),
            Err(_) => ValidationOutcome::unsupported_provider(alias),
        }
    }
}

pub(crate) fn normalize_alias(alias: &str) -> String {
    alias.trim().to_ascii_lowercase()
}
