//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;

/// Errors emitted by completion evaluation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionError {
    /// The activity or user reference given at construction is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The rule is not one kuet defines.
    #[error("undefined completion rule: {0}")]
    InvalidRule(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while loading `CompletionSettings`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("invalid {key} value: {raw} (expected `any` or `every-question`)")]
    InvalidPolicy { key: &'static str, raw: String },
}
