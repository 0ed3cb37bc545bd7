use kuet_core::model::AnswerAllPolicy;

use crate::error::SettingsError;

/// Environment variable selecting the answer-all policy.
pub const POLICY_ENV: &str = "KUET_ANSWER_ALL_POLICY";

/// Tunables for completion evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionSettings {
    pub answer_all_policy: AnswerAllPolicy,
}

impl CompletionSettings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidPolicy` for an unrecognised policy name.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, treating unset or blank values as defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidPolicy` for an unrecognised policy name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let answer_all_policy = match lookup(POLICY_ENV) {
            Some(raw) if !raw.trim().is_empty() => {
                AnswerAllPolicy::parse(&raw).ok_or(SettingsError::InvalidPolicy {
                    key: POLICY_ENV,
                    raw,
                })?
            }
            _ => AnswerAllPolicy::default(),
        };
        Ok(Self { answer_all_policy })
    }

    #[must_use]
    pub fn with_policy(policy: AnswerAllPolicy) -> Self {
        Self {
            answer_all_policy: policy,
        }
    }
}
