use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── STATE ────────────────────────────────────────────────────────────────────
//

/// Completion state of one rule for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    Incomplete,
    Complete,
}

impl CompletionState {
    /// Integer code used by the host completion API.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            CompletionState::Incomplete => 0,
            CompletionState::Complete => 1,
        }
    }

    #[must_use]
    pub fn from_bool(done: bool) -> Self {
        if done {
            CompletionState::Complete
        } else {
            CompletionState::Incomplete
        }
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        matches!(self, CompletionState::Complete)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionState::Incomplete => "incomplete",
            CompletionState::Complete => "complete",
        }
    }
}

impl fmt::Display for CompletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── RULES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown completion rule: {0}")]
pub struct ParseRuleError(pub String);

/// Completion rule identifiers known to a kuet activity.
///
/// `AnswerAll` is kuet's own rule; the grade rules are built into the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompletionRule {
    #[serde(rename = "completionanswerall")]
    AnswerAll,
    #[serde(rename = "completionusegrade")]
    UseGrade,
    #[serde(rename = "completionpassgrade")]
    PassGrade,
}

/// Rules kuet defines on top of the host's built-in ones.
pub const CUSTOM_RULES: [CompletionRule; 1] = [CompletionRule::AnswerAll];

/// Display order shared with the host's built-in rules.
pub const SORT_ORDER: [CompletionRule; 3] = [
    CompletionRule::AnswerAll,
    CompletionRule::UseGrade,
    CompletionRule::PassGrade,
];

impl CompletionRule {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionRule::AnswerAll => "completionanswerall",
            CompletionRule::UseGrade => "completionusegrade",
            CompletionRule::PassGrade => "completionpassgrade",
        }
    }

    #[must_use]
    pub fn is_custom(self) -> bool {
        CUSTOM_RULES.contains(&self)
    }
}

impl fmt::Display for CompletionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompletionRule {
    type Err = ParseRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completionanswerall" => Ok(CompletionRule::AnswerAll),
            "completionusegrade" => Ok(CompletionRule::UseGrade),
            "completionpassgrade" => Ok(CompletionRule::PassGrade),
            other => Err(ParseRuleError(other.to_owned())),
        }
    }
}

//
// ─── POLICY ───────────────────────────────────────────────────────────────────
//

/// How strictly "answer all questions" is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerAllPolicy {
    /// Any recorded response completes the rule.
    #[default]
    AnyResponse,
    /// Every question of each session the user took part in must be answered.
    EveryQuestion,
}

impl AnswerAllPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerAllPolicy::AnyResponse => "any",
            AnswerAllPolicy::EveryQuestion => "every-question",
        }
    }

    /// Parses the short names accepted in configuration.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "any-response" => Some(AnswerAllPolicy::AnyResponse),
            "every-question" | "every" | "strict" => Some(AnswerAllPolicy::EveryQuestion),
            _ => None,
        }
    }
}
