use std::collections::BTreeMap;
use std::sync::Arc;

use kuet_core::model::{
    AnswerAllPolicy, CUSTOM_RULES, CompletionRule, CompletionState, Kuet, KuetId, SORT_ORDER,
    UserId,
};
use storage::repository::{KuetRepository, ResponseFilter, ResponseRepository, SessionRepository};

use super::answer_all;
use crate::error::CompletionError;

/// Completion rules kuet adds to the host's built-in ones, evaluated for one
/// user on one activity.
///
/// States are recomputed from storage on every call; nothing is cached.
pub struct CustomCompletion {
    kuet: Kuet,
    user_id: UserId,
    policy: AnswerAllPolicy,
    sessions: Arc<dyn SessionRepository>,
    responses: Arc<dyn ResponseRepository>,
}

impl CustomCompletion {
    /// Build an evaluator for an already loaded activity.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::Configuration` if `user_id` is the reserved id 0.
    pub fn new(
        kuet: Kuet,
        user_id: UserId,
        policy: AnswerAllPolicy,
        sessions: Arc<dyn SessionRepository>,
        responses: Arc<dyn ResponseRepository>,
    ) -> Result<Self, CompletionError> {
        if user_id.value() == 0 {
            tracing::warn!(kuet = %kuet.id(), "rejected completion for user id 0");
            return Err(CompletionError::Configuration(
                "user id 0 does not identify a user".into(),
            ));
        }
        Ok(Self {
            kuet,
            user_id,
            policy,
            sessions,
            responses,
        })
    }

    /// Resolve the activity by id and build an evaluator for it.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::Configuration` if the activity does not exist
    /// or the user id is invalid, and `CompletionError::Storage` if the lookup fails.
    pub async fn load(
        kuets: &dyn KuetRepository,
        kuet_id: KuetId,
        user_id: UserId,
        policy: AnswerAllPolicy,
        sessions: Arc<dyn SessionRepository>,
        responses: Arc<dyn ResponseRepository>,
    ) -> Result<Self, CompletionError> {
        let Some(kuet) = kuets.get_kuet(kuet_id).await? else {
            tracing::warn!(kuet = %kuet_id, "completion requested for unknown activity");
            return Err(CompletionError::Configuration(format!(
                "kuet {kuet_id} could not be resolved"
            )));
        };
        Self::new(kuet, user_id, policy, sessions, responses)
    }

    #[must_use]
    pub fn kuet(&self) -> &Kuet {
        &self.kuet
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Custom rule ids defined by kuet, independent of any instance.
    #[must_use]
    pub fn list_defined_rules() -> &'static [CompletionRule] {
        &CUSTOM_RULES
    }

    #[must_use]
    pub fn is_defined(rule: CompletionRule) -> bool {
        CUSTOM_RULES.contains(&rule)
    }

    /// Defined rules switched on for this activity.
    #[must_use]
    pub fn get_available_custom_rules(&self) -> Vec<CompletionRule> {
        let flags = self.kuet.completion();
        CUSTOM_RULES
            .iter()
            .copied()
            .filter(|rule| match rule {
                CompletionRule::AnswerAll => flags.answer_all,
                CompletionRule::UseGrade | CompletionRule::PassGrade => false,
            })
            .collect()
    }

    #[must_use]
    pub fn is_available(&self, rule: CompletionRule) -> bool {
        self.get_available_custom_rules().contains(&rule)
    }

    /// State of the rule named by its host id.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::InvalidRule` if `rule` is not a defined custom
    /// rule, and `CompletionError::Storage` if the responses cannot be read.
    pub async fn get_state(&self, rule: &str) -> Result<CompletionState, CompletionError> {
        let parsed = rule
            .parse::<CompletionRule>()
            .map_err(|_| CompletionError::InvalidRule(rule.to_owned()))?;
        self.state_of(parsed).await
    }

    /// State of a typed rule.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::InvalidRule` for the host's built-in rules and
    /// `CompletionError::Storage` if the responses cannot be read.
    pub async fn state_of(&self, rule: CompletionRule) -> Result<CompletionState, CompletionError> {
        if !Self::is_defined(rule) {
            return Err(CompletionError::InvalidRule(rule.as_str().to_owned()));
        }

        let filter = ResponseFilter::for_user(self.kuet.id(), self.user_id);
        let state = match rule {
            CompletionRule::AnswerAll => {
                answer_all::evaluate(
                    self.policy,
                    &filter,
                    self.sessions.as_ref(),
                    self.responses.as_ref(),
                )
                .await?
            }
            CompletionRule::UseGrade | CompletionRule::PassGrade => {
                return Err(CompletionError::InvalidRule(rule.as_str().to_owned()));
            }
        };

        tracing::debug!(
            kuet = %self.kuet.id(),
            user = %self.user_id,
            rule = %rule,
            policy = self.policy.as_str(),
            state = %state,
            "evaluated completion rule"
        );
        Ok(state)
    }

    /// States of every available rule, in display order.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::Storage` if the responses cannot be read.
    pub async fn rule_states(
        &self,
    ) -> Result<Vec<(CompletionRule, CompletionState)>, CompletionError> {
        let available = self.get_available_custom_rules();
        let mut states = Vec::with_capacity(available.len());
        for rule in Self::get_sort_order() {
            if available.contains(rule) {
                states.push((*rule, self.state_of(*rule).await?));
            }
        }
        Ok(states)
    }

    /// `Complete` when every available custom rule is complete.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::Storage` if the responses cannot be read.
    pub async fn get_overall_state(&self) -> Result<CompletionState, CompletionError> {
        let states = self.rule_states().await?;
        Ok(overall_state(&states))
    }

    /// One description per defined rule.
    #[must_use]
    pub fn get_rule_descriptions(&self) -> BTreeMap<CompletionRule, String> {
        Self::list_defined_rules()
            .iter()
            .map(|rule| (*rule, describe(*rule).to_owned()))
            .collect()
    }

    /// Display order of custom and built-in rules.
    #[must_use]
    pub fn get_sort_order() -> &'static [CompletionRule] {
        &SORT_ORDER
    }
}

/// `Complete` iff every listed rule is complete; an empty list is `Complete`.
pub(crate) fn overall_state(states: &[(CompletionRule, CompletionState)]) -> CompletionState {
    CompletionState::from_bool(states.iter().all(|(_, state)| state.is_complete()))
}

pub(crate) fn describe(rule: CompletionRule) -> &'static str {
    match rule {
        CompletionRule::AnswerAll => "Answer all the questions in the activity sessions",
        CompletionRule::UseGrade => "Receive a grade",
        CompletionRule::PassGrade => "Receive a passing grade",
    }
}
