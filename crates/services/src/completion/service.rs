use std::sync::Arc;

use kuet_core::model::{CompletionRule, CompletionState, KuetId, UserId};
use serde::Serialize;
use storage::repository::{KuetRepository, ResponseRepository, SessionRepository, Storage};

use super::custom::{CustomCompletion, describe, overall_state};
use crate::error::CompletionError;
use crate::settings::CompletionSettings;

/// State of one available rule, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    pub rule: CompletionRule,
    pub description: String,
    pub state: CompletionState,
}

/// Completion snapshot for one user on one activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    pub kuet_id: KuetId,
    pub user_id: UserId,
    pub overall: CompletionState,
    pub rules: Vec<RuleReport>,
}

impl CompletionReport {
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds `CustomCompletion` evaluators over shared repositories.
#[derive(Clone)]
pub struct CompletionService {
    settings: CompletionSettings,
    kuets: Arc<dyn KuetRepository>,
    sessions: Arc<dyn SessionRepository>,
    responses: Arc<dyn ResponseRepository>,
}

impl CompletionService {
    #[must_use]
    pub fn new(
        settings: CompletionSettings,
        kuets: Arc<dyn KuetRepository>,
        sessions: Arc<dyn SessionRepository>,
        responses: Arc<dyn ResponseRepository>,
    ) -> Self {
        Self {
            settings,
            kuets,
            sessions,
            responses,
        }
    }

    #[must_use]
    pub fn from_storage(settings: CompletionSettings, storage: &Storage) -> Self {
        Self::new(
            settings,
            Arc::clone(&storage.kuets),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.responses),
        )
    }

    #[must_use]
    pub fn settings(&self) -> CompletionSettings {
        self.settings
    }

    /// Evaluator for `user_id` on `kuet_id`.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::Configuration` if the activity cannot be
    /// resolved or the user id is invalid.
    pub async fn for_user(
        &self,
        kuet_id: KuetId,
        user_id: UserId,
    ) -> Result<CustomCompletion, CompletionError> {
        CustomCompletion::load(
            self.kuets.as_ref(),
            kuet_id,
            user_id,
            self.settings.answer_all_policy,
            Arc::clone(&self.sessions),
            Arc::clone(&self.responses),
        )
        .await
    }

    /// Overall state plus every available rule's state.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError` if the evaluator cannot be built or storage fails.
    pub async fn report(
        &self,
        kuet_id: KuetId,
        user_id: UserId,
    ) -> Result<CompletionReport, CompletionError> {
        let completion = self.for_user(kuet_id, user_id).await?;
        let states = completion.rule_states().await?;
        let overall = overall_state(&states);
        let rules: Vec<RuleReport> = states
            .into_iter()
            .map(|(rule, state)| RuleReport {
                rule,
                description: describe(rule).to_owned(),
                state,
            })
            .collect();

        Ok(CompletionReport {
            kuet_id,
            user_id,
            overall,
            rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuet_core::model::{
        CompletionFlags, CourseId, GradeMethod, Kuet, QuestionId, QuestionResponse, ResponseResult,
        Session, SessionId, SessionQuestionId, SessionSettings, SessionStatus,
    };
    use kuet_core::time::fixed_now;

    #[tokio::test]
    async fn report_lists_available_rules() {
        let storage = Storage::in_memory();
        let kuet = Kuet::new(
            KuetId::new(5),
            CourseId::new(1),
            "Quiz",
            None,
            GradeMethod::None,
            CompletionFlags::answer_all(),
            fixed_now(),
        )
        .unwrap();
        storage.kuets.upsert_kuet(&kuet).await.unwrap();
        let session = Session::new(
            SessionId::new(0),
            kuet.id(),
            "Round",
            SessionSettings::default(),
            SessionStatus::Active,
            fixed_now(),
        )
        .unwrap();
        let session_id = storage.sessions.insert_session(&session).await.unwrap();
        storage
            .responses
            .append_response(&QuestionResponse::new(
                kuet.id(),
                session_id,
                UserId::new(2),
                SessionQuestionId::new(1),
                QuestionId::new(1),
                ResponseResult::Success,
                fixed_now(),
            ))
            .await
            .unwrap();

        let service = CompletionService::from_storage(CompletionSettings::default(), &storage);
        let report = service.report(kuet.id(), UserId::new(2)).await.unwrap();
        assert_eq!(report.overall, CompletionState::Complete);
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.rules[0].rule, CompletionRule::AnswerAll);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"completionanswerall\""));
        assert!(json.contains("\"complete\""));
    }

    #[tokio::test]
    async fn unknown_activity_is_a_configuration_error() {
        let service =
            CompletionService::from_storage(CompletionSettings::default(), &Storage::in_memory());
        let err = service
            .for_user(KuetId::new(404), UserId::new(2))
            .await
            .err()
            .expect("missing activity");
        assert!(matches!(err, CompletionError::Configuration(_)));
    }
}
