use std::collections::{BTreeMap, BTreeSet};

use kuet_core::model::{AnswerAllPolicy, CompletionState, QuestionId, SessionId};
use storage::repository::{ResponseFilter, ResponseRepository, SessionRepository, StorageError};

/// Evaluates "answer all questions" for one (activity, user) pair.
///
/// Under `AnyResponse` a single recorded response is enough. Under
/// `EveryQuestion` every session the user took part in must have all of its
/// attached questions answered, and at least one answer must exist.
pub(crate) async fn evaluate(
    policy: AnswerAllPolicy,
    filter: &ResponseFilter,
    sessions: &dyn SessionRepository,
    responses: &dyn ResponseRepository,
) -> Result<CompletionState, StorageError> {
    match policy {
        AnswerAllPolicy::AnyResponse => {
            let count = responses.count_responses(filter).await?;
            Ok(CompletionState::from_bool(count > 0))
        }
        AnswerAllPolicy::EveryQuestion => every_question(filter, sessions, responses).await,
    }
}

async fn every_question(
    filter: &ResponseFilter,
    sessions: &dyn SessionRepository,
    responses: &dyn ResponseRepository,
) -> Result<CompletionState, StorageError> {
    let found = responses.find_responses(filter).await?;

    let mut answered: BTreeMap<SessionId, BTreeSet<QuestionId>> = BTreeMap::new();
    for response in &found {
        let entry = answered.entry(response.session_id).or_default();
        if response.result.is_answered() {
            entry.insert(response.question_id);
        }
    }
    if answered.values().all(BTreeSet::is_empty) {
        return Ok(CompletionState::Incomplete);
    }

    for (session_id, questions) in &answered {
        let expected: BTreeSet<QuestionId> = sessions
            .questions_for_session(*session_id)
            .await?
            .into_iter()
            .map(|q| q.question_id)
            .collect();
        // Sessions without attached questions only need one answer.
        let missing = if expected.is_empty() {
            questions.is_empty()
        } else {
            !expected.is_subset(questions)
        };
        if missing {
            tracing::trace!(session = %session_id, "session has unanswered questions");
            return Ok(CompletionState::Incomplete);
        }
    }

    Ok(CompletionState::Complete)
}
