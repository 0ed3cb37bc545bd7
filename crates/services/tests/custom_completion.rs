use std::sync::Arc;

use async_trait::async_trait;
use kuet_core::model::{
    AnswerAllPolicy, CompletionFlags, CompletionRule, CompletionState, CourseId, GradeMethod,
    Kuet, KuetId, QuestionId, QuestionResponse, ResponseId, ResponseResult, Session, SessionId,
    SessionMode, SessionQuestionId, SessionSettings, SessionStatus, TimeMode, UserId,
};
use kuet_core::time::fixed_now;
use services::{CompletionError, CompletionService, CompletionSettings, CustomCompletion};
use storage::repository::{
    InMemoryRepository, KuetRepository, ResponseFilter, ResponseRepository, SessionRepository,
    Storage, StorageError,
};

const STUDENT: UserId = UserId::new(2);

async fn create_kuet(storage: &Storage, id: u64, flags: CompletionFlags) -> Kuet {
    let kuet = Kuet::new(
        KuetId::new(id),
        CourseId::new(1),
        format!("Kuet {id}"),
        None,
        GradeMethod::None,
        flags,
        fixed_now(),
    )
    .unwrap();
    storage.kuets.upsert_kuet(&kuet).await.unwrap();
    kuet
}

async fn create_session(storage: &Storage, kuet_id: KuetId) -> SessionId {
    let settings = SessionSettings {
        mode: SessionMode::Manual,
        time_mode: TimeMode::Session,
        question_time: 30,
        ..SessionSettings::default()
    };
    let session = Session::new(
        SessionId::new(0),
        kuet_id,
        "Test Session",
        settings,
        SessionStatus::Inactive,
        fixed_now(),
    )
    .unwrap();
    storage.sessions.insert_session(&session).await.unwrap()
}

async fn record_response(
    storage: &Storage,
    kuet_id: KuetId,
    session_id: SessionId,
    user_id: UserId,
    question: u64,
) {
    let response = QuestionResponse::new(
        kuet_id,
        session_id,
        user_id,
        SessionQuestionId::new(1),
        QuestionId::new(question),
        ResponseResult::Success,
        fixed_now(),
    );
    storage.responses.append_response(&response).await.unwrap();
}

fn service(storage: &Storage, policy: AnswerAllPolicy) -> CompletionService {
    CompletionService::from_storage(CompletionSettings::with_policy(policy), storage)
}

#[test]
fn defined_rules_contain_answer_all() {
    let rules = CustomCompletion::list_defined_rules();
    assert!(rules.contains(&CompletionRule::AnswerAll));
}

#[tokio::test]
async fn answer_all_is_incomplete_without_responses() {
    let storage = Storage::in_memory();
    let kuet = create_kuet(&storage, 1, CompletionFlags::answer_all()).await;

    let completion = service(&storage, AnswerAllPolicy::AnyResponse)
        .for_user(kuet.id(), STUDENT)
        .await
        .unwrap();
    let state = completion.get_state("completionanswerall").await.unwrap();
    assert_eq!(state, CompletionState::Incomplete);
    assert_eq!(state.code(), 0);
}

#[tokio::test]
async fn answer_all_is_complete_after_one_response() {
    let storage = Storage::in_memory();
    let kuet = create_kuet(&storage, 1, CompletionFlags::answer_all()).await;
    let session_id = create_session(&storage, kuet.id()).await;
    record_response(&storage, kuet.id(), session_id, STUDENT, 1).await;

    let completion = service(&storage, AnswerAllPolicy::AnyResponse)
        .for_user(kuet.id(), STUDENT)
        .await
        .unwrap();
    let state = completion.get_state("completionanswerall").await.unwrap();
    assert_eq!(state, CompletionState::Complete);
    assert_eq!(state.code(), 1);
}

#[tokio::test]
async fn state_reflects_responses_recorded_after_construction() {
    let storage = Storage::in_memory();
    let kuet = create_kuet(&storage, 1, CompletionFlags::answer_all()).await;
    let session_id = create_session(&storage, kuet.id()).await;

    let completion = service(&storage, AnswerAllPolicy::AnyResponse)
        .for_user(kuet.id(), STUDENT)
        .await
        .unwrap();
    assert_eq!(
        completion.state_of(CompletionRule::AnswerAll).await.unwrap(),
        CompletionState::Incomplete
    );

    record_response(&storage, kuet.id(), session_id, STUDENT, 1).await;
    assert_eq!(
        completion.state_of(CompletionRule::AnswerAll).await.unwrap(),
        CompletionState::Complete
    );
}

#[tokio::test]
async fn other_users_and_activities_do_not_count() {
    let storage = Storage::in_memory();
    let kuet = create_kuet(&storage, 1, CompletionFlags::answer_all()).await;
    let other = create_kuet(&storage, 2, CompletionFlags::answer_all()).await;
    let session_id = create_session(&storage, kuet.id()).await;
    let other_session = create_session(&storage, other.id()).await;

    record_response(&storage, kuet.id(), session_id, UserId::new(3), 1).await;
    record_response(&storage, other.id(), other_session, STUDENT, 1).await;

    let completion = service(&storage, AnswerAllPolicy::AnyResponse)
        .for_user(kuet.id(), STUDENT)
        .await
        .unwrap();
    assert_eq!(
        completion.get_state("completionanswerall").await.unwrap(),
        CompletionState::Incomplete
    );
}

#[tokio::test]
async fn rule_descriptions_have_answer_all() {
    let storage = Storage::in_memory();
    let kuet = create_kuet(&storage, 1, CompletionFlags::answer_all()).await;

    let completion = service(&storage, AnswerAllPolicy::AnyResponse)
        .for_user(kuet.id(), STUDENT)
        .await
        .unwrap();
    let descriptions = completion.get_rule_descriptions();
    let description = descriptions
        .get(&CompletionRule::AnswerAll)
        .expect("answer all description");
    assert!(!description.is_empty());
}

#[tokio::test]
async fn sort_order_lists_custom_and_built_in_rules() {
    let storage = Storage::in_memory();
    // Sort order does not depend on the instance flags.
    create_kuet(&storage, 1, CompletionFlags::default()).await;

    let order: Vec<&str> = CustomCompletion::get_sort_order()
        .iter()
        .map(|rule| rule.as_str())
        .collect();
    assert!(order.contains(&"completionanswerall"));
    assert!(order.contains(&"completionusegrade"));
    assert!(order.contains(&"completionpassgrade"));
}

#[tokio::test]
async fn unknown_rule_is_rejected() {
    let storage = Storage::in_memory();
    let kuet = create_kuet(&storage, 1, CompletionFlags::answer_all()).await;

    let completion = service(&storage, AnswerAllPolicy::AnyResponse)
        .for_user(kuet.id(), STUDENT)
        .await
        .unwrap();
    for rule in [
        "completionfoo",
        "completionusegrade",
        "",
        " completionanswerall",
        "completionanswerall\n",
        "CompletionAnswerAll",
    ] {
        let err = completion.get_state(rule).await.unwrap_err();
        assert!(matches!(err, CompletionError::InvalidRule(ref id) if id == rule));
    }
}

#[tokio::test]
async fn missing_activity_fails_construction() {
    let storage = Storage::in_memory();
    let result = service(&storage, AnswerAllPolicy::AnyResponse)
        .for_user(KuetId::new(77), STUDENT)
        .await;
    assert!(matches!(result, Err(CompletionError::Configuration(_))));
}

#[tokio::test]
async fn overall_state_only_counts_available_rules() {
    let storage = Storage::in_memory();
    let disabled = create_kuet(&storage, 1, CompletionFlags::default()).await;
    let enabled = create_kuet(&storage, 2, CompletionFlags::answer_all()).await;
    let svc = service(&storage, AnswerAllPolicy::AnyResponse);

    let completion = svc.for_user(disabled.id(), STUDENT).await.unwrap();
    assert!(completion.rule_states().await.unwrap().is_empty());
    assert_eq!(
        completion.get_overall_state().await.unwrap(),
        CompletionState::Complete
    );

    let completion = svc.for_user(enabled.id(), STUDENT).await.unwrap();
    assert_eq!(
        completion.get_overall_state().await.unwrap(),
        CompletionState::Incomplete
    );
}

#[tokio::test]
async fn strict_policy_requires_every_attached_question() {
    let storage = Storage::in_memory();
    let kuet = create_kuet(&storage, 1, CompletionFlags::answer_all()).await;
    let session_id = create_session(&storage, kuet.id()).await;
    for (order, question) in [1_u64, 2, 3].into_iter().enumerate() {
        storage
            .sessions
            .add_session_question(session_id, QuestionId::new(question), order as u32)
            .await
            .unwrap();
    }
    let completion = service(&storage, AnswerAllPolicy::EveryQuestion)
        .for_user(kuet.id(), STUDENT)
        .await
        .unwrap();

    record_response(&storage, kuet.id(), session_id, STUDENT, 1).await;
    record_response(&storage, kuet.id(), session_id, STUDENT, 2).await;
    assert_eq!(
        completion.get_state("completionanswerall").await.unwrap(),
        CompletionState::Incomplete
    );

    record_response(&storage, kuet.id(), session_id, STUDENT, 3).await;
    assert_eq!(
        completion.get_state("completionanswerall").await.unwrap(),
        CompletionState::Complete
    );
}

/// Response store whose reads always fail.
struct BrokenResponses;

#[async_trait]
impl ResponseRepository for BrokenResponses {
    async fn append_response(
        &self,
        _response: &QuestionResponse,
    ) -> Result<ResponseId, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn find_responses(
        &self,
        _filter: &ResponseFilter,
    ) -> Result<Vec<QuestionResponse>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[tokio::test]
async fn storage_failures_surface_as_storage_errors() {
    let repo = InMemoryRepository::new();
    let kuet = Kuet::new(
        KuetId::new(1),
        CourseId::new(1),
        "Quiz",
        None,
        GradeMethod::None,
        CompletionFlags::answer_all(),
        fixed_now(),
    )
    .unwrap();
    repo.upsert_kuet(&kuet).await.unwrap();

    let kuets: Arc<dyn KuetRepository> = Arc::new(repo.clone());
    let sessions: Arc<dyn SessionRepository> = Arc::new(repo);
    let responses: Arc<dyn ResponseRepository> = Arc::new(BrokenResponses);
    let svc = CompletionService::new(CompletionSettings::default(), kuets, sessions, responses);

    let completion = svc.for_user(kuet.id(), STUDENT).await.unwrap();
    let err = completion.get_state("completionanswerall").await.unwrap_err();
    assert!(matches!(
        err,
        CompletionError::Storage(StorageError::Connection(_))
    ));
}
