use kuet_core::model::{
    CompletionFlags, CourseId, GradeMethod, Kuet, KuetId, QuestionId, QuestionResponse,
    ResponseResult, Session, SessionId, SessionMode, SessionSettings, SessionStatus, TimeMode,
    UserId,
};
use kuet_core::time::fixed_now;
use storage::repository::{
    KuetRepository, ResponseFilter, ResponseRepository, SessionRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_kuet(id: u64) -> Kuet {
    Kuet::new(
        KuetId::new(id),
        CourseId::new(7),
        "Test kuet",
        Some("Intro".into()),
        GradeMethod::Average,
        CompletionFlags::answer_all(),
        fixed_now(),
    )
    .unwrap()
}

fn build_session(kuet_id: KuetId) -> Session {
    let settings = SessionSettings {
        mode: SessionMode::Manual,
        time_mode: TimeMode::Session,
        question_time: 30,
        ..SessionSettings::default()
    };
    Session::new(
        SessionId::new(0),
        kuet_id,
        "Test Session",
        settings,
        SessionStatus::Inactive,
        fixed_now(),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_persists_kuet_and_session() {
    let repo = connect("memdb_kuet_roundtrip").await;

    let kuet = build_kuet(1);
    repo.upsert_kuet(&kuet).await.unwrap();
    let fetched = repo.get_kuet(kuet.id()).await.unwrap().expect("kuet");
    assert_eq!(fetched, kuet);
    assert!(repo.get_kuet(KuetId::new(99)).await.unwrap().is_none());

    let session_id = repo.insert_session(&build_session(kuet.id())).await.unwrap();
    let session = repo.get_session(session_id).await.unwrap().expect("session");
    assert_eq!(session.kuet_id(), kuet.id());
    assert_eq!(session.settings().mode, SessionMode::Manual);
    assert_eq!(session.settings().time_mode, TimeMode::Session);
    assert_eq!(session.settings().question_time, 30);

    let sessions = repo.sessions_for_kuet(kuet.id()).await.unwrap();
    assert_eq!(sessions.len(), 1);
}

#[tokio::test]
async fn sqlite_session_for_missing_kuet_is_not_found() {
    let repo = connect("memdb_kuet_missing_parent").await;
    let err = repo
        .insert_session(&build_session(KuetId::new(42)))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_filters_responses() {
    let repo = connect("memdb_kuet_responses").await;
    let kuet = build_kuet(1);
    repo.upsert_kuet(&kuet).await.unwrap();
    let first = repo.insert_session(&build_session(kuet.id())).await.unwrap();
    let second = repo.insert_session(&build_session(kuet.id())).await.unwrap();

    let kid = repo
        .add_session_question(first, QuestionId::new(5), 0)
        .await
        .unwrap();
    let questions = repo.questions_for_session(first).await.unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].id, kid);

    let student = UserId::new(2);
    for (session, result) in [
        (first, ResponseResult::Success),
        (second, ResponseResult::NoResponse),
    ] {
        let response = QuestionResponse::new(
            kuet.id(),
            session,
            student,
            kid,
            QuestionId::new(5),
            result,
            fixed_now(),
        );
        repo.append_response(&response).await.unwrap();
    }
    let other = QuestionResponse::new(
        kuet.id(),
        first,
        UserId::new(3),
        kid,
        QuestionId::new(5),
        ResponseResult::Failure,
        fixed_now(),
    );
    repo.append_response(&other).await.unwrap();

    let filter = ResponseFilter::for_user(kuet.id(), student);
    assert_eq!(repo.count_responses(&filter).await.unwrap(), 2);

    let in_second = repo.find_responses(&filter.in_session(second)).await.unwrap();
    assert_eq!(in_second.len(), 1);
    assert_eq!(in_second[0].result, ResponseResult::NoResponse);
    assert_eq!(in_second[0].user_id, student);
}

#[tokio::test]
async fn sqlite_rejects_response_for_foreign_session() {
    let repo = connect("memdb_kuet_foreign_session").await;
    let a = build_kuet(1);
    let b = build_kuet(2);
    repo.upsert_kuet(&a).await.unwrap();
    repo.upsert_kuet(&b).await.unwrap();
    let session = repo.insert_session(&build_session(a.id())).await.unwrap();

    let response = QuestionResponse::new(
        b.id(),
        session,
        UserId::new(2),
        kuet_core::model::SessionQuestionId::new(1),
        QuestionId::new(1),
        ResponseResult::Success,
        fixed_now(),
    );
    let err = repo.append_response(&response).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}
