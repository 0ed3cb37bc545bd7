use kuet_core::model::{
    CompletionFlags, CourseId, GradeMethod, Kuet, KuetId, QuestionId, QuestionResponse,
    ResponseId, ResponseResult, Session, SessionId, SessionMode, SessionQuestion,
    SessionQuestionId, SessionSettings, SessionStatus, TimeMode, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn get_u64(row: &SqliteRow, field: &'static str) -> Result<u64, StorageError> {
    i64_to_u64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

fn get_bool(row: &SqliteRow, field: &'static str) -> Result<bool, StorageError> {
    Ok(row.try_get::<i64, _>(field).map_err(ser)? != 0)
}

pub(crate) fn bool_to_i64(v: bool) -> i64 {
    i64::from(v)
}

pub(crate) fn map_kuet_row(row: &SqliteRow) -> Result<Kuet, StorageError> {
    let grade_method =
        GradeMethod::from_code(row.try_get::<i64, _>("grade_method").map_err(ser)?).map_err(ser)?;
    let completion = CompletionFlags {
        answer_all: get_bool(row, "completion_answer_all")?,
        use_grade: get_bool(row, "completion_use_grade")?,
        pass_grade: get_bool(row, "completion_pass_grade")?,
    };

    Kuet::new(
        KuetId::new(get_u64(row, "id")?),
        CourseId::new(get_u64(row, "course_id")?),
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<Option<String>, _>("intro").map_err(ser)?,
        grade_method,
        completion,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<Session, StorageError> {
    let mode_str: String = row.try_get("session_mode").map_err(ser)?;
    let time_mode_str: String = row.try_get("time_mode").map_err(ser)?;

    let settings = SessionSettings {
        anonymous_answer: get_bool(row, "anonymous_answer")?,
        mode: SessionMode::parse(&mode_str).map_err(ser)?,
        graded: get_bool(row, "graded")?,
        countdown: get_bool(row, "countdown")?,
        show_grade_ranking: get_bool(row, "show_grade_ranking")?,
        random_questions: get_bool(row, "random_questions")?,
        random_answers: get_bool(row, "random_answers")?,
        show_feedback: get_bool(row, "show_feedback")?,
        show_final_grade: get_bool(row, "show_final_grade")?,
        start_date: row.try_get("start_date").map_err(ser)?,
        end_date: row.try_get("end_date").map_err(ser)?,
        automatic_start: get_bool(row, "automatic_start")?,
        time_mode: TimeMode::parse(&time_mode_str).map_err(ser)?,
        session_time: u32_from_i64(
            "session_time",
            row.try_get::<i64, _>("session_time").map_err(ser)?,
        )?,
        question_time: u32_from_i64(
            "question_time",
            row.try_get::<i64, _>("question_time").map_err(ser)?,
        )?,
        groupings: row
            .try_get::<Option<i64>, _>("groupings")
            .map_err(ser)?
            .map(|v| i64_to_u64("groupings", v))
            .transpose()?,
    };
    let status =
        SessionStatus::from_code(row.try_get::<i64, _>("status").map_err(ser)?).map_err(ser)?;

    Session::new(
        SessionId::new(get_u64(row, "id")?),
        KuetId::new(get_u64(row, "kuet_id")?),
        row.try_get::<String, _>("name").map_err(ser)?,
        settings,
        status,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_question_row(row: &SqliteRow) -> Result<SessionQuestion, StorageError> {
    Ok(SessionQuestion {
        id: SessionQuestionId::new(get_u64(row, "id")?),
        session_id: SessionId::new(get_u64(row, "session_id")?),
        question_id: QuestionId::new(get_u64(row, "question_id")?),
        order: u32_from_i64(
            "question_order",
            row.try_get::<i64, _>("question_order").map_err(ser)?,
        )?,
    })
}

pub(crate) fn map_response_row(row: &SqliteRow) -> Result<QuestionResponse, StorageError> {
    let result =
        ResponseResult::from_code(row.try_get::<i64, _>("result").map_err(ser)?).map_err(ser)?;

    Ok(QuestionResponse {
        id: Some(ResponseId::new(get_u64(row, "id")?)),
        kuet_id: KuetId::new(get_u64(row, "kuet_id")?),
        session_id: SessionId::new(get_u64(row, "session_id")?),
        user_id: UserId::new(get_u64(row, "user_id")?),
        session_question_id: SessionQuestionId::new(get_u64(row, "kid")?),
        question_id: QuestionId::new(get_u64(row, "question_id")?),
        anonymise: get_bool(row, "anonymise")?,
        response: row.try_get("response").map_err(ser)?,
        has_feedbacks: get_bool(row, "has_feedbacks")?,
        result,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
