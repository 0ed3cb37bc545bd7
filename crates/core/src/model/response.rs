use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{KuetId, QuestionId, ResponseId, SessionId, SessionQuestionId, UserId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResponseError {
    #[error("invalid response result code: {0}")]
    InvalidResult(i64),
}

//
// ─── RESPONSE RESULT ──────────────────────────────────────────────────────────
//

/// Outcome recorded for a single answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseResult {
    Failure,
    Success,
    Partially,
    /// The question timed out or was skipped without an answer.
    NoResponse,
    /// Question types that carry no correctness (surveys, descriptions).
    NotEvaluable,
    Invalid,
}

impl ResponseResult {
    /// Storage code for this result.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            ResponseResult::Failure => 0,
            ResponseResult::Success => 1,
            ResponseResult::Partially => 2,
            ResponseResult::NoResponse => 3,
            ResponseResult::NotEvaluable => 4,
            ResponseResult::Invalid => 5,
        }
    }

    /// # Errors
    ///
    /// Returns `ResponseError::InvalidResult` if the code is outside 0..=5.
    pub fn from_code(code: i64) -> Result<Self, ResponseError> {
        match code {
            0 => Ok(ResponseResult::Failure),
            1 => Ok(ResponseResult::Success),
            2 => Ok(ResponseResult::Partially),
            3 => Ok(ResponseResult::NoResponse),
            4 => Ok(ResponseResult::NotEvaluable),
            5 => Ok(ResponseResult::Invalid),
            other => Err(ResponseError::InvalidResult(other)),
        }
    }

    /// True when the user actually submitted something for the question.
    #[must_use]
    pub fn is_answered(self) -> bool {
        !matches!(self, ResponseResult::NoResponse)
    }
}

//
// ─── QUESTION RESPONSE ────────────────────────────────────────────────────────
//

/// A user's recorded answer to one question within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResponse {
    pub id: Option<ResponseId>,
    pub kuet_id: KuetId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub session_question_id: SessionQuestionId,
    pub question_id: QuestionId,
    pub anonymise: bool,
    pub response: String,
    pub has_feedbacks: bool,
    pub result: ResponseResult,
    pub created_at: DateTime<Utc>,
}

impl QuestionResponse {
    /// A fresh, unsaved response with an empty payload.
    #[must_use]
    pub fn new(
        kuet_id: KuetId,
        session_id: SessionId,
        user_id: UserId,
        session_question_id: SessionQuestionId,
        question_id: QuestionId,
        result: ResponseResult,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            kuet_id,
            session_id,
            user_id,
            session_question_id,
            question_id,
            anonymise: false,
            response: String::new(),
            has_feedbacks: false,
            result,
            created_at,
        }
    }
}
