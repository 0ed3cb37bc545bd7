use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{KuetId, QuestionId, SessionId, SessionQuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session name cannot be empty")]
    EmptyName,

    #[error("end date is before start date")]
    InvalidDateRange,

    #[error("invalid session mode: {0}")]
    InvalidMode(String),

    #[error("invalid time mode: {0}")]
    InvalidTimeMode(String),

    #[error("invalid session status code: {0}")]
    InvalidStatus(i64),
}

/// How a session is driven and displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// Legacy instructor-paced mode.
    Manual,
    #[default]
    InactiveManual,
    InactiveProgrammed,
    PodiumManual,
    PodiumProgrammed,
    RaceManual,
    RaceProgrammed,
}

impl SessionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Manual => "manual",
            SessionMode::InactiveManual => "inactive_manual",
            SessionMode::InactiveProgrammed => "inactive_programmed",
            SessionMode::PodiumManual => "podium_manual",
            SessionMode::PodiumProgrammed => "podium_programmed",
            SessionMode::RaceManual => "race_manual",
            SessionMode::RaceProgrammed => "race_programmed",
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidMode` for unknown mode strings.
    pub fn parse(s: &str) -> Result<Self, SessionError> {
        match s {
            "manual" => Ok(SessionMode::Manual),
            "inactive_manual" => Ok(SessionMode::InactiveManual),
            "inactive_programmed" => Ok(SessionMode::InactiveProgrammed),
            "podium_manual" => Ok(SessionMode::PodiumManual),
            "podium_programmed" => Ok(SessionMode::PodiumProgrammed),
            "race_manual" => Ok(SessionMode::RaceManual),
            "race_programmed" => Ok(SessionMode::RaceProgrammed),
            other => Err(SessionError::InvalidMode(other.to_owned())),
        }
    }
}

/// Whether a session is timed as a whole, per question, or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeMode {
    #[default]
    NoTime,
    Session,
    Question,
}

impl TimeMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TimeMode::NoTime => "no_time",
            TimeMode::Session => "session",
            TimeMode::Question => "question",
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidTimeMode` for unknown strings.
    pub fn parse(s: &str) -> Result<Self, SessionError> {
        match s {
            "no_time" => Ok(TimeMode::NoTime),
            "session" => Ok(TimeMode::Session),
            "question" => Ok(TimeMode::Question),
            other => Err(SessionError::InvalidTimeMode(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Inactive,
    Active,
    Finished,
}

impl SessionStatus {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            SessionStatus::Inactive => 0,
            SessionStatus::Active => 1,
            SessionStatus::Finished => 2,
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidStatus` for unknown codes.
    pub fn from_code(code: i64) -> Result<Self, SessionError> {
        match code {
            0 => Ok(SessionStatus::Inactive),
            1 => Ok(SessionStatus::Active),
            2 => Ok(SessionStatus::Finished),
            other => Err(SessionError::InvalidStatus(other)),
        }
    }
}

/// Instructor-facing configuration of a session.
///
/// Times are in seconds; dates are `None` when unset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct SessionSettings {
    pub anonymous_answer: bool,
    pub mode: SessionMode,
    pub graded: bool,
    pub countdown: bool,
    pub show_grade_ranking: bool,
    pub random_questions: bool,
    pub random_answers: bool,
    pub show_feedback: bool,
    pub show_final_grade: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub automatic_start: bool,
    pub time_mode: TimeMode,
    pub session_time: u32,
    pub question_time: u32,
    pub groupings: Option<u64>,
}

/// One run of a kuet activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    kuet_id: KuetId,
    name: String,
    settings: SessionSettings,
    status: SessionStatus,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Builds a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyName` for a blank name and
    /// `SessionError::InvalidDateRange` if the end date precedes the start date.
    pub fn new(
        id: SessionId,
        kuet_id: KuetId,
        name: impl Into<String>,
        settings: SessionSettings,
        status: SessionStatus,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        if let (Some(start), Some(end)) = (settings.start_date, settings.end_date) {
            if end < start {
                return Err(SessionError::InvalidDateRange);
            }
        }

        Ok(Self {
            id,
            kuet_id,
            name,
            settings,
            status,
            created_at,
        })
    }

    /// Returns a copy of this session carrying the given id.
    #[must_use]
    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn kuet_id(&self) -> KuetId {
        self.kuet_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A question slot inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionQuestion {
    pub id: SessionQuestionId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub order: u32,
}
