use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CourseId, KuetId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KuetError {
    #[error("kuet name cannot be empty")]
    EmptyName,

    #[error("invalid grade method code: {0}")]
    InvalidGradeMethod(i64),

    #[error("pass grade completion requires grade completion")]
    PassGradeWithoutGrade,
}

//
// ─── GRADE METHOD ──────────────────────────────────────────────────────────────
//

/// How session grades are aggregated into the activity grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradeMethod {
    #[default]
    None,
    Highest,
    Average,
    FirstSession,
    LastSession,
}

impl GradeMethod {
    /// Numeric code stored alongside the activity.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            GradeMethod::None => 0,
            GradeMethod::Highest => 1,
            GradeMethod::Average => 2,
            GradeMethod::FirstSession => 3,
            GradeMethod::LastSession => 4,
        }
    }

    /// # Errors
    ///
    /// Returns `KuetError::InvalidGradeMethod` for unknown codes.
    pub fn from_code(code: i64) -> Result<Self, KuetError> {
        match code {
            0 => Ok(GradeMethod::None),
            1 => Ok(GradeMethod::Highest),
            2 => Ok(GradeMethod::Average),
            3 => Ok(GradeMethod::FirstSession),
            4 => Ok(GradeMethod::LastSession),
            other => Err(KuetError::InvalidGradeMethod(other)),
        }
    }
}

//
// ─── COMPLETION FLAGS ──────────────────────────────────────────────────────────
//

/// Completion conditions enabled on an activity instance.
///
/// `answer_all` belongs to kuet; the grade flags are the host's built-in
/// conditions and only take part in display ordering here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionFlags {
    pub answer_all: bool,
    pub use_grade: bool,
    pub pass_grade: bool,
}

impl CompletionFlags {
    #[must_use]
    pub fn answer_all() -> Self {
        Self {
            answer_all: true,
            ..Self::default()
        }
    }
}

//
// ─── KUET ──────────────────────────────────────────────────────────────────────
//

/// A configured kuet activity inside a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kuet {
    id: KuetId,
    course_id: CourseId,
    name: String,
    intro: Option<String>,
    grade_method: GradeMethod,
    completion: CompletionFlags,
    created_at: DateTime<Utc>,
}

impl Kuet {
    /// Creates a new activity instance.
    ///
    /// # Errors
    ///
    /// Returns `KuetError::EmptyName` if the trimmed name is empty.
    /// Returns `KuetError::PassGradeWithoutGrade` if pass grade completion is
    /// enabled without grade completion.
    pub fn new(
        id: KuetId,
        course_id: CourseId,
        name: impl Into<String>,
        intro: Option<String>,
        grade_method: GradeMethod,
        completion: CompletionFlags,
        created_at: DateTime<Utc>,
    ) -> Result<Self, KuetError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(KuetError::EmptyName);
        }
        if completion.pass_grade && !completion.use_grade {
            return Err(KuetError::PassGradeWithoutGrade);
        }
        let intro = intro
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());

        Ok(Self {
            id,
            course_id,
            name,
            intro,
            grade_method,
            completion,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> KuetId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn intro(&self) -> Option<&str> {
        self.intro.as_deref()
    }

    #[must_use]
    pub fn grade_method(&self) -> GradeMethod {
        self.grade_method
    }

    #[must_use]
    pub fn completion(&self) -> CompletionFlags {
        self.completion
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
