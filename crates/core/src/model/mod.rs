mod completion;
mod ids;
mod kuet;
mod response;
mod session;

pub use ids::{
    CourseId, KuetId, ParseIdError, QuestionId, ResponseId, SessionId, SessionQuestionId, UserId,
};

pub use completion::{
    AnswerAllPolicy, CUSTOM_RULES, CompletionRule, CompletionState, ParseRuleError, SORT_ORDER,
};
pub use kuet::{CompletionFlags, GradeMethod, Kuet, KuetError};
pub use response::{QuestionResponse, ResponseError, ResponseResult};
pub use session::{
    Session, SessionError, SessionMode, SessionQuestion, SessionSettings, SessionStatus, TimeMode,
};
