use thiserror::Error;

use crate::model::{KuetError, ParseRuleError, ResponseError, SessionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Kuet(#[from] KuetError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error(transparent)]
    Rule(#[from] ParseRuleError),
}
