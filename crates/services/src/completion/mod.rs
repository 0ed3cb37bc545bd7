mod answer_all;
mod custom;
mod service;

pub use crate::error::CompletionError;
pub use custom::CustomCompletion;
pub use service::{CompletionReport, CompletionService, RuleReport};
