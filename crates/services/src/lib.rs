#![forbid(unsafe_code)]

pub mod completion;
pub mod error;
pub mod settings;

pub use completion::{CompletionReport, CompletionService, CustomCompletion, RuleReport};
pub use error::{CompletionError, SettingsError};
pub use settings::CompletionSettings;
