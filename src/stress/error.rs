//! Errors rejected before a stress run dispatches anything.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StressError {
    #[error("No models selected")]
    EmptySelection,

    #[error("Too many models selected: {selected} (maximum {max})")]
    TooManyModels { selected: usize, max: usize },

    #[error("Invalid value for '{field}': {message}")]
    InvalidParameter { field: &'static str, message: String },

    #[error("A stress test is already running")]
    AlreadyRunning,
}
