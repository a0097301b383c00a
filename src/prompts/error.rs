use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptStoreError {
    #[error("Prompt store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse prompt file: {0}")]
    Parse(String),

    #[error("Prompt '{0}' not found")]
    NotFound(String),

    #[error("Invalid prompt {field}: {message}")]
    Validation { field: &'static str, message: String },
}
