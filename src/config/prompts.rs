//! Prompt template storage configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// JSON file holding the full template list
    pub path: PathBuf,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("prompts.json"),
        }
    }
}
