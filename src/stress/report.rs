//! Exportable snapshot of a run.

use super::summary::{summarize_all, ModelSummary};
use super::types::{ModelResults, StressTestConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressReport {
    pub config: Option<StressTestConfig>,
    pub selected_models: Vec<String>,
    pub results: Vec<ModelResults>,
    pub summary: Vec<ModelSummary>,
    pub exported_at: DateTime<Utc>,
}

impl StressReport {
    pub fn new(
        config: Option<StressTestConfig>,
        selected_models: Vec<String>,
        results: Vec<ModelResults>,
    ) -> Self {
        let summary = summarize_all(&results);
        Self {
            config,
            selected_models,
            results,
            summary,
            exported_at: Utc::now(),
        }
    }

    /// Suggested file name, `stress-test-results-<unix millis>.json`.
    pub fn default_file_name(&self) -> String {
        format!(
            "stress-test-results-{}.json",
            self.exported_at.timestamp_millis()
        )
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json_pretty().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
