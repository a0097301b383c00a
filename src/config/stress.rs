//! Stress test defaults

use serde::{Deserialize, Serialize};

/// Defaults applied when a stress run request leaves a parameter out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressDefaults {
    pub iterations: u32,
    pub concurrent_requests: u32,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    /// Most models a single run may target
    pub max_models: usize,
}

impl Default for StressDefaults {
    fn default() -> Self {
        Self {
            iterations: 5,
            concurrent_requests: 2,
            temperature: 0.7,
            max_tokens: 512,
            timeout_ms: 30_000,
            max_models: 4,
        }
    }
}
