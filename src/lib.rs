//! llmdeck - dashboard and thin HTTP proxy for Ollama servers
//!
//! The library holds everything the `llmdeck` binary serves: a VRAM
//! estimator, a concurrent multi-model stress-test orchestrator, the fixed
//! benchmark suite, a file-backed prompt library, and the axum router that
//! exposes them next to proxied Ollama operations.

pub mod api;
pub mod benchmark;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod logging;
pub mod metrics;
pub mod prompts;
pub mod stress;
pub mod upstream;
pub mod vram;
