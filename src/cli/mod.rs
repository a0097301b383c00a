//! CLI module for llmdeck
//!
//! # Commands
//!
//! - `serve` - Start the dashboard and HTTP proxy
//! - `models` - List installed (or loaded) models
//! - `vram` - Estimate VRAM for a model
//! - `stress` - Run a concurrent multi-model stress test
//! - `benchmark` - Run the fixed benchmark suite against one model
//! - `chat` - Send a single chat message
//! - `pull` - Download a model with progress
//! - `prompts` - Manage the system prompt library
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start the dashboard on the default port
//! llmdeck serve
//!
//! # Stress two models, three iterations of four concurrent requests
//! llmdeck stress llama3:8b mistral:7b -n 3 -j 4 --output report.json
//!
//! # VRAM for a model installed on a remote server
//! llmdeck vram llama3:8b --server-url http://gpu-box:11434 --context 8192
//! ```

pub mod benchmark;
pub mod chat;
pub mod completions;
pub mod config;
pub mod models;
pub mod output;
pub mod prompts;
pub mod serve;
pub mod stress;
pub mod vram;

pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::config::DeckConfig;
use crate::upstream::{InferenceServer, OllamaServer};
use crate::vram::Precision;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// llmdeck - Ollama dashboard, benchmark and stress tester
#[derive(Parser, Debug)]
#[command(
    name = "llmdeck",
    version,
    about = "Dashboard, benchmarks, stress tests and VRAM estimates for Ollama servers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the dashboard and HTTP proxy
    Serve(ServeArgs),
    /// List models on the server
    Models(ModelsArgs),
    /// Estimate VRAM needed to run a model
    Vram(VramArgs),
    /// Run a concurrent stress test against one or more models
    Stress(StressArgs),
    /// Run the benchmark suite against one model
    Benchmark(BenchmarkArgs),
    /// Send one chat message and print the reply
    Chat(ChatArgs),
    /// Download a model
    Pull(PullArgs),
    /// Manage system prompts
    #[command(subcommand)]
    Prompts(PromptsCommands),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where to find the config file and which server to talk to.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Path to configuration file
    #[arg(short = 'c', long, default_value = "llmdeck.toml")]
    pub config: PathBuf,

    /// Ollama server URL (overrides [upstream] url)
    #[arg(short = 's', long, env = "LLMDECK_SERVER_URL")]
    pub server_url: Option<String>,
}

impl ConnectionArgs {
    /// Load the config file (or defaults) with env and CLI overrides applied.
    pub fn load_config(&self) -> Result<DeckConfig, Box<dyn std::error::Error>> {
        let mut config = DeckConfig::load_or_default(&self.config)?;
        if let Some(url) = &self.server_url {
            config.upstream.url = url.clone();
        }
        Ok(config)
    }
}

/// Client for the configured upstream server.
pub fn upstream_server(config: &DeckConfig) -> Result<Arc<dyn InferenceServer>, reqwest::Error> {
    let client = reqwest::Client::builder().build()?;
    Ok(Arc::new(
        OllamaServer::new(config.upstream.resolve(None), Arc::new(client))
            .with_default_timeout(Duration::from_secs(config.server.request_timeout_seconds)),
    ))
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Override server port
    #[arg(short, long, env = "LLMDECK_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "LLMDECK_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "LLMDECK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Prompt library file
    #[arg(long, env = "LLMDECK_PROMPTS_PATH")]
    pub prompts: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Show models currently loaded in memory instead
    #[arg(long)]
    pub running: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct VramArgs {
    /// Model name
    pub model: String,

    /// Model size in bytes; looked up on the server when omitted
    #[arg(long, conflicts_with = "size_gb")]
    pub size_bytes: Option<u64>,

    /// Model size in GiB; looked up on the server when omitted
    #[arg(long)]
    pub size_gb: Option<f64>,

    /// Context length in tokens
    #[arg(long, default_value_t = crate::vram::DEFAULT_CONTEXT_LENGTH)]
    pub context: u32,

    /// Weight precision (fp32, fp16, int8, int4)
    #[arg(long, default_value = "fp16")]
    pub precision: Precision,

    /// Batch size
    #[arg(long, default_value_t = 1)]
    pub batch: u32,

    /// Framework overhead in MB
    #[arg(long, default_value_t = crate::vram::DEFAULT_FRAMEWORK_OVERHEAD_MB)]
    pub overhead_mb: f64,

    /// Compare all precisions side by side
    #[arg(long)]
    pub compare: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct StressArgs {
    /// Models to test
    #[arg(required = true)]
    pub models: Vec<String>,

    /// Prompt sent with every request (defaults to the first built-in prompt)
    #[arg(long)]
    pub prompt: Option<String>,

    /// Number of iterations
    #[arg(short = 'n', long)]
    pub iterations: Option<u32>,

    /// Concurrent requests per model per iteration
    #[arg(short = 'j', long)]
    pub concurrent: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens per response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Write the full JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct BenchmarkArgs {
    /// Model to benchmark
    pub model: String,

    /// Write results as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Model to chat with
    pub model: String,

    /// Message text
    pub message: String,

    /// System prompt text
    #[arg(long, conflicts_with = "system_prompt")]
    pub system: Option<String>,

    /// Id of a saved system prompt
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    /// Maximum tokens in the reply
    #[arg(long, default_value_t = 2048)]
    pub max_tokens: u32,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Model to download
    pub model: String,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Subcommand, Debug)]
pub enum PromptsCommands {
    /// List prompts
    List(PromptsListArgs),
    /// Add a prompt
    Add(PromptsAddArgs),
    /// Remove a prompt
    Remove(PromptIdArgs),
    /// Toggle the favorite flag
    Favorite(PromptIdArgs),
    /// Copy a prompt
    Duplicate(PromptIdArgs),
    /// Export all prompts to a file
    Export(PromptsFileArgs),
    /// Import prompts from a file
    Import(PromptsFileArgs),
}

#[derive(Args, Debug)]
pub struct PromptsListArgs {
    /// Case-insensitive search in name and description
    #[arg(long, default_value = "")]
    pub search: String,

    /// Category filter ("All" for every category)
    #[arg(long)]
    pub category: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct PromptsAddArgs {
    /// Prompt name
    pub name: String,

    /// Prompt text
    pub content: String,

    #[arg(short, long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub favorite: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct PromptIdArgs {
    /// Prompt id
    pub id: String,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct PromptsFileArgs {
    /// JSON file
    pub path: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "llmdeck.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["llmdeck", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.connection.config, PathBuf::from("llmdeck.toml"));
                assert!(args.port.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["llmdeck", "serve", "-p", "9000"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.port, Some(9000)),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_stress() {
        let cli = Cli::try_parse_from([
            "llmdeck", "stress", "llama3", "mistral", "-n", "3", "-j", "4", "--timeout-ms", "500",
        ])
        .unwrap();
        match cli.command {
            Commands::Stress(args) => {
                assert_eq!(args.models, vec!["llama3", "mistral"]);
                assert_eq!(args.iterations, Some(3));
                assert_eq!(args.concurrent, Some(4));
                assert_eq!(args.timeout_ms, Some(500));
            }
            _ => panic!("Expected Stress command"),
        }
    }

    #[test]
    fn test_cli_stress_requires_a_model() {
        assert!(Cli::try_parse_from(["llmdeck", "stress"]).is_err());
    }

    #[test]
    fn test_cli_parse_vram_precision() {
        let cli = Cli::try_parse_from([
            "llmdeck", "vram", "llama3", "--size-gb", "4.5", "--precision", "int4",
        ])
        .unwrap();
        match cli.command {
            Commands::Vram(args) => {
                assert_eq!(args.precision, Precision::Int4);
                assert_eq!(args.size_gb, Some(4.5));
                assert_eq!(args.context, 4096);
            }
            _ => panic!("Expected Vram command"),
        }
    }

    #[test]
    fn test_cli_vram_rejects_unknown_precision() {
        assert!(
            Cli::try_parse_from(["llmdeck", "vram", "m", "--precision", "fp8"]).is_err()
        );
    }

    #[test]
    fn test_cli_parse_prompts_add() {
        let cli = Cli::try_parse_from([
            "llmdeck", "prompts", "add", "Pirate", "Talk like a pirate.", "--category", "Fun",
        ])
        .unwrap();
        match cli.command {
            Commands::Prompts(PromptsCommands::Add(args)) => {
                assert_eq!(args.name, "Pirate");
                assert_eq!(args.category.as_deref(), Some("Fun"));
            }
            _ => panic!("Expected Prompts Add command"),
        }
    }

    #[test]
    fn test_cli_parse_models_running() {
        let cli = Cli::try_parse_from(["llmdeck", "models", "--running", "--json"]).unwrap();
        match cli.command {
            Commands::Models(args) => {
                assert!(args.running);
                assert!(args.json);
            }
            _ => panic!("Expected Models command"),
        }
    }
}
