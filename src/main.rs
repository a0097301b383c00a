use clap::Parser;
use llmdeck::cli::{
    benchmark, chat, handle_completions, handle_config_init, models, prompts, stress, vram, Cli,
    Commands, ConfigCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => llmdeck::cli::serve::run_serve(args)
            .await
            .map(|()| String::new()),
        Commands::Models(args) => models::handle_models(&args).await,
        Commands::Pull(args) => models::handle_pull(&args).await,
        Commands::Vram(args) => vram::handle_vram(&args).await,
        Commands::Stress(args) => stress::handle_stress(&args).await,
        Commands::Benchmark(args) => benchmark::handle_benchmark(&args).await,
        Commands::Chat(args) => chat::handle_chat(&args).await,
        Commands::Prompts(cmd) => prompts::handle_prompts(&cmd),
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(String::new())
        }
    };

    match result {
        Ok(output) if !output.is_empty() => println!("{}", output),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
