//! toolloop CLI - the main entry point.
//!
//! Commands:
//! - `serve`  - Start the HTTP/SSE gateway
//! - `chat`   - Run one agent invocation in the terminal
//! - `tools`  - Print the tool catalog

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "toolloop",
    about = "toolloop - streaming LLM agent with sandboxed workspace tools",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to load instead of ~/.toolloop/config.toml
    #[arg(short, long, global = true, env = "TOOLLOOP_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message to the agent
    Chat {
        /// The user message
        #[arg(short, long)]
        message: String,

        /// Override the model
        #[arg(long)]
        model: Option<String>,
    },

    /// Print the tool catalog as JSON
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => commands::serve::run(config, host, port).await?,
        Commands::Chat { message, model } => commands::chat::run(config, message, model).await?,
        Commands::Tools => commands::tools::run()?,
    }

    Ok(())
}
