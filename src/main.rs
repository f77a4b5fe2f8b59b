use anyhow::Context;
use clap::{Parser, Subcommand};
use coro::config::{Config, ConfigError};
use coro::utils::token_fingerprint;
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "coro")]
#[command(
    about = "A resilient multi-node streaming coordinator with per-guild failover for bot fleets"
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Coro Team")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an example configuration file
    Config {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show version information
    Version,
}

// The fleet core exposes no run surface of its own: the embedding
// application constructs `coro::Fleet` with its gateway transports. This
// binary is configuration tooling.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { output } => {
            generate_config(output)?;
        }
        Commands::Validate { config } => {
            validate_config(config)?;
        }
        Commands::Version => {
            show_version();
        }
    }

    Ok(())
}

fn generate_config(output: PathBuf) -> anyhow::Result<()> {
    println!("Generating configuration file: {:?}", output);

    Config::create_example_config(&output)
        .with_context(|| format!("Failed to generate config at {:?}", output))?;

    println!("Configuration file generated successfully!");
    println!("Edit the file to add your bot tokens, then validate it with:");
    println!("  coro validate --config {:?}", output);

    Ok(())
}

fn validate_config(config_path: PathBuf) -> anyhow::Result<()> {
    println!("Validating configuration file: {:?}", config_path);

    match Config::load_from_file(&config_path) {
        Ok(config) => {
            info!("Configuration loaded from: {:?}", config_path);

            println!("✓ Configuration file is valid");
            println!("  Fleet nodes: {} instance(s)", config.fleet.nodes.len());
            for (i, node) in config.fleet.nodes.iter().enumerate() {
                let name = node.name.as_deref().unwrap_or("(generated at startup)");
                println!(
                    "    {}: {} (token fingerprint {})",
                    i + 1,
                    name,
                    token_fingerprint(&node.token)
                );
            }
            println!("  Stream source: {}", config.stream.source_url);
            println!(
                "  Re-election sweep interval: {}s",
                config.fleet.health_check_interval_sec
            );
            println!(
                "  Reconnect delays: {}s after disconnect, {}s after ready",
                config.stream.reconnect_delay_sec, config.stream.ready_reconnect_delay_sec
            );
        }
        Err(e) => {
            eprintln!("✗ Configuration file validation failed:");
            match &e {
                ConfigError::IoError(msg) => eprintln!("  File error: {}", msg),
                ConfigError::ParseError(msg) => eprintln!("  Parse error: {}", msg),
                ConfigError::ValidationError(msg) => eprintln!("  Validation error: {}", msg),
                ConfigError::SerializeError(msg) => eprintln!("  Serialization error: {}", msg),
            }
            return Err(e.into());
        }
    }

    Ok(())
}

fn show_version() {
    println!("coro v{}", env!("CARGO_PKG_VERSION"));
    println!("A resilient multi-node streaming coordinator with per-guild failover");
    println!();
    println!("Features:");
    println!("  • Per-guild primary election with automatic failover");
    println!("  • Voice reconnection with playback resume after drops");
    println!("  • 24/7 loop playback with retry on stream load failure");
    println!("  • Async I/O with Tokio");
}
