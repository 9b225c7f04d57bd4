//! `llmr` entry point.
//!
//! Loads `.env.local` and tracing before dispatching a subcommand. Logs go
//! to stderr so stdout stays machine-readable JSON.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "llmr")]
#[command(about = "LLM report generation client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger report generation for a room and wait for the result
    Generate {
        /// Room id to generate the report for
        room_id: String,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Poll only; do not connect to the push channel
        #[arg(long, default_value_t = false)]
        no_push: bool,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 300)]
        timeout_secs: u64,
    },

    /// Normalize a raw report payload (file or stdin) and print canonical JSON
    Normalize {
        /// Payload file; reads stdin when omitted
        path: Option<PathBuf>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Generate {
            room_id,
            config_paths,
            no_push,
            timeout_secs,
        } => {
            commands::generate::run(commands::generate::GenerateArgs {
                room_id,
                config_paths,
                no_push,
                timeout_secs,
            })
            .await?
        }

        Commands::Normalize { path } => commands::normalize::run(path.as_deref())?,

        Commands::ConfigHash { paths } => {
            let loaded = commands::load_config(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
