//! `otto`: container migration toolkit.
//!
//! # Usage
//!
//! ```text
//! otto spec --inspect inspect.json
//! otto send --input rootfs.tar --output messages.jsonl --chunk-size 65536
//! otto receive --messages messages.jsonl --output rootfs.tar
//! otto simulate --strategy export_import --config otto.toml
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "otto",
    about = "Otto - migrate containers between hosts",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a portable container spec from `docker inspect` output.
    Spec {
        /// Path to a JSON inspection record (a single object or a
        /// one-element array, as `docker inspect` prints).
        #[arg(short, long)]
        inspect: PathBuf,
    },
    /// Split a file into a chunked transfer and write its messages as JSON lines.
    Send {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Chunk size in bytes. Overrides [transfer].chunk_size.
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Path to otto.toml.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Replay JSON-lines transfer messages and write the verified payload.
    Receive {
        #[arg(short, long)]
        messages: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Migrate a seeded container between two in-memory hosts.
    ///
    /// Host endpoints are taken from the first two [[nodes]] in otto.toml
    /// when present.
    Simulate {
        /// stop_start, export_import or criu. Overrides [migration].strategy.
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Route the export payload through the chunked transfer protocol.
        #[arg(long)]
        chunked: bool,
        /// Leave the source container in place.
        #[arg(long)]
        keep_source: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,otto=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Spec { inspect } => commands::spec::spec(&inspect),
        Commands::Send {
            input,
            output,
            chunk_size,
            config,
        } => commands::transfer::send(&input, &output, chunk_size, config.as_deref()).await,
        Commands::Receive { messages, output } => {
            commands::transfer::receive(&messages, &output).await
        }
        Commands::Simulate {
            strategy,
            config,
            chunked,
            keep_source,
        } => {
            commands::simulate::simulate(
                strategy.as_deref(),
                config.as_deref(),
                chunked,
                keep_source,
            )
            .await
        }
    }
}
