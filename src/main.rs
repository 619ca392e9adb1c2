//! # Lead Intake CLI (`leadq`)
//!
//! The `leadq` binary initializes the lead database, runs single webhooks or
//! transcripts through the pipeline, inspects contacts, and starts the stdio
//! or HTTP servers.
//!
//! ## Usage
//!
//! ```bash
//! leadq --config ./config/leadq.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `leadq init` | Create the SQLite database and run schema migrations |
//! | `leadq ingest <file>` | Run a webhook JSON file through the full pipeline |
//! | `leadq analyze <file>` | Classify a call transcript |
//! | `leadq history <lead_id>` | Show a contact's interactions and score audit trail |
//! | `leadq report` | Summarize leads by source and status |
//! | `leadq serve stdio` | Serve JSON-RPC on stdin/stdout |
//! | `leadq serve http` | Serve the HTTP API on `[server].bind` |
//!
//! Logs go to stderr and honor `RUST_LOG` (default `lead_intake=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_intake::{commands, config, migrate, rpc, server};

/// Lead Intake CLI: webhook normalization, deduplication, scoring,
/// transcript classification, and an audited interaction log.
#[derive(Parser)]
#[command(
    name = "leadq",
    about = "Lead Intake: normalize, deduplicate, score, and track inbound leads",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/leadq.toml`.
    #[arg(long, global = true, default_value = "./config/leadq.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the leads, interactions, and
    /// scoring_history tables. Safe to run repeatedly.
    Init,

    /// Run one webhook JSON file through the full intake pipeline.
    Ingest {
        /// Path to the webhook body (JSON).
        file: PathBuf,

        /// Source label to use when the payload does not identify one.
        #[arg(long)]
        source_hint: Option<String>,
    },

    /// Classify a call transcript (plain text file).
    Analyze {
        file: PathBuf,

        /// Call duration in seconds, reported in the call quality metrics.
        #[arg(long)]
        duration: Option<i64>,

        /// Business context echoed in the result.
        #[arg(long)]
        context: Option<String>,
    },

    /// Show a contact with its interactions and scoring history.
    History { lead_id: i64 },

    /// Summarize leads by source and qualification status.
    Report {
        /// Look-back window, e.g. `30d`.
        #[arg(long, default_value = "30d")]
        range: String,

        /// Only include this source system (e.g. `CallRail`).
        #[arg(long)]
        source: Option<String>,

        /// Minimum score counted as qualified.
        #[arg(long, default_value_t = 0)]
        threshold: i64,
    },

    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

#[derive(Subcommand)]
enum ServeService {
    /// Line-delimited JSON-RPC on stdin/stdout.
    Stdio,
    /// HTTP API on `[server].bind`.
    Http,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_intake=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { file, source_hint } => {
            commands::run_ingest(&cfg, &file, source_hint).await?;
        }
        Commands::Analyze {
            file,
            duration,
            context,
        } => {
            commands::run_analyze(&cfg, &file, duration, context).await?;
        }
        Commands::History { lead_id } => {
            commands::run_history(&cfg, lead_id).await?;
        }
        Commands::Report {
            range,
            source,
            threshold,
        } => {
            commands::run_report(&cfg, &range, source, threshold).await?;
        }
        Commands::Serve { service } => {
            let pipeline = commands::open_pipeline(&cfg).await?;
            match service {
                ServeService::Stdio => {
                    let stdin = BufReader::new(tokio::io::stdin());
                    rpc::serve(&pipeline, stdin, tokio::io::stdout()).await?;
                }
                ServeService::Http => {
                    server::run_server(pipeline, &cfg.server.bind).await?;
                }
            }
        }
    }

    Ok(())
}
