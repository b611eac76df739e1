//! MSH³ administrative command line
//!
//! Thin entry point over `msh3_core`: database setup, statistics and gap
//! audits, counter maintenance, historical imports, pairing inspection and
//! result publication.

mod cli;

use clap::{Parser, Subcommand};
use cli::helpers::{Context, OutputFormat};
use msh3_core::{error::Result, Cycle, MshConfig};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "msh3")]
#[command(about = "Assessment pairing, scoring and MSH-ID auditing for MSH³", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Database path or libsql:// URL (overrides MSH3_DB_PATH and config); ":memory:" for a dry run
    #[arg(long)]
    db_path: Option<String>,

    /// TOML configuration file (MSH3__* environment variables still apply)
    #[arg(long, env = "MSH3_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply the schema
    Init {
        /// Also write the effective configuration to this file
        #[arg(long)]
        write_config: Option<PathBuf>,
    },

    /// Counts by status, MSH-ID gaps and counter drift
    Stats {
        /// Exit with status 1 when the counter trails the highest id
        #[arg(long)]
        check: bool,
    },

    /// Allocate MSH ids
    Allocate {
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Set the counter to the highest MSH id in use
    SyncCounter,

    /// Reset the counter to 0
    Reset {
        /// Delete every assessment first
        #[arg(long)]
        wipe: bool,

        /// Confirm the destructive operation
        #[arg(long)]
        yes: bool,
    },

    /// Import users and assessments from a JSON bundle
    Import {
        /// JSON file with `users` and `assessments` arrays
        file: PathBuf,
    },

    /// Show the manager <-> direct-report pairing for a cycle
    Pairing {
        /// Manager user id
        #[arg(short, long)]
        manager: String,

        /// Direct report user id (all direct reports when omitted)
        #[arg(short, long)]
        direct_report: Option<String>,

        /// Cycle as YYYY-MM
        #[arg(short, long)]
        cycle: Cycle,

        /// List pending actions for this user
        #[arg(long)]
        viewer: Option<String>,
    },

    /// Preview an employee's MSH result without storing it
    Results {
        #[arg(short, long)]
        subject: String,

        /// Cycle as YYYY-MM
        #[arg(short, long)]
        cycle: Cycle,
    },

    /// Store an employee's MSH result and mark its assessments published
    Publish {
        #[arg(short, long)]
        subject: String,

        /// Cycle as YYYY-MM
        #[arg(short, long)]
        cycle: Cycle,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Our crates at the requested level, libsql internals at warn
    let filter = EnvFilter::new(format!(
        "msh3={level},msh3_core={level},libsql=warn",
        level = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("msh3 v{} starting...", env!("CARGO_PKG_VERSION"));

    let ctx = Context {
        config: MshConfig::load(cli.config.as_deref())?,
        db_path: cli.db_path,
        format: cli.format,
    };

    match cli.command {
        Commands::Init { write_config } => cli::init::handle(&ctx, write_config).await,
        Commands::Stats { check } => cli::stats::handle(&ctx, check).await,
        Commands::Allocate { count } => cli::counter::handle_allocate(&ctx, count).await,
        Commands::SyncCounter => cli::counter::handle_sync(&ctx).await,
        Commands::Reset { wipe, yes } => cli::counter::handle_reset(&ctx, wipe, yes).await,
        Commands::Import { file } => cli::import::handle(&ctx, &file).await,
        Commands::Pairing {
            manager,
            direct_report,
            cycle,
            viewer,
        } => cli::pairing::handle(&ctx, manager, direct_report, cycle, viewer).await,
        Commands::Results { subject, cycle } => {
            cli::results::handle_preview(&ctx, subject, cycle).await
        }
        Commands::Publish { subject, cycle } => {
            cli::results::handle_publish(&ctx, subject, cycle).await
        }
    }
}
