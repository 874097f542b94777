//! assessor CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "assessor", version, about = "Timed quiz and assignment engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one attempt end to end and store it
    Grade {
        /// Path to the assessment .toml file
        #[arg(long)]
        assessment: PathBuf,

        /// JSON object mapping question id to answer
        #[arg(long)]
        answers: PathBuf,

        /// Learner id (defaults to `default_user` from config)
        #[arg(long)]
        user: Option<String>,

        /// When the attempt started, RFC 3339 (default: now)
        #[arg(long)]
        started_at: Option<String>,

        /// When the attempt was submitted, RFC 3339 (default: now)
        #[arg(long)]
        submitted_at: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show a learner's stored attempts at an assessment
    History {
        /// Path to the assessment .toml file
        #[arg(long)]
        assessment: PathBuf,

        /// Learner id (defaults to `default_user` from config)
        #[arg(long)]
        user: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate assessment TOML files
    Validate {
        /// Path to assessment file or directory
        #[arg(long)]
        assessment: PathBuf,
    },

    /// Create starter config and example assessment
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("assessor=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            assessment,
            answers,
            user,
            started_at,
            submitted_at,
            config,
        } => {
            commands::grade::execute(assessment, answers, user, started_at, submitted_at, config)
                .await
        }
        Commands::History {
            assessment,
            user,
            config,
        } => commands::history::execute(assessment, user, config).await,
        Commands::Validate { assessment } => commands::validate::execute(assessment),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
