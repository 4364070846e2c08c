//! The quizdraft command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizdraft", version, about = "Curate scored assessment question sets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the questions of a set
    Show {
        /// Assessment id
        #[arg(long)]
        set: u64,

        /// Gateway name from the config (default: `default_gateway`)
        #[arg(long)]
        gateway: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Preview score normalization for a list of point values
    Normalize {
        /// Comma-separated point values (e.g. "37,20,0")
        #[arg(long)]
        points: String,
    },

    /// Apply an edit script to a set and confirm it
    Edit {
        /// Assessment id
        #[arg(long)]
        set: u64,

        /// Path to a .toml edit script
        #[arg(long)]
        script: PathBuf,

        /// Apply the proposed normalization without asking
        #[arg(long, conflicts_with = "decline_normalization")]
        accept_normalization: bool,

        /// Refuse normalization without asking
        #[arg(long)]
        decline_normalization: bool,

        /// Write the confirmation report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Gateway name from the config
        #[arg(long)]
        gateway: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Replace a set with freshly generated questions
    Regenerate {
        /// Assessment id
        #[arg(long)]
        set: u64,

        /// Number of questions (default: `regenerate_count`)
        #[arg(long)]
        count: Option<usize>,

        /// Gateway name from the config
        #[arg(long)]
        gateway: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config, a sample store and an example edit script
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizdraft=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Show {
            set,
            gateway,
            config,
        } => commands::show::execute(set, gateway, config).await,
        Commands::Normalize { points } => commands::normalize::execute(&points),
        Commands::Edit {
            set,
            script,
            accept_normalization,
            decline_normalization,
            report,
            gateway,
            config,
        } => {
            let decision = if accept_normalization {
                commands::edit::Decision::Accept
            } else if decline_normalization {
                commands::edit::Decision::Decline
            } else {
                commands::edit::Decision::Ask
            };
            commands::edit::execute(set, script, decision, report, gateway, config).await
        }
        Commands::Regenerate {
            set,
            count,
            gateway,
            config,
        } => commands::regenerate::execute(set, count, gateway, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
