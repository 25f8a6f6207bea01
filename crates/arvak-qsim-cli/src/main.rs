//! Arvak Simulator Control Layer CLI
//!
//! Runs small gate programs against the control layer and inspects its
//! configuration.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::EnvFilter;

use arvak_qsim::{LoggingConfig, QsimConfig};

mod commands;
mod program;

use commands::{config, gates, run, version};

/// Arvak qsim - drive simulator instances from the command line
#[derive(Parser)]
#[command(name = "arvak-qsim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to ~/.arvak/qsim.yaml if present)
    #[arg(short, long, global = true, env = "ARVAK_QSIM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a gate program
    Run {
        /// Program file (YAML or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Backend to use (statevector, trace); overrides the configuration
        #[arg(short, long)]
        backend: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// List supported gates
    Gates,

    /// Show the effective configuration
    Config,

    /// Show version information
    Version,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// Machine-readable JSON
    Json,
}

fn init_logging(verbose: u8, logging: &LoggingConfig) {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = QsimConfig::load(cli.config.as_deref());
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(cli.verbose, &logging);
    let loaded = loaded.map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"));

    let result = match cli.command {
        Commands::Run {
            input,
            backend,
            format,
        } => loaded.and_then(|c| run::execute(&input, backend.as_deref(), format, &c)),

        Commands::Gates => {
            gates::execute();
            Ok(())
        }

        Commands::Config => loaded.and_then(|c| config::execute(&c, cli.config.as_deref())),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
