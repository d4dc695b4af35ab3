mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use redmatch_core::RedmatchError;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Redmatch rule language toolchain.
#[derive(Parser)]
#[command(name = "redmatch", version, about = "Redmatch rule language toolchain")]
struct Cli {
    /// Output format (text or json); defaults to the config file, then text
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a redmatch.toml configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a rule document and print its tree
    Parse {
        /// Path to the .rdm rule document
        file: PathBuf,
    },

    /// Report diagnostics for a rule document
    Check {
        /// Path to the .rdm rule document
        file: PathBuf,
    },

    /// Print per-line highlighting tokens
    Tokens {
        /// Path to the .rdm rule document
        file: PathBuf,
    },

    /// Convert diagnostics into editor markers
    Markers {
        /// Path to the .rdm rule document
        #[arg(required_unless_present = "issues")]
        file: Option<PathBuf>,
        /// JSON list of externally reported issues to convert instead
        #[arg(long, conflicts_with = "file")]
        issues: Option<PathBuf>,
    },

    /// Expand REPEAT clauses and print the result
    Expand {
        /// Path to the .rdm rule document
        file: PathBuf,
    },

    /// Start the Language Server Protocol server (stdio)
    Lsp,
}

/// Settings resolved from flags and the config file, shared by commands.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settings {
    pub output: OutputFormat,
    pub quiet: bool,
    pub max_errors: usize,
}

fn main() {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(
                &e.to_string(),
                cli.output.unwrap_or(OutputFormat::Text),
                cli.quiet,
            );
            process::exit(1);
        }
    };

    init_logging(&config.log.level, cli.verbose);

    let settings = Settings {
        output: cli.output.or(config.output.format).unwrap_or(OutputFormat::Text),
        quiet: cli.quiet,
        max_errors: config.parser.max_errors,
    };

    let result = match cli.command {
        Commands::Parse { file } => commands::parse::cmd_parse(&file, settings),
        Commands::Check { file } => commands::check::cmd_check(&file, settings),
        Commands::Tokens { file } => commands::tokens::cmd_tokens(&file, settings),
        Commands::Markers { file, issues } => {
            commands::markers::cmd_markers(file.as_deref(), issues.as_deref(), settings)
        }
        Commands::Expand { file } => commands::expand::cmd_expand(&file, settings),
        Commands::Lsp => redmatch_lsp::run(settings.max_errors)
            .map_err(|e| RedmatchError::Server(e.to_string())),
    };

    if let Err(e) = result {
        report_error(&e.to_string(), settings.output, settings.quiet);
        process::exit(1);
    }
}

/// Install the stderr subscriber. `RUST_LOG` takes precedence over the
/// configured level; `-v` raises the configured level.
fn init_logging(level: &str, verbose: u8) {
    let directive = match verbose {
        0 => level,
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
