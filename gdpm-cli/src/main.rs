//! gdpm - Godot plugin manager
//!
//! Keeps `gdpm.json`, `addons/` and `project.godot` in agreement.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "gdpm",
    about = "Install, link and enable Godot editor plugins from GitHub",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Project root (defaults to the nearest directory holding gdpm.json)
    #[clap(long, global = true, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Set the logging level
    #[clap(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON on stderr
    #[clap(long, global = true)]
    log_json: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Create an empty gdpm.json for the current project
    Init,

    /// Install a plugin from GitHub and enable it
    Add {
        /// Plugin spec: @owner/repo[@version]
        spec: String,
    },

    /// Disable a plugin, delete its addon directory and drop it from gdpm.json
    #[clap(alias = "rm")]
    Remove {
        /// Plugin key: @owner/repo
        plugin: String,
    },

    /// Link an addon directory to a local working copy
    Link {
        /// Plugin key (@owner/repo) or, on its own, a local path
        target: String,

        /// Local addon directory containing plugin.cfg
        path: Option<String>,
    },

    /// Replace a linked addon with an installed copy (or remove it)
    Unlink {
        /// Plugin key: @owner/repo
        #[clap(required_unless_present = "all", conflicts_with = "all")]
        plugin: Option<String>,

        /// Also drop the remembered link path
        #[clap(long)]
        forget: bool,

        /// Unlink every linked plugin
        #[clap(long)]
        all: bool,
    },

    /// Install every plugin in gdpm.json whose addon directory is missing
    Install,

    /// Show the plugins declared in gdpm.json
    #[clap(alias = "ls")]
    List {
        /// Output as JSON
        #[clap(long)]
        json: bool,
    },
}

fn initialize_tracing(log_level: &LogLevel, json: bool) {
    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Exit code for an error: 2 when the user can fix the invocation
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<gdpm_core::Error>() {
        Some(core) if core.is_user_input() => 2,
        _ => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(commands::execute(cli.command, cli.project))
}

fn main() -> ExitCode {
    // Argument errors exit with 2 through clap
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level, cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("command failed: {err:?}");
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
