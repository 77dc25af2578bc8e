//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Effective run limit for the current command (for JSON error details).
pub static LAST_MAX_RUN_MS: OnceLock<u64> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "blinds", version, about = "Window-covering position estimator")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output JSON lines instead of text (logs and results)
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the simulated covering to a target position and report the estimate
    Simulate {
        /// Target position, 0 (closed) ..= 100 (open)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        target: u8,
        /// Start position of the simulated motor (overrides [simulator].start_position)
        #[arg(long, value_name = "POS", value_parser = clap::value_parser!(u8).range(0..=100))]
        from: Option<u8>,
        /// Override the run limit in ms (takes precedence over [runner].max_run_ms)
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
        /// Print total runtime on completion
        #[arg(long, action = ArgAction::SetTrue)]
        print_runtime: bool,
    },
    /// Operate the simulated wall switch and follow the estimate
    Press {
        /// Action token to send (as configured, e.g. open|close|stop)
        token: String,
        /// Start position of the simulated motor
        #[arg(long, value_name = "POS", value_parser = clap::value_parser!(u8).range(0..=100))]
        from: Option<u8>,
        /// Press the stop token after this many ms
        #[arg(long, value_name = "MS")]
        stop_after_ms: Option<u64>,
        /// Override the run limit in ms
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
    },
    /// Print the resolved device profile (timings, tokens, data-points)
    Profile,
    /// Quick health check: config, simulator and session start-up
    SelfCheck,
}
