//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "rode", version, about = "Anchor chain rode counter CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/rode_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track the chain until interrupted
    Run {
        /// Stop after this many ticks instead of running until Ctrl-C
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Simulated input: pay out this many pulses (ignored with real pins)
        #[arg(long, value_name = "PULSES")]
        sim_deploy: Option<usize>,
        /// Simulated input: haul in this many pulses (ignored with real pins)
        #[arg(long, value_name = "PULSES")]
        sim_retrieve: Option<usize>,
        /// Print a run summary on completion
        #[arg(long, action = ArgAction::SetTrue)]
        summary: bool,
    },
    /// Zero the persisted count slot and exit
    Reset,
    /// Quick health check (count slot round-trips at the configured address)
    SelfCheck,
}
