use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "telemetry-pipeline", version, about = "Telemetry batching pipeline")]
pub struct Cli {
    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long, global = true, env = "TELEMETRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level for the pipeline's own diagnostics
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Emit diagnostics as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Emit synthetic telemetry through the debug exporter
    Demo {
        /// Number of log records
        #[arg(long, default_value = "5")]
        logs: usize,

        /// Number of spans
        #[arg(long, default_value = "3")]
        spans: usize,

        /// Number of metric points
        #[arg(long, default_value = "3")]
        metrics: usize,

        /// Print the pipeline's Prometheus self-metrics afterwards
        #[arg(long)]
        show_metrics: bool,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display the effective configuration (with header values masked)
    Show,

    /// Validate configuration file
    Validate,
}
