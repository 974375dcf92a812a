//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Virtual Gimbal - gyro-driven rolling-shutter video stabilization
#[derive(Parser, Debug)]
#[command(
    name = "virtual-gimbal",
    author,
    version,
    about = "Gyro-driven rolling-shutter video stabilization",
    long_about = "Integrates gyro samples into a drifting and a low-pass tracked orientation,\n\
                  pairs every camera scanline with its capture time, and warps frames\n\
                  with a per-row corrective rotation before dispatching them to sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "VIRTUAL_GIMBAL_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "VIRTUAL_GIMBAL_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level derived from -q / -v
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the stabilization pipeline on the mock gyro and camera
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "VIRTUAL_GIMBAL_CONFIG"
    )]
    pub config: PathBuf,

    /// Override camera line delay (seconds, signed)
    #[arg(long, allow_negative_numbers = true, env = "VIRTUAL_GIMBAL_LINE_DELAY")]
    pub line_delay: Option<f64>,

    /// Override the warp kernel
    #[arg(long, value_enum, env = "VIRTUAL_GIMBAL_KERNEL")]
    pub kernel: Option<KernelArg>,

    /// Maximum number of stabilized frames to produce (0 = unlimited)
    #[arg(long, default_value = "0", env = "VIRTUAL_GIMBAL_MAX_FRAMES")]
    pub max_frames: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "VIRTUAL_GIMBAL_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size between scheduler and dispatcher
    #[arg(long, default_value = "256", env = "VIRTUAL_GIMBAL_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "VIRTUAL_GIMBAL_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show mock source settings
    #[arg(long)]
    pub sources: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

/// Warp kernel selection
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelArg {
    Cpu,
    Passthrough,
}

impl From<KernelArg> for contracts::KernelKind {
    fn from(kernel: KernelArg) -> Self {
        match kernel {
            KernelArg::Cpu => contracts::KernelKind::Cpu,
            KernelArg::Passthrough => contracts::KernelKind::Passthrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_overrides_parse() {
        let cli = Cli::try_parse_from([
            "virtual-gimbal",
            "-v",
            "run",
            "--config",
            "gimbal.toml",
            "--line-delay",
            "-0.00003",
            "--kernel",
            "passthrough",
            "--max-frames",
            "10",
        ])
        .unwrap();

        assert_eq!(cli.log_level(), "debug");
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("gimbal.toml"));
        assert_eq!(args.line_delay, Some(-0.00003));
        assert_eq!(args.kernel, Some(KernelArg::Passthrough));
        assert_eq!(args.max_frames, 10);
    }

    #[test]
    fn test_quiet_level() {
        let cli = Cli::try_parse_from(["virtual-gimbal", "-q", "validate"]).unwrap();
        assert_eq!(cli.log_level(), "warn");
    }
}
