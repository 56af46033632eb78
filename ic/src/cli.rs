//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::coordinator::MAX_AUTO_INTERVAL_SECS;
use crate::domain::LogLevel;
use crate::harness::RequestKind;

/// Intersect - four-way intersection signal controller simulator
#[derive(Parser)]
#[command(
    name = "ic",
    about = "Four-way intersection signal controller with VIP preemption and load simulation",
    version = env!("CARGO_PKG_VERSION"),
    after_help = after_help(),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the intersection for a while, streaming signal changes
    Simulate {
        /// How long to run, in seconds
        #[arg(short, long, default_value = "30")]
        duration: u64,

        /// Turn on periodic request generation
        #[arg(short, long)]
        auto: bool,

        /// Seconds between auto-generated bursts (1-3600)
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=MAX_AUTO_INTERVAL_SECS))]
        interval: Option<u64>,

        /// Regular requests to issue at start (T1..T4)
        #[arg(short, long = "request", value_name = "SIGNAL")]
        requests: Vec<String>,

        /// VIP request to issue once the run is underway
        #[arg(long, value_name = "SIGNAL")]
        vip: Option<String>,

        /// Seconds into the run at which the VIP request is issued
        #[arg(long, default_value = "3")]
        vip_after: u64,

        /// Write the (filtered) log view to a file when done; without PATH a
        /// timestamped name in the current directory is used
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        export_logs: Option<Option<PathBuf>>,

        #[command(flatten)]
        filter: LogFilterArgs,
    },

    /// Request one signal sequence and follow it to red
    Request {
        /// Signal to request (T1..T4)
        #[arg(value_name = "SIGNAL")]
        signal: String,

        /// Request with VIP priority
        #[arg(long)]
        vip: bool,
    },

    /// Fire a batch of simulated requests at the server pool
    LoadTest {
        /// Number of simultaneous requests (1-100)
        #[arg(short = 'n', long, default_value = "15")]
        concurrency: u32,

        /// Per-request timeout in milliseconds (1000-30000)
        #[arg(short = 't', long, default_value = "5000")]
        timeout_ms: u64,

        /// Request kind (signal_status, vip_request, mixed)
        #[arg(short = 'k', long, default_value = "signal_status")]
        kind: RequestKind,

        /// Write the JSON report to a file; without PATH a timestamped name
        /// in the current directory is used
        #[arg(short, long, value_name = "PATH", num_args = 0..=1)]
        export: Option<Option<PathBuf>>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Register clock readings and compute the Berkeley average
    Sync {
        /// Server reading (HH:MM:SS); defaults to the local clock
        #[arg(short, long, value_name = "HH:MM:SS")]
        server: Option<String>,

        /// Client reading as id=HH:MM:SS (repeatable)
        #[arg(long = "client", value_name = "ID=HH:MM:SS", value_parser = parse_client_time)]
        clients: Vec<(String, String)>,
    },
}

/// Log view filters shared by commands that print or export logs
#[derive(Debug, Clone, Default, clap::Args)]
pub struct LogFilterArgs {
    /// Only entries of this level (info, warning, error)
    #[arg(long = "level")]
    pub level: Option<LogLevel>,

    /// Only entries from this component
    #[arg(long = "component")]
    pub component: Option<String>,

    /// Only entries whose message or component contains this text
    #[arg(long = "search")]
    pub search: Option<String>,
}

impl From<LogFilterArgs> for crate::domain::LogFilter {
    fn from(args: LogFilterArgs) -> Self {
        Self {
            level: args.level,
            component: args.component,
            search: args.search,
        }
    }
}

/// Split `id=HH:MM:SS`; the time itself is validated later
fn parse_client_time(s: &str) -> Result<(String, String), String> {
    debug!(%s, "parse_client_time: called");
    match s.split_once('=') {
        Some((id, time)) if !id.trim().is_empty() => Ok((id.trim().to_string(), time.trim().to_string())),
        _ => Err(format!("Expected ID=HH:MM:SS, got '{}'", s)),
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("intersect")
        .join("logs")
        .join("intersect.log")
}

fn after_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}

/// Output format for reports
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
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
    fn test_parse_load_test() {
        let cli = Cli::try_parse_from(["ic", "load-test", "-n", "20", "-k", "mixed", "--format", "json"]).unwrap();
        match cli.command {
            Command::LoadTest {
                concurrency,
                timeout_ms,
                kind,
                format,
                ..
            } => {
                assert_eq!(concurrency, 20);
                assert_eq!(timeout_ms, 5000);
                assert_eq!(kind, RequestKind::Mixed);
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_sync_clients() {
        let cli = Cli::try_parse_from([
            "ic",
            "sync",
            "--server",
            "10:00:00",
            "--client",
            "manual-vip=10:00:30",
            "--client",
            "vehicle-controller=09:59:30",
        ])
        .unwrap();
        match cli.command {
            Command::Sync { server, clients } => {
                assert_eq!(server.as_deref(), Some("10:00:00"));
                assert_eq!(clients.len(), 2);
                assert_eq!(clients[0], ("manual-vip".to_string(), "10:00:30".to_string()));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["ic", "sync", "--client", "nope"]).is_err());
    }

    #[test]
    fn test_parse_simulate_filters() {
        let cli = Cli::try_parse_from([
            "ic", "simulate", "-d", "5", "-r", "T1", "--vip", "T3", "--level", "warning", "--search", "vip",
        ])
        .unwrap();
        match cli.command {
            Command::Simulate {
                duration,
                requests,
                vip,
                filter,
                ..
            } => {
                assert_eq!(duration, 5);
                assert_eq!(requests, vec!["T1".to_string()]);
                assert_eq!(vip.as_deref(), Some("T3"));
                assert_eq!(filter.level, Some(LogLevel::Warning));
                assert_eq!(filter.search.as_deref(), Some("vip"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_simulate_interval_is_bounded() {
        assert!(Cli::try_parse_from(["ic", "simulate", "--interval", "0"]).is_err());
        assert!(Cli::try_parse_from(["ic", "simulate", "--interval", "3601"]).is_err());
        assert!(Cli::try_parse_from(["ic", "simulate", "--interval", "18446744073709551615"]).is_err());

        let cli = Cli::try_parse_from(["ic", "simulate", "--interval", "3600"]).unwrap();
        match cli.command {
            Command::Simulate { interval, .. } => assert_eq!(interval, Some(3600)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_export_path_is_optional() {
        let cli = Cli::try_parse_from(["ic", "load-test", "--export"]).unwrap();
        match cli.command {
            Command::LoadTest { export, .. } => assert_eq!(export, Some(None)),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["ic", "simulate", "--export-logs", "out/logs.txt"]).unwrap();
        match cli.command {
            Command::Simulate { export_logs, .. } => {
                assert_eq!(export_logs, Some(Some(PathBuf::from("out/logs.txt"))));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_output_format() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("table".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Text.to_string(), "text");
    }
}
