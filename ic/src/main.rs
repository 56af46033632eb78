//! ic - intersection controller
//!
//! CLI entry point for running the simulated intersection.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, info};

use intersect::cli::{Cli, Command, LogFilterArgs, OutputFormat};
use intersect::config::Config;
use intersect::domain::{LogFilter, LogLevel, Phase, SignalId};
use intersect::events::{IntersectionEvent, TransitionCause};
use intersect::export;
use intersect::harness::{LoadTestConfig, RequestKind, RequestStatus, TestReport};
use intersect::system::Intersection;
use intersect::timesync::{ClockSync, format_clock_time};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("intersect")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("intersect.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log level comes from the config file before the full load
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(seed = ?config.seed, "ic loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Simulate {
            duration,
            auto,
            interval,
            requests,
            vip,
            vip_after,
            export_logs,
            filter,
        } => {
            let plan = SimulationPlan {
                duration: Duration::from_secs(duration),
                auto,
                interval,
                requests,
                vip,
                vip_after: Duration::from_secs(vip_after),
            };
            cmd_simulate(&config, plan, export_logs, filter).await
        }
        Command::Request { signal, vip } => cmd_request(&config, &signal, vip).await,
        Command::LoadTest {
            concurrency,
            timeout_ms,
            kind,
            export,
            format,
        } => cmd_load_test(&config, concurrency, timeout_ms, kind, export, format).await,
        Command::Sync { server, clients } => cmd_sync(server, clients),
    }
}

fn paint_phase(phase: Phase) -> colored::ColoredString {
    let label = phase.to_string();
    match phase {
        Phase::Red => label.red().bold(),
        Phase::Yellow => label.yellow().bold(),
        Phase::Green => label.green().bold(),
    }
}

fn paint_level(level: LogLevel) -> colored::ColoredString {
    let label = level.to_string();
    match level {
        LogLevel::Info => label.blue(),
        LogLevel::Warning => label.yellow(),
        LogLevel::Error => label.red(),
    }
}

/// Print one event; returns the signal whose sequence completed, if any
fn print_event(event: &IntersectionEvent) -> Option<SignalId> {
    match event {
        IntersectionEvent::PhaseChanged {
            transition, cause, vip, ..
        } => {
            let tag = match (cause, vip) {
                (TransitionCause::Preemption, _) => " (preempted)".magenta().to_string(),
                (_, true) => " [VIP]".magenta().to_string(),
                _ => String::new(),
            };
            println!(
                "{:>3} {} {} -> {}  {} {}{}",
                transition.signal.to_string().bold(),
                "phase".dimmed(),
                transition.from,
                paint_phase(transition.to),
                transition.signal.pedestrian_label().dimmed(),
                transition.pedestrian,
                tag
            );
            None
        }
        IntersectionEvent::Preempted { preempted, by } => {
            println!("{} {} preempted by VIP {}", "!!".magenta().bold(), preempted, by);
            None
        }
        IntersectionEvent::RequestRejected { signal, reason, .. } => {
            println!("{} {}: {}", "rejected".red(), signal, reason);
            None
        }
        IntersectionEvent::SequenceCompleted { signal, vip } => {
            let kind = if *vip { "VIP" } else { "regular" };
            println!("{} {} {} sequence complete", "ok".green(), signal, kind);
            Some(*signal)
        }
        IntersectionEvent::ServerChanged { server } => {
            let state = if server.connected { "connected".green() } else { "disconnected".red() };
            println!(
                "server {} {} ({:.0}% load)",
                server.id,
                state,
                server.utilization() * 100.0
            );
            None
        }
        IntersectionEvent::SequenceStarted { .. }
        | IntersectionEvent::LogRecorded { .. }
        | IntersectionEvent::LoadTestCompleted { .. } => None,
    }
}

struct SimulationPlan {
    duration: Duration,
    auto: bool,
    interval: Option<u64>,
    requests: Vec<String>,
    vip: Option<String>,
    vip_after: Duration,
}

async fn cmd_simulate(
    config: &Config,
    plan: SimulationPlan,
    export_logs: Option<Option<PathBuf>>,
    filter: LogFilterArgs,
) -> Result<()> {
    let ix = Intersection::start(config);
    let mut events = ix.subscribe();

    if let Some(secs) = plan.interval {
        ix.set_auto_interval(secs).await?;
    }
    if plan.auto {
        ix.toggle_auto_generate().await?;
    }
    for signal in &plan.requests {
        if let Err(e) = ix.request_signal_named(signal, false).await {
            println!("{} {}", "request failed:".red(), e);
        }
    }

    let deadline = tokio::time::sleep(plan.duration);
    tokio::pin!(deadline);
    let vip_at = tokio::time::sleep(plan.vip_after);
    tokio::pin!(vip_at);
    let mut vip = plan.vip;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut vip_at, if vip.is_some() => {
                if let Some(signal) = vip.take()
                    && let Err(e) = ix.request_signal_named(&signal, true).await
                {
                    println!("{} {}", "VIP request failed:".red(), e);
                }
            }
            received = events.recv() => match received {
                Ok(event) => {
                    print_event(&event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => debug!(n, "cmd_simulate: event feed lagged"),
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    let stats = ix.stats().await?;
    println!();
    println!("{}", "System stats".bold());
    println!("  total requests:   {}", stats.total_requests);
    println!("  VIP requests:     {}", stats.vip_requests);
    println!("  failed requests:  {}", stats.failed_requests);
    println!("  timeouts:         {}", stats.timeouts);
    println!("  requests/minute:  {}", stats.requests_per_minute);
    println!("  logical clock:    {}", stats.logical_clock);

    let logs = ix.logs(LogFilter::from(filter)).await?;
    if let Some(path) = export_logs {
        let path = path.unwrap_or_else(|| PathBuf::from(export::logs_file_name(Utc::now())));
        export::write_logs(&logs, &path).context(format!("Failed to export logs to {}", path.display()))?;
        println!("Exported {} log entries to {}", logs.len(), path.display());
    } else {
        println!();
        for entry in logs.iter().rev().take(20).rev() {
            println!(
                "[{}] [{}] [{}] {}",
                entry.timestamp.format("%H:%M:%S"),
                paint_level(entry.level),
                entry.component.cyan(),
                entry.message
            );
        }
    }

    ix.shutdown().await?;
    Ok(())
}

async fn cmd_request(config: &Config, signal: &str, vip: bool) -> Result<()> {
    let ix = Intersection::start(config);
    let mut events = ix.subscribe();

    let admission = ix.request_signal_named(signal, vip).await?;
    if let Some(preempted) = admission.preempted {
        println!("preempted {}", preempted);
    }

    let timing = if vip { config.coordinator.vip } else { config.coordinator.regular };
    let limit = timing.total() + Duration::from_secs(2);
    let follow = async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if print_event(&event) == Some(admission.signal) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };
    tokio::time::timeout(limit, follow)
        .await
        .context("Sequence did not complete in time")?;

    ix.shutdown().await?;
    Ok(())
}

async fn cmd_load_test(
    config: &Config,
    concurrency: u32,
    timeout_ms: u64,
    kind: RequestKind,
    export_path: Option<Option<PathBuf>>,
    format: OutputFormat,
) -> Result<()> {
    let ix = Intersection::start_with(config, intersect::chance::from_seed(config.seed), false);
    let report = ix
        .run_load_test(LoadTestConfig::new(concurrency, timeout_ms, kind))
        .await?;

    let export_path =
        export_path.map(|path| path.unwrap_or_else(|| PathBuf::from(export::report_file_name(report.finished_at))));
    if let Some(path) = &export_path {
        export::write_report_json(&report, path).context(format!("Failed to export report to {}", path.display()))?;
    }

    match format {
        OutputFormat::Json => println!("{}", export::report_json(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    if let Some(path) = export_path {
        eprintln!("Report written to {}", path.display());
    }

    ix.shutdown().await?;
    Ok(())
}

fn print_report(report: &TestReport) {
    for r in &report.results {
        let status = match r.status {
            RequestStatus::Success => r.status.to_string().green(),
            RequestStatus::Failure => r.status.to_string().red(),
            RequestStatus::Timeout => r.status.to_string().yellow(),
        };
        println!("Request #{}: {} ({}ms) - {}", r.request_id, status, r.latency_ms, r.server_id);
    }
    let s = &report.stats;
    println!();
    println!("Test completed in {:.2}s", s.duration_secs);
    println!("Success rate: {:.1}%", s.success_rate);
    println!("Failure rate: {:.1}%", s.failure_rate);
    println!("Timeout rate: {:.1}%", s.timeout_rate);
    println!("Average response time: {:.2}ms", s.average_latency_ms);
    println!("Requests per second: {:.2}", s.requests_per_second);
    println!("Load balancing effectiveness: {:.1}%", s.load_balancing_effectiveness);
    println!(
        "Load test completed: {}/{} successful requests",
        s.success_count, s.total_requests
    );
}

fn cmd_sync(server: Option<String>, clients: Vec<(String, String)>) -> Result<()> {
    let mut sync = ClockSync::new();
    if let Some(server) = &server {
        sync.set_server_time(server)?;
    }
    match sync.server_time() {
        Some(reading) => println!("Server time set to {}", format_clock_time(reading)),
        None => println!("Server time not set, using the local clock"),
    }
    for (id, time) in &clients {
        sync.register_client_time(id, time)?;
        println!("Registered time for {}: {}", id, time);
    }

    let agreed = sync.synchronize(chrono::Local::now().time());
    println!(
        "Berkeley synchronization completed. Synchronized time: {}",
        format_clock_time(agreed).green().bold()
    );
    Ok(())
}
