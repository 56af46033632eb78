//! File exports: load test reports as JSON, log views as text

use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::LogEntry;
use crate::error::ControlResult;
use crate::harness::{LoadTestConfig, RequestOutcome, TestReport, TestStats};

/// On-disk layout of an exported report
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportExport<'a> {
    test_config: &'a LoadTestConfig,
    test_stats: &'a TestStats,
    results: &'a [RequestOutcome],
    timestamp: String,
}

/// Pretty JSON `{ testConfig, testStats, results, timestamp }`
pub fn report_json(report: &TestReport) -> ControlResult<String> {
    let export = ReportExport {
        test_config: &report.config,
        test_stats: &report.stats,
        results: &report.results,
        timestamp: report.finished_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Write a report, creating parent directories as needed
pub fn write_report_json(report: &TestReport, path: &Path) -> ControlResult<()> {
    debug!(?path, run_id = %report.run_id, "write_report_json: called");
    ensure_parent(path)?;
    fs::write(path, report_json(report)?)?;
    info!(?path, "Exported load test report");
    Ok(())
}

/// Conventional file name for a report finished at `at`
pub fn report_file_name(at: DateTime<Utc>) -> String {
    format!("load_test_results_{}.json", at.timestamp_millis())
}

/// One `[ISO timestamp] [LEVEL] [component] message` line per entry
pub fn render_logs(entries: &[LogEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_line());
        out.push('\n');
    }
    out
}

pub fn write_logs(entries: &[LogEntry], path: &Path) -> ControlResult<()> {
    debug!(?path, count = entries.len(), "write_logs: called");
    ensure_parent(path)?;
    fs::write(path, render_logs(entries))?;
    Ok(())
}

/// Conventional file name for a log export taken at `at`
pub fn logs_file_name(at: DateTime<Utc>) -> String {
    format!("system_logs_{}.txt", at.timestamp_millis())
}

fn ensure_parent(path: &Path) -> ControlResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogLevel;
    use crate::harness::{RequestKind, RequestStatus, summarize};
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::TempDir;

    fn report() -> TestReport {
        let results = vec![RequestOutcome {
            request_id: 1,
            kind: RequestKind::SignalStatus,
            status: RequestStatus::Success,
            latency_ms: 87,
            server_id: "primary".to_string(),
        }];
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        TestReport {
            run_id: "run".to_string(),
            config: LoadTestConfig::default(),
            stats: summarize(&results, Duration::from_millis(100)),
            results,
            started_at: at,
            finished_at: at,
        }
    }

    #[test]
    fn test_report_layout() {
        let value: serde_json::Value = serde_json::from_str(&report_json(&report()).unwrap()).unwrap();
        assert_eq!(value["testConfig"]["concurrency"], 15);
        assert_eq!(value["testStats"]["successCount"], 1);
        assert_eq!(value["results"][0]["serverId"], "primary");
        assert_eq!(value["results"][0]["status"], "success");
        assert_eq!(value["timestamp"], "2024-05-01T08:00:00.000Z");
    }

    #[test]
    fn test_write_report_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(report_file_name(Utc::now()));
        write_report_json(&report(), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"testStats\""));
    }

    #[test]
    fn test_render_and_write_logs() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let entries = vec![
            LogEntry {
                id: 1,
                timestamp: at,
                level: LogLevel::Info,
                component: "Signal Control".to_string(),
                message: "T1 is now GREEN".to_string(),
            },
            LogEntry {
                id: 2,
                timestamp: at,
                level: LogLevel::Error,
                component: "Signal Control".to_string(),
                message: "Request failed for T2".to_string(),
            },
        ];
        let text = render_logs(&entries);
        assert_eq!(
            text,
            "[2024-05-01T08:00:00.000Z] [INFO] [Signal Control] T1 is now GREEN\n\
             [2024-05-01T08:00:00.000Z] [ERROR] [Signal Control] Request failed for T2\n"
        );

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.txt");
        write_logs(&entries, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), text);
        assert_eq!(render_logs(&[]), "");
    }
}
