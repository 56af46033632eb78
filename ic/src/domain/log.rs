//! Structured log entries kept by the aggregator

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => f.write_str("INFO"),
            LogLevel::Warning => f.write_str("WARNING"),
            LogLevel::Error => f.write_str("ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(ControlError::InvalidConfig(format!("unknown log level '{other}'"))),
        }
    }
}

/// One append-only log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
}

impl LogEntry {
    /// Render as `[ISO timestamp] [LEVEL] [component] message`
    pub fn to_line(&self) -> String {
        format!(
            "[{}] [{}] [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.component,
            self.message
        )
    }
}

/// Narrow a log view by level, component, and free-text search
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub level: Option<LogLevel>,
    pub component: Option<String>,
    /// Case-insensitive substring matched against message and component
    pub search: Option<String>,
}

impl LogFilter {
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(level) = self.level
            && entry.level != level
        {
            return false;
        }
        if let Some(component) = &self.component
            && entry.component != *component
        {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            return entry.message.to_lowercase().contains(&needle) || entry.component.to_lowercase().contains(&needle);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(level: LogLevel, component: &str, message: &str) -> LogEntry {
        LogEntry {
            id: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            level,
            component: component.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("debug".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_to_line_format() {
        let line = entry(LogLevel::Warning, "VIP System", "T3 is now YELLOW").to_line();
        assert_eq!(line, "[2024-05-01T12:30:00.000Z] [WARNING] [VIP System] T3 is now YELLOW");
    }

    #[test]
    fn test_filter_by_level_and_component() {
        let e = entry(LogLevel::Error, "Signal Control", "Request failed for T1");
        assert!(LogFilter::default().matches(&e));

        let by_level = LogFilter {
            level: Some(LogLevel::Info),
            ..Default::default()
        };
        assert!(!by_level.matches(&e));

        let by_component = LogFilter {
            component: Some("Signal Control".to_string()),
            ..Default::default()
        };
        assert!(by_component.matches(&e));
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let e = entry(LogLevel::Info, "Time Sync", "Registered time for manual-vip");
        let filter = LogFilter {
            search: Some("MANUAL".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&e));

        let miss = LogFilter {
            search: Some("balancer".to_string()),
            ..Default::default()
        };
        assert!(!miss.matches(&e));
    }
}
