//! Client clock registration and Berkeley averaging
//!
//! Clients report a wall-clock reading as `HH:MM:SS`. Synchronizing averages
//! the server reading with every registered client reading (seconds since
//! midnight, floored) and publishes the result as the agreed time.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{NaiveTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ControlError, ControlResult};

/// Log component for clock activity
pub const TIME_SYNC: &str = "Time Sync";

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9])$").expect("time pattern should compile")
});

/// Parse a strict 24-hour `HH:MM:SS` reading
pub fn parse_clock_time(input: &str) -> ControlResult<NaiveTime> {
    let invalid = || ControlError::InvalidTimeFormat(input.to_string());
    let caps = TIME_PATTERN.captures(input).ok_or_else(invalid)?;
    let field = |i: usize| caps[i].parse::<u32>().map_err(|_| invalid());
    NaiveTime::from_hms_opt(field(1)?, field(2)?, field(3)?).ok_or_else(invalid)
}

/// Render a reading the way clients submit it
pub fn format_clock_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

/// Floored mean of `times` as seconds since midnight
pub fn berkeley_average(times: &[NaiveTime]) -> Option<NaiveTime> {
    if times.is_empty() {
        return None;
    }
    let total: u64 = times.iter().map(|t| u64::from(t.num_seconds_from_midnight())).sum();
    let avg = (total / times.len() as u64) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(avg, 0)
}

/// Registered readings and the last agreed time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClockSync {
    server_time: Option<NaiveTime>,
    clients: BTreeMap<String, NaiveTime>,
    synchronized: Option<NaiveTime>,
}

impl ClockSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a client's reading; invalid input leaves every reading untouched
    pub fn register_client_time(&mut self, client_id: &str, input: &str) -> ControlResult<NaiveTime> {
        debug!(%client_id, %input, "ClockSync::register_client_time: called");
        let time = parse_clock_time(input)?;
        self.clients.insert(client_id.to_string(), time);
        Ok(time)
    }

    pub fn set_server_time(&mut self, input: &str) -> ControlResult<NaiveTime> {
        debug!(%input, "ClockSync::set_server_time: called");
        let time = parse_clock_time(input)?;
        self.server_time = Some(time);
        Ok(time)
    }

    pub fn server_time(&self) -> Option<NaiveTime> {
        self.server_time
    }

    pub fn client_times(&self) -> &BTreeMap<String, NaiveTime> {
        &self.clients
    }

    pub fn synchronized_time(&self) -> Option<NaiveTime> {
        self.synchronized
    }

    /// Average the server reading with every client reading
    ///
    /// `now` stands in for the server reading when none was set.
    pub fn synchronize(&mut self, now: NaiveTime) -> NaiveTime {
        let server = self.server_time.unwrap_or(now);
        let mut readings = vec![server];
        readings.extend(self.clients.values().copied());
        let agreed = berkeley_average(&readings).unwrap_or(server);
        debug!(readings = readings.len(), agreed = %agreed, "ClockSync::synchronize: averaged");
        self.synchronized = Some(agreed);
        agreed
    }
}
