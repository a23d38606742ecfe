use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::engine::errors::MonitorError;

/// Relative range over the metric history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    LastMinute,
    LastHour,
    LastDay,
    AllTime,
}

impl TimeWindow {
    pub fn span(self) -> Option<TimeDelta> {
        match self {
            TimeWindow::LastMinute => Some(TimeDelta::minutes(1)),
            TimeWindow::LastHour => Some(TimeDelta::hours(1)),
            TimeWindow::LastDay => Some(TimeDelta::days(1)),
            TimeWindow::AllTime => None,
        }
    }

    /// Earliest timestamp inside the window, `None` for `AllTime`.
    pub fn start(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.span().map(|span| {
            now.checked_sub_signed(span)
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::LastMinute => "last_minute",
            TimeWindow::LastHour => "last_hour",
            TimeWindow::LastDay => "last_day",
            TimeWindow::AllTime => "all_time",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last_minute" => Ok(TimeWindow::LastMinute),
            "last_hour" => Ok(TimeWindow::LastHour),
            "last_day" => Ok(TimeWindow::LastDay),
            "all_time" => Ok(TimeWindow::AllTime),
            other => Err(MonitorError::UnknownWindow(other.to_string())),
        }
    }
}
