use crate::error::FeedError;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Admission interval used for any timeframe label without an explicit mapping.
pub const DEFAULT_INTERVAL_MS: i64 = 2_000;

/// Named sampling granularity of a chart series.
///
/// Each timeframe maps to the minimum spacing between two accepted samples, not to a
/// calendar bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Timeframe {
    #[serde(rename = "2s")]
    TwoSeconds,
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl Timeframe {
    /// Every timeframe, finest first. Each tick is fanned out over this set.
    pub const ALL: [Timeframe; 4] = [
        Timeframe::TwoSeconds,
        Timeframe::OneMinute,
        Timeframe::FifteenMinutes,
        Timeframe::OneHour,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::TwoSeconds => "2s",
            Timeframe::OneMinute => "1m",
            Timeframe::FifteenMinutes => "15m",
            Timeframe::OneHour => "1h",
        }
    }

    /// Minimum admission interval in milliseconds.
    pub fn interval_ms(&self) -> i64 {
        match self {
            Timeframe::TwoSeconds => 1_000,
            Timeframe::OneMinute => 60_000,
            Timeframe::FifteenMinutes => 15 * 60_000,
            Timeframe::OneHour => 60 * 60_000,
        }
    }

    /// Minimum admission interval.
    pub fn interval(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.interval_ms())
    }

    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|timeframe| timeframe == self)
            .unwrap_or_default()
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Resolve the admission interval for any timeframe label.
///
/// Unmapped labels fall back to [`DEFAULT_INTERVAL_MS`].
pub fn admission_interval(label: &str) -> TimeDelta {
    label
        .parse::<Timeframe>()
        .map(|timeframe| timeframe.interval())
        .unwrap_or_else(|_| TimeDelta::milliseconds(DEFAULT_INTERVAL_MS))
}

impl FromStr for Timeframe {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2s" => Ok(Timeframe::TwoSeconds),
            "1m" => Ok(Timeframe::OneMinute),
            "15m" => Ok(Timeframe::FifteenMinutes),
            "1h" => Ok(Timeframe::OneHour),
            _ => Err(FeedError::UnknownTimeframe(s.to_string())),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
