//! Throttle clock deciding whether a tick is "new enough" for a series.
//!
//! The ledger keeps the time of the last *accepted* sample per (asset, timeframe). The
//! admission interval is a floor on the spacing between samples, not a fixed phase: the
//! next admission is measured from the actual acceptance time, so the cadence drifts
//! with tick arrival and is never aligned to calendar buckets.

use crate::{asset::Asset, timeframe::Timeframe};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;

/// Composite key identifying one bounded series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub asset: Asset,
    pub timeframe: Timeframe,
}

impl SeriesKey {
    pub fn new(asset: Asset, timeframe: Timeframe) -> Self {
        Self { asset, timeframe }
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.asset, self.timeframe)
    }
}

/// Per-series ledger of last admission times.
#[derive(Debug, Clone, Default)]
pub struct ThrottleClock {
    ledger: FnvHashMap<SeriesKey, DateTime<Utc>>,
}

impl ThrottleClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a tick observed at `now` may be recorded for the series.
    ///
    /// A series that never admitted anything always admits. A `now` earlier than the
    /// last admission yields a negative elapsed time and is rejected.
    pub fn should_admit(&self, asset: Asset, timeframe: Timeframe, now: DateTime<Utc>) -> bool {
        match self.ledger.get(&SeriesKey::new(asset, timeframe)) {
            Some(last) => now - *last >= timeframe.interval(),
            None => true,
        }
    }

    /// Record an admission at `now`. Only ever called after a positive verdict.
    pub fn record_admission(&mut self, asset: Asset, timeframe: Timeframe, now: DateTime<Utc>) {
        self.ledger.insert(SeriesKey::new(asset, timeframe), now);
    }

    /// Time of the last accepted sample, `None` while the series has never admitted.
    pub fn last_admitted(&self, asset: Asset, timeframe: Timeframe) -> Option<DateTime<Utc>> {
        self.ledger.get(&SeriesKey::new(asset, timeframe)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn test_first_tick_always_admitted() {
        let clock = ThrottleClock::new();
        for timeframe in Timeframe::ALL {
            assert!(clock.should_admit(Asset::Btc, timeframe, at(0)));
            assert_eq!(clock.last_admitted(Asset::Btc, timeframe), None);
        }
    }

    #[test]
    fn test_should_admit_after_interval() {
        struct TestCase {
            last: i64,
            now: i64,
            expected: bool,
        }

        // 2s timeframe => 1000ms floor
        let tests = vec![
            TestCase {
                // TC0: too soon
                last: 0,
                now: 500,
                expected: false,
            },
            TestCase {
                // TC1: exactly one interval later
                last: 0,
                now: 1_000,
                expected: true,
            },
            TestCase {
                // TC2: after a long gap
                last: 0,
                now: 90_000,
                expected: true,
            },
            TestCase {
                // TC3: clock went backwards
                last: 5_000,
                now: 4_000,
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let mut clock = ThrottleClock::new();
            clock.record_admission(Asset::Dot, Timeframe::TwoSeconds, at(test.last));
            let actual = clock.should_admit(Asset::Dot, Timeframe::TwoSeconds, at(test.now));
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_admission_measured_from_last_accepted_not_grid() {
        let mut clock = ThrottleClock::new();
        clock.record_admission(Asset::Eth, Timeframe::TwoSeconds, at(0));

        // Accepted late at 1700ms: the next floor is 2700ms, not 2000ms
        assert!(clock.should_admit(Asset::Eth, Timeframe::TwoSeconds, at(1_700)));
        clock.record_admission(Asset::Eth, Timeframe::TwoSeconds, at(1_700));

        assert!(!clock.should_admit(Asset::Eth, Timeframe::TwoSeconds, at(2_000)));
        assert!(clock.should_admit(Asset::Eth, Timeframe::TwoSeconds, at(2_700)));
    }

    #[test]
    fn test_ledger_entries_are_independent() {
        let mut clock = ThrottleClock::new();
        clock.record_admission(Asset::Btc, Timeframe::TwoSeconds, at(0));

        assert!(clock.should_admit(Asset::Btc, Timeframe::OneHour, at(10)));
        assert!(clock.should_admit(Asset::Eth, Timeframe::TwoSeconds, at(10)));
        assert!(!clock.should_admit(Asset::Btc, Timeframe::TwoSeconds, at(10)));
    }
}
