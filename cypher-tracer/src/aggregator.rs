//! Multi-timeframe tick aggregator.
//!
//! Every tick is fanned out over the whole closed timeframe set, regardless of which
//! series is on screen. Raw ticks are not retained past their effect on the windows, so
//! this continuous maintenance is what lets a selection switch expose its full history
//! instantly.

use crate::{
    asset::Asset,
    feed::TickMessage,
    throttle::{SeriesKey, ThrottleClock},
    timeframe::Timeframe,
    window::WindowStore,
};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use tracing::trace;

/// The (asset, timeframe) pair currently on display.
pub type Selection = SeriesKey;

/// Direction of the live price relative to the previous chart sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceDirection {
    Up,
    Down,
}

/// Owns the throttle ledger and the windows of one dashboard session.
#[derive(Debug, Clone)]
pub struct Aggregator {
    throttle: ThrottleClock,
    windows: WindowStore,
    selection: Selection,
    current_series: Vec<f64>,
    latest_prices: FnvHashMap<Asset, f64>,
}

impl Aggregator {
    pub fn new(selection: Selection) -> Self {
        Self::with_store(selection, WindowStore::new())
    }

    pub fn with_store(selection: Selection, windows: WindowStore) -> Self {
        Self {
            throttle: ThrottleClock::new(),
            windows,
            selection,
            current_series: Vec::new(),
            latest_prices: FnvHashMap::default(),
        }
    }

    /// Process one tick map observed at `now`.
    ///
    /// Returns the number of (asset, timeframe) samples admitted.
    pub fn on_tick(&mut self, ticks: &TickMessage, now: DateTime<Utc>) -> usize {
        let admitted = ticks
            .prices()
            .iter()
            .map(|(asset, price)| self.on_price(*asset, *price, now))
            .sum();

        self.refresh_current_series();
        admitted
    }

    /// Offer a single price to every timeframe of `asset`.
    fn on_price(&mut self, asset: Asset, price: f64, now: DateTime<Utc>) -> usize {
        if !price.is_finite() {
            return 0;
        }

        self.latest_prices.insert(asset, price);

        let mut admitted = 0;
        for timeframe in Timeframe::ALL {
            if self.throttle.should_admit(asset, timeframe, now) {
                self.windows.append(asset, timeframe, price);
                self.throttle.record_admission(asset, timeframe, now);
                admitted += 1;
                trace!(%asset, %timeframe, price, "sample admitted");
            }
        }
        admitted
    }

    /// Switch the visible series. Pure read of the existing windows: no replay.
    pub fn on_selection_change(&mut self, asset: Asset, timeframe: Timeframe) {
        self.selection = Selection::new(asset, timeframe);
        self.refresh_current_series();
    }

    pub fn select_asset(&mut self, asset: Asset) {
        self.on_selection_change(asset, self.selection.timeframe);
    }

    pub fn select_timeframe(&mut self, timeframe: Timeframe) {
        self.on_selection_change(self.selection.asset, timeframe);
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Snapshot of the selected series, as of the last tick or selection change.
    pub fn current_series(&self) -> &[f64] {
        &self.current_series
    }

    /// Detached copy of any series.
    pub fn series(&self, asset: Asset, timeframe: Timeframe) -> Vec<f64> {
        self.windows.snapshot(asset, timeframe)
    }

    /// Last price seen on the feed for `asset`, admitted or not.
    pub fn latest_price(&self, asset: Asset) -> Option<f64> {
        self.latest_prices.get(&asset).copied()
    }

    /// Live price of the selected asset against the second-to-last chart sample.
    pub fn price_direction(&self) -> Option<PriceDirection> {
        let live = self.latest_price(self.selection.asset)?;
        let previous = self
            .current_series
            .len()
            .checked_sub(2)
            .map(|index| self.current_series[index])?;

        if live > previous {
            Some(PriceDirection::Up)
        } else {
            Some(PriceDirection::Down)
        }
    }

    fn refresh_current_series(&mut self) {
        self.current_series = self
            .windows
            .snapshot(self.selection.asset, self.selection.timeframe);
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(Selection::new(Asset::Dot, Timeframe::TwoSeconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WINDOW_CAPACITY;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    fn tick(asset: Asset, price: f64) -> TickMessage {
        TickMessage::new([(asset, price)])
    }

    #[test]
    fn test_two_second_throttle_scenario() {
        let mut aggregator = Aggregator::default();

        aggregator.on_tick(&tick(Asset::Dot, 5.0), at(0));
        aggregator.on_tick(&tick(Asset::Dot, 6.0), at(500));
        aggregator.on_tick(&tick(Asset::Dot, 7.0), at(1_200));

        assert_eq!(aggregator.current_series(), &[5.0, 7.0]);
        assert_eq!(aggregator.latest_price(Asset::Dot), Some(7.0));
    }

    #[test]
    fn test_fan_out_counts_admissions() {
        let mut aggregator = Aggregator::default();

        // First tick admitted on every timeframe for both assets
        let ticks = TickMessage::new([(Asset::Btc, 100.0), (Asset::Eth, 10.0)]);
        assert_eq!(aggregator.on_tick(&ticks, at(0)), 8);

        // 1.5s later only the 2s series are due
        assert_eq!(aggregator.on_tick(&ticks, at(1_500)), 2);

        // 61s later 2s and 1m are due
        assert_eq!(aggregator.on_tick(&ticks, at(61_500)), 4);
    }

    #[test]
    fn test_timeframes_are_independent() {
        let mut aggregator = Aggregator::default();

        for (ms, price) in [(0, 1.0), (1_000, 2.0), (2_000, 3.0), (60_000, 4.0)] {
            aggregator.on_tick(&tick(Asset::Btc, price), at(ms));
        }

        assert_eq!(
            aggregator.series(Asset::Btc, Timeframe::TwoSeconds),
            vec![1.0, 2.0, 3.0, 4.0]
        );
        assert_eq!(aggregator.series(Asset::Btc, Timeframe::OneMinute), vec![1.0, 4.0]);
        assert_eq!(aggregator.series(Asset::Btc, Timeframe::FifteenMinutes), vec![1.0]);
        assert_eq!(aggregator.series(Asset::Btc, Timeframe::OneHour), vec![1.0]);
    }

    #[test]
    fn test_absent_asset_does_not_touch_its_ledger() {
        let mut aggregator = Aggregator::default();
        aggregator.on_tick(&tick(Asset::Btc, 1.0), at(0));

        // ETH never ticked: its first sample is admitted whenever it comes
        aggregator.on_tick(&tick(Asset::Eth, 2.0), at(10));
        assert_eq!(aggregator.series(Asset::Eth, Timeframe::OneHour), vec![2.0]);
        assert!(aggregator.series(Asset::Ena, Timeframe::TwoSeconds).is_empty());
    }

    #[test]
    fn test_selection_switch_is_pure_read() {
        let mut aggregator = Aggregator::new(Selection::new(Asset::Eth, Timeframe::TwoSeconds));
        for i in 0..10 {
            aggregator.on_tick(&tick(Asset::Eth, i as f64), at(i * 1_000));
        }
        let before = aggregator.current_series().to_vec();

        aggregator.select_timeframe(Timeframe::OneHour);
        assert_eq!(aggregator.current_series(), &[0.0]);

        aggregator.select_timeframe(Timeframe::TwoSeconds);
        assert_eq!(aggregator.current_series(), before.as_slice());
        assert_eq!(before.len(), 10);
    }

    #[test]
    fn test_selection_switch_exposes_history_instantly() {
        let mut aggregator = Aggregator::new(Selection::new(Asset::Btc, Timeframe::TwoSeconds));
        aggregator.on_tick(&tick(Asset::Ena, 0.5), at(0));
        aggregator.on_tick(&tick(Asset::Ena, 0.6), at(2_000));

        assert!(aggregator.current_series().is_empty());
        aggregator.select_asset(Asset::Ena);
        assert_eq!(aggregator.current_series(), &[0.5, 0.6]);
        assert_eq!(
            aggregator.selection(),
            Selection::new(Asset::Ena, Timeframe::TwoSeconds)
        );
    }

    #[test]
    fn test_cap_holds_over_long_run() {
        let mut aggregator = Aggregator::default();
        for i in 0..200 {
            aggregator.on_tick(&tick(Asset::Dot, i as f64), at(i * 1_000));
            assert!(aggregator.current_series().len() <= WINDOW_CAPACITY);
        }

        let expected: Vec<f64> = (140..200).map(|i| i as f64).collect();
        assert_eq!(aggregator.current_series(), expected.as_slice());
    }

    #[test]
    fn test_late_tick_after_gap_is_admitted() {
        let mut aggregator = Aggregator::default();
        aggregator.on_tick(&tick(Asset::Dot, 1.0), at(0));
        // Feed paused for ten minutes
        aggregator.on_tick(&tick(Asset::Dot, 2.0), at(600_000));

        assert_eq!(aggregator.series(Asset::Dot, Timeframe::OneMinute), vec![1.0, 2.0]);
        assert_eq!(aggregator.series(Asset::Dot, Timeframe::FifteenMinutes), vec![1.0]);
    }

    #[test]
    fn test_price_direction() {
        let mut aggregator = Aggregator::default();
        assert_eq!(aggregator.price_direction(), None);

        aggregator.on_tick(&tick(Asset::Dot, 5.0), at(0));
        assert_eq!(aggregator.price_direction(), None);

        aggregator.on_tick(&tick(Asset::Dot, 6.0), at(1_000));
        assert_eq!(aggregator.price_direction(), Some(PriceDirection::Up));

        // Rejected by the throttle but still the live price
        aggregator.on_tick(&tick(Asset::Dot, 4.0), at(1_100));
        assert_eq!(aggregator.current_series(), &[5.0, 6.0]);
        assert_eq!(aggregator.price_direction(), Some(PriceDirection::Down));
    }
}
