//! Bounded per-series price windows.

use crate::{asset::Asset, throttle::SeriesKey, timeframe::Timeframe};
use fnv::FnvHashMap;
use std::collections::VecDeque;

/// Maximum number of samples retained per series.
pub const WINDOW_CAPACITY: usize = 60;

/// Rolling FIFO window of prices, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowBuffer {
    /// Maximum number of prices to keep
    capacity: usize,
    prices: VecDeque<f64>,
}

impl WindowBuffer {
    /// Create a new window with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            prices: VecDeque::with_capacity(capacity),
        }
    }

    /// Append at the tail, evicting the oldest price once over capacity.
    pub fn push(&mut self, price: f64) {
        self.prices.push_back(price);
        if self.prices.len() > self.capacity {
            self.prices.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent price.
    pub fn last(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    /// Owned copy of the window in chronological order.
    pub fn to_vec(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.prices.iter()
    }
}

impl Default for WindowBuffer {
    fn default() -> Self {
        Self::new(WINDOW_CAPACITY)
    }
}

/// One [`WindowBuffer`] per (asset, timeframe), created lazily on first append.
#[derive(Debug, Clone)]
pub struct WindowStore {
    capacity: usize,
    buffers: FnvHashMap<SeriesKey, WindowBuffer>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            buffers: FnvHashMap::default(),
        }
    }

    /// Unconditionally append `price` to the series. Admission is decided by the caller.
    pub fn append(&mut self, asset: Asset, timeframe: Timeframe, price: f64) {
        let capacity = self.capacity;
        self.buffers
            .entry(SeriesKey::new(asset, timeframe))
            .or_insert_with(|| WindowBuffer::new(capacity))
            .push(price);
    }

    /// Detached copy of the series. Empty for a series that never received a sample.
    pub fn snapshot(&self, asset: Asset, timeframe: Timeframe) -> Vec<f64> {
        self.buffers
            .get(&SeriesKey::new(asset, timeframe))
            .map(WindowBuffer::to_vec)
            .unwrap_or_default()
    }

    pub fn len(&self, asset: Asset, timeframe: Timeframe) -> usize {
        self.buffers
            .get(&SeriesKey::new(asset, timeframe))
            .map_or(0, WindowBuffer::len)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for WindowStore {
    fn default() -> Self {
        Self::new()
    }
}
