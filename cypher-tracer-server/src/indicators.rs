//! Technical indicators over a short price history (oldest first).
//!
//! These favour stability over textbook accuracy: the MACD is mean based and every
//! indicator degrades to a neutral value when the history is too short.

use itertools::{Itertools, MinMaxResult};

pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const SUPPORT_RESISTANCE_WINDOW: usize = 10;
pub const REGIME_WINDOW: usize = 20;
pub const FEATURE_COUNT: usize = 10;

/// Annualisation factor applied to per-sample return volatility.
const ANNUALISATION_DAYS: f64 = 365.0;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Last `count` values, or all of them when fewer are available.
pub fn tail(values: &[f64], count: usize) -> &[f64] {
    &values[values.len().saturating_sub(count)..]
}

pub fn diffs(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .tuple_windows()
        .map(|(previous, next)| next - previous)
        .collect()
}

pub fn log_returns(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .tuple_windows()
        .map(|(previous, next)| (next / previous).ln())
        .collect()
}

/// Annualised volatility of log returns.
pub fn annualised_volatility(values: &[f64]) -> f64 {
    std_dev(&log_returns(values)) * ANNUALISATION_DAYS.sqrt()
}

/// Relative strength index over the last [`RSI_PERIOD`] moves; 50 when undetermined.
pub fn rsi(prices: &[f64]) -> f64 {
    if prices.len() < RSI_PERIOD + 1 {
        return 50.0;
    }

    let deltas = diffs(prices);
    let recent = tail(&deltas, RSI_PERIOD);
    let avg_gain = recent.iter().map(|delta| delta.max(0.0)).sum::<f64>() / RSI_PERIOD as f64;
    let avg_loss = recent.iter().map(|delta| (-delta).max(0.0)).sum::<f64>() / RSI_PERIOD as f64;

    if avg_loss == 0.0 {
        return if avg_gain > 0.0 { 100.0 } else { 50.0 };
    }

    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Mean based MACD: 12 vs 26 sample means, signal is the 9 sample price mean.
pub fn macd(prices: &[f64]) -> Macd {
    if prices.len() < 26 {
        return Macd::default();
    }

    let line = mean(tail(prices, 12)) - mean(tail(prices, 26));
    let signal = mean(tail(prices, 9));

    Macd {
        line,
        signal,
        histogram: line - signal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bollinger {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// Band width as a percentage of the middle band.
    pub width: f64,
}

impl Bollinger {
    /// Position of `price` within the bands, 0.5 when the bands are collapsed.
    pub fn position(&self, price: f64) -> f64 {
        let span = self.upper - self.lower;
        if span > 0.0 {
            (price - self.lower) / span
        } else {
            0.5
        }
    }
}

/// Bollinger bands at two standard deviations over [`BOLLINGER_PERIOD`] samples.
pub fn bollinger(prices: &[f64]) -> Bollinger {
    if prices.len() < BOLLINGER_PERIOD {
        let last = prices.last().copied().unwrap_or_default();
        return Bollinger {
            upper: last,
            middle: last,
            lower: last,
            width: 0.0,
        };
    }

    let window = tail(prices, BOLLINGER_PERIOD);
    let middle = mean(window);
    let deviation = std_dev(window);
    let upper = middle + 2.0 * deviation;
    let lower = middle - 2.0 * deviation;
    let width = if middle != 0.0 {
        (upper - lower) / middle * 100.0
    } else {
        0.0
    };

    Bollinger {
        upper,
        middle,
        lower,
        width,
    }
}

/// `(support, resistance)` as the min and max of the last window; both equal the last
/// price until two windows of history exist.
pub fn support_resistance(prices: &[f64]) -> (f64, f64) {
    let last = prices.last().copied().unwrap_or_default();
    if prices.len() < SUPPORT_RESISTANCE_WINDOW * 2 {
        return (last, last);
    }

    match tail(prices, SUPPORT_RESISTANCE_WINDOW).iter().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::MinMax(min, max) => (*min, *max),
        MinMaxResult::OneElement(only) => (*only, *only),
        MinMaxResult::NoElements => (last, last),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketRegime {
    Unknown,
    HighVolatility,
    Trending,
    Ranging,
}

pub fn market_regime(prices: &[f64]) -> MarketRegime {
    if prices.len() < REGIME_WINDOW {
        return MarketRegime::Unknown;
    }

    let returns = log_returns(tail(prices, REGIME_WINDOW));
    let volatility = std_dev(&returns) * ANNUALISATION_DAYS.sqrt();
    let up = returns.iter().map(|ret| ret.max(0.0)).collect::<Vec<_>>();
    let down = returns.iter().map(|ret| (-ret).max(0.0)).collect::<Vec<_>>();
    let trend_strength = (mean(&up) - mean(&down)).abs();

    if volatility > 0.8 {
        MarketRegime::HighVolatility
    } else if trend_strength > 0.02 {
        MarketRegime::Trending
    } else {
        MarketRegime::Ranging
    }
}

/// Momentum features; all zero with fewer than 30 samples.
///
/// 0-1: 5 and 10 sample returns, 2-3: 10 and 20 sample coefficient of variation,
/// 4: distance from the 10 sample mean, 5: scaled RSI, 6-7: MACD line and histogram
/// relative to price, 8-9: 5 and 15 sample slope relative to price.
pub fn momentum_features(prices: &[f64]) -> [f64; FEATURE_COUNT] {
    let mut features = [0.0; FEATURE_COUNT];
    if prices.len() < 30 {
        return features;
    }

    let n = prices.len();
    let last = prices[n - 1];
    let back = |count: usize| prices[n - count];
    let relative = |value: f64| if last != 0.0 { value / last } else { 0.0 };

    let last_10 = tail(prices, 10);
    let last_20 = tail(prices, 20);
    let mean_10 = mean(last_10);
    let macd = macd(prices);

    features[0] = (last - back(5)) / back(5);
    features[1] = (last - back(10)) / back(10);
    features[2] = std_dev(last_10) / mean_10;
    features[3] = std_dev(last_20) / mean(last_20);
    features[4] = (last - mean_10) / mean_10;
    features[5] = (rsi(prices) - 50.0) / 50.0;
    features[6] = relative(macd.line);
    features[7] = relative(macd.histogram);
    features[8] = relative((last - back(5)) / 5.0);
    features[9] = relative((last - back(15)) / 15.0);
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn ramp(len: usize, start: f64, step: f64) -> Vec<f64> {
        (0..len).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn test_std_dev_is_population() {
        assert_close(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn test_rsi() {
        struct TestCase {
            prices: Vec<f64>,
            expected: f64,
        }

        let tests = vec![
            TestCase {
                // TC0: too short
                prices: ramp(14, 1.0, 1.0),
                expected: 50.0,
            },
            TestCase {
                // TC1: only gains
                prices: ramp(20, 1.0, 1.0),
                expected: 100.0,
            },
            TestCase {
                // TC2: flat
                prices: vec![3.0; 20],
                expected: 50.0,
            },
            TestCase {
                // TC3: only losses
                prices: ramp(20, 100.0, -1.0),
                expected: 0.0,
            },
            TestCase {
                // TC4: alternating +2 / -1 over the last 14 moves
                prices: (0..15)
                    .scan(10.0, |price, i| {
                        let current = *price;
                        *price += if i % 2 == 0 { 2.0 } else { -1.0 };
                        Some(current)
                    })
                    .collect(),
                expected: 100.0 - 100.0 / 3.0,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = rsi(&test.prices);
            assert!(
                (actual - test.expected).abs() < 1e-9,
                "TC{} failed: expected {}, got {}",
                index,
                test.expected,
                actual
            );
        }
    }

    #[test]
    fn test_macd_is_mean_based() {
        assert_eq!(macd(&ramp(25, 1.0, 1.0)), Macd::default());

        // 1..=30: mean(19..=30) = 24.5, mean(5..=30) = 17.5, mean(22..=30) = 26
        let result = macd(&ramp(30, 1.0, 1.0));
        assert_close(result.line, 7.0);
        assert_close(result.signal, 26.0);
        assert_close(result.histogram, -19.0);
    }

    #[test]
    fn test_bollinger() {
        let short = bollinger(&[1.0, 2.0]);
        assert_eq!(short.upper, 2.0);
        assert_eq!(short.width, 0.0);
        assert_eq!(short.position(2.0), 0.5);

        let flat = bollinger(&vec![10.0; 20]);
        assert_eq!(flat.width, 0.0);
        assert_eq!(flat.position(10.0), 0.5);

        let mut prices = vec![10.0; 10];
        prices.extend(vec![12.0; 10]);
        let bands = bollinger(&prices);
        assert_close(bands.middle, 11.0);
        assert_close(bands.upper, 13.0);
        assert_close(bands.lower, 9.0);
        assert_close(bands.width, 4.0 / 11.0 * 100.0);
        assert_close(bands.position(12.0), 0.75);
    }

    #[test]
    fn test_support_resistance() {
        assert_eq!(support_resistance(&ramp(19, 1.0, 1.0)), (19.0, 19.0));
        assert_eq!(support_resistance(&ramp(20, 1.0, 1.0)), (11.0, 20.0));
        assert_eq!(support_resistance(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_market_regime() {
        assert_eq!(market_regime(&ramp(19, 1.0, 1.0)), MarketRegime::Unknown);
        assert_eq!(market_regime(&vec![100.0; 20]), MarketRegime::Ranging);

        // Steady 5% growth: no dispersion, strong drift
        let growth = (0..20).map(|i| 100.0 * 1.05_f64.powi(i)).collect::<Vec<_>>();
        assert_eq!(market_regime(&growth), MarketRegime::Trending);

        // +/- 10% swings
        let swings = (0..20)
            .map(|i| if i % 2 == 0 { 100.0 } else { 110.0 })
            .collect::<Vec<_>>();
        assert_eq!(market_regime(&swings), MarketRegime::HighVolatility);
    }

    #[test]
    fn test_momentum_features() {
        assert_eq!(momentum_features(&ramp(29, 1.0, 1.0)), [0.0; FEATURE_COUNT]);

        let flat = momentum_features(&vec![50.0; 40]);
        assert_close(flat[0], 0.0);
        assert_close(flat[2], 0.0);
        assert_close(flat[5], 0.0);
        // Signal is a price mean, so the histogram sits at minus one price
        assert_close(flat[7], -1.0);

        let rising = momentum_features(&ramp(30, 1.0, 1.0));
        assert_close(rising[0], (30.0 - 26.0) / 26.0);
        assert_close(rising[1], (30.0 - 21.0) / 21.0);
        assert_close(rising[5], 1.0);
        assert_close(rising[8], (4.0 / 5.0) / 30.0);
        assert_close(rising[9], (14.0 / 15.0) / 30.0);
    }
}
