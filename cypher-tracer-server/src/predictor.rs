use crate::indicators::{
    MarketRegime, annualised_volatility, bollinger, log_returns, macd, market_regime, mean,
    momentum_features, rsi, support_resistance, tail,
};
use cypher_tracer::{Asset, Trend, WindowBuffer};
use fnv::FnvHashMap;
use tracing::{debug, warn};

/// Minimum clean samples before anything but a placeholder is produced.
pub const MIN_VALID_SAMPLES: usize = 10;
/// Minimum samples for a crypto analysis.
pub const MIN_SAMPLES: usize = 15;
/// Samples needed for the full indicator ensemble.
pub const ENSEMBLE_SAMPLES: usize = 30;

const MEMORY_CAPACITY: usize = 20;
const MEMORY_LOOKBACK: usize = 5;

const CONFIDENCE_FLOOR: f64 = 0.05;
const CONFIDENCE_CAP: f64 = 0.85;
const NEUTRAL_BELOW_CONFIDENCE: f64 = 0.25;
const TREND_SCORE_THRESHOLD: f64 = 0.2;

/// One trend call for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSignal {
    pub trend: Trend,
    pub explanation: Vec<String>,
    pub confidence: f64,
}

impl TrendSignal {
    fn neutral(reason: &str, confidence: f64) -> Self {
        Self {
            trend: Trend::Neutral,
            explanation: vec![reason.to_string()],
            confidence,
        }
    }
}

/// Per-asset state carried between calls.
#[derive(Debug, Clone)]
struct AssetMemory {
    /// Score bias of recent calls: +0.1 bullish, -0.1 bearish, 0 neutral.
    trends: WindowBuffer,
    confidences: WindowBuffer,
}

impl Default for AssetMemory {
    fn default() -> Self {
        Self {
            trends: WindowBuffer::new(MEMORY_CAPACITY),
            confidences: WindowBuffer::new(MEMORY_CAPACITY),
        }
    }
}

fn recent_mean(buffer: &WindowBuffer) -> Option<f64> {
    if buffer.is_empty() {
        return None;
    }
    let values = buffer.to_vec();
    Some(mean(tail(&values, MEMORY_LOOKBACK)))
}

/// Indicator ensemble with crypto specific confidence damping.
///
/// Stateful: every call feeds the asset's trend memory and confidence history, which
/// bias the following calls.
#[derive(Debug, Clone, Default)]
pub struct TrendPredictor {
    memory: FnvHashMap<Asset, AssetMemory>,
}

impl TrendPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predict the trend of `asset` from its price history (oldest first).
    pub fn predict(&mut self, asset: Asset, history: &[f64]) -> TrendSignal {
        let prices = history
            .iter()
            .copied()
            .filter(|price| price.is_finite() && *price > 0.0)
            .collect::<Vec<_>>();

        if prices.len() < MIN_VALID_SAMPLES {
            return TrendSignal::neutral("Insufficient valid data for prediction", 0.1);
        }
        if prices.len() < MIN_SAMPLES {
            return TrendSignal::neutral("Insufficient crypto data", 0.15);
        }

        let Ensemble {
            mut score,
            confidence,
            mut explanation,
        } = self.ensemble(asset, &prices);

        let memory = self.memory.entry(asset).or_default();
        if let Some(bias) = recent_mean(&memory.trends) {
            score += bias * 0.1;
        }

        let trend = if confidence < NEUTRAL_BELOW_CONFIDENCE {
            explanation.push("Low confidence in volatile crypto market".to_string());
            Trend::Neutral
        } else if score > TREND_SCORE_THRESHOLD {
            memory.trends.push(0.1);
            Trend::Bullish
        } else if score < -TREND_SCORE_THRESHOLD {
            memory.trends.push(-0.1);
            Trend::Bearish
        } else {
            memory.trends.push(0.0);
            Trend::Neutral
        };

        let level = if confidence > 0.6 {
            "High"
        } else if confidence > 0.3 {
            "Medium"
        } else {
            "Low"
        };
        explanation.push(format!("{level} confidence ({:.1}%)", confidence * 100.0));

        if prices.len() > 24 {
            let reference = prices[prices.len() - 24];
            let change = (prices[prices.len() - 1] - reference) / reference * 100.0;
            explanation.push(format!("24h change: {change:+.2}%"));
            if change.abs() > 15.0 {
                explanation.push("High volatility - typical crypto movement".to_string());
            }
        }

        debug!(%asset, %trend, score, confidence, "trend predicted");

        TrendSignal {
            trend,
            explanation,
            confidence,
        }
    }

    fn ensemble(&mut self, asset: Asset, prices: &[f64]) -> Ensemble {
        if prices.len() < ENSEMBLE_SAMPLES {
            return Ensemble {
                score: 0.0,
                confidence: 0.1,
                explanation: vec!["Insufficient data for crypto analysis".to_string()],
            };
        }

        let current = prices[prices.len() - 1];
        let rsi = rsi(prices);
        let macd = macd(prices);
        let bands = bollinger(prices);
        let (support, resistance) = support_resistance(prices);
        let regime = market_regime(prices);

        let mut score = 0.0;
        let mut explanation = Vec::new();

        if rsi > 75.0 {
            score -= 0.25;
            explanation.push(format!("RSI overbought ({rsi:.1})"));
        } else if rsi < 25.0 {
            score += 0.25;
            explanation.push(format!("RSI oversold ({rsi:.1})"));
        } else {
            score += (50.0 - rsi) / 200.0;
        }

        if macd.line > macd.signal && macd.histogram > 0.0 {
            score += 0.3;
            explanation.push("MACD bullish momentum".to_string());
        } else if macd.line < macd.signal && macd.histogram < 0.0 {
            score -= 0.3;
            explanation.push("MACD bearish momentum".to_string());
        }

        let position = bands.position(current);
        if position < 0.2 {
            score += 0.2;
            explanation.push("Near lower Bollinger Band".to_string());
        } else if position > 0.8 {
            score -= 0.2;
            explanation.push("Near upper Bollinger Band".to_string());
        }

        if (current - support) / current < 0.02 {
            score += 0.15;
            explanation.push("Near strong support level".to_string());
        } else if (resistance - current) / current < 0.02 {
            score -= 0.15;
            explanation.push("Near strong resistance level".to_string());
        }

        match regime {
            MarketRegime::Trending => {
                score += 0.1;
                explanation.push("Strong trending market".to_string());
            }
            MarketRegime::HighVolatility => {
                score -= 0.1;
                explanation.push("High volatility - cautious".to_string());
            }
            MarketRegime::Ranging | MarketRegime::Unknown => {}
        }

        let mut confidence = ((rsi - 50.0).abs() / 50.0 * 0.25).min(0.25)
            + (macd.histogram.abs() / current * 80.0 * 0.3).min(0.3)
            + (bands.width / 15.0 * 0.2).min(0.2);
        match regime {
            MarketRegime::Trending => confidence += 0.1,
            MarketRegime::HighVolatility => confidence -= 0.05,
            MarketRegime::Ranging | MarketRegime::Unknown => {}
        }

        let features = momentum_features(prices);
        let momentum = mean(&features[..4]);
        score += momentum * 0.3;
        confidence += (momentum.abs() * 0.15).min(0.15);

        let confidence = crypto_uncertainty(confidence, prices);
        let confidence = self.safeguard(asset, confidence, prices);

        Ensemble {
            score,
            confidence,
            explanation,
        }
    }

    /// Final clamp plus a penalty for large recent moves and sustained overconfidence.
    fn safeguard(&mut self, asset: Asset, confidence: f64, prices: &[f64]) -> f64 {
        let mut confidence = confidence.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CAP);

        if let [.., before, _, last] = prices {
            if ((last - before) / before).abs() > 0.1 {
                confidence *= 0.8;
            }
        }

        let memory = self.memory.entry(asset).or_default();
        memory.confidences.push(confidence);

        let history = memory.confidences.to_vec();
        let recent = tail(&history, MEMORY_LOOKBACK);
        if recent.len() >= 3 && mean(recent) > 0.7 {
            confidence *= 0.9;
        }

        confidence
    }
}

struct Ensemble {
    score: f64,
    confidence: f64,
    explanation: Vec<String>,
}

/// Damp confidence by volatility band, pump/dump moves and the 30 sample regime, then
/// clamp to the crypto range.
fn crypto_uncertainty(confidence: f64, prices: &[f64]) -> f64 {
    if prices.len() < 20 {
        return confidence * 0.3;
    }

    let volatility = annualised_volatility(tail(prices, 50));
    let mut confidence = if volatility > 1.2 {
        confidence * 0.5
    } else if volatility > 0.8 {
        confidence * 0.7
    } else if volatility > 0.4 {
        confidence * 0.85
    } else {
        confidence
    };

    confidence = damp_pump_dump(confidence, prices);
    confidence = adapt_to_regime(confidence, prices);
    confidence.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CAP)
}

/// Any 15% single step move within the last 10 samples.
fn damp_pump_dump(confidence: f64, prices: &[f64]) -> f64 {
    if prices.len() < 10 {
        return confidence;
    }

    let returns = log_returns(tail(prices, 10));
    let extreme = returns.iter().any(|ret| *ret > 0.15 || *ret < -0.15);
    if extreme {
        warn!("pump/dump pattern detected, confidence reduced");
        confidence * 0.4
    } else {
        confidence
    }
}

fn adapt_to_regime(confidence: f64, prices: &[f64]) -> f64 {
    if prices.len() < 30 {
        return confidence;
    }

    let window = tail(prices, 30);
    let total_return = (window[window.len() - 1] - window[0]) / window[0];
    let volatility = annualised_volatility(window);

    if total_return > 0.2 && volatility < 0.8 {
        (confidence * 1.1).min(0.8)
    } else if total_return < -0.2 {
        confidence * 0.7
    } else if total_return.abs() < 0.1 && volatility > 0.9 {
        confidence * 0.6
    } else {
        confidence
    }
}
