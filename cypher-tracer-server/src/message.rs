use chrono::{DateTime, Utc};
use cypher_tracer::{Asset, Trend, prediction::EXPLANATION_SEPARATOR};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outbound frame broadcast to every connected client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeedEvent {
    Prices(PriceSnapshot),
    Prediction(PredictionMessage),
}

/// One polling round: every tracked asset, `null` when the round failed.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct PriceSnapshot(BTreeMap<Asset, Option<f64>>);

impl PriceSnapshot {
    pub fn new(prices: impl IntoIterator<Item = (Asset, f64)>) -> Self {
        let mut snapshot = Self::unavailable();
        for (asset, price) in prices {
            snapshot.0.insert(asset, Some(price));
        }
        snapshot
    }

    /// Snapshot of a failed round.
    pub fn unavailable() -> Self {
        Self(Asset::ALL.into_iter().map(|asset| (asset, None)).collect())
    }

    pub fn price(&self, asset: Asset) -> Option<f64> {
        self.0.get(&asset).copied().flatten()
    }

    pub fn prices(&self) -> impl Iterator<Item = (Asset, f64)> + '_ {
        self.0
            .iter()
            .filter_map(|(asset, price)| price.map(|price| (*asset, price)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionMessage {
    pub coin: Asset,
    pub trend: Trend,
    pub explanation: String,
    pub confidence: f64,
    pub timestamp: String,
}

impl PredictionMessage {
    /// Confidence is clamped to `[0, 1]`, the timestamp is naive ISO-8601 in UTC.
    pub fn new(
        coin: Asset,
        trend: Trend,
        explanation: &[String],
        confidence: f64,
        time: DateTime<Utc>,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            coin,
            trend,
            explanation: explanation.join(EXPLANATION_SEPARATOR),
            confidence,
            timestamp: time.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        }
    }
}
