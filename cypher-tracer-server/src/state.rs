use crate::{
    message::{PredictionMessage, PriceSnapshot},
    predictor::{MIN_SAMPLES, TrendPredictor},
};
use chrono::{DateTime, Utc};
use cypher_tracer::{Asset, WINDOW_CAPACITY, WindowBuffer};
use fnv::FnvHashMap;

/// Server side price history and trend predictor.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    history: FnvHashMap<Asset, WindowBuffer>,
    predictor: TrendPredictor,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every available price of a polling round to its asset history.
    pub fn record(&mut self, snapshot: &PriceSnapshot) {
        for (asset, price) in snapshot.prices() {
            self.history
                .entry(asset)
                .or_insert_with(|| WindowBuffer::new(WINDOW_CAPACITY))
                .push(price);
        }
    }

    pub fn history(&self, asset: Asset) -> Vec<f64> {
        self.history
            .get(&asset)
            .map(WindowBuffer::to_vec)
            .unwrap_or_default()
    }

    /// Trend predictions for every asset with enough history.
    pub fn predictions(&mut self, time: DateTime<Utc>) -> Vec<PredictionMessage> {
        let mut messages = Vec::new();

        for asset in Asset::ALL {
            let history = self.history(asset);
            if history.len() < MIN_SAMPLES {
                continue;
            }

            let signal = self.predictor.predict(asset, &history);
            messages.push(PredictionMessage::new(
                asset,
                signal.trend,
                &signal.explanation,
                signal.confidence,
                time,
            ));
        }

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cypher_tracer::Trend;

    #[test]
    fn test_record_skips_unavailable_prices() {
        let mut state = FeedState::new();
        state.record(&PriceSnapshot::new([(Asset::Btc, 1.0), (Asset::Eth, 2.0)]));
        state.record(&PriceSnapshot::unavailable());
        state.record(&PriceSnapshot::new([(Asset::Btc, 3.0)]));

        assert_eq!(state.history(Asset::Btc), vec![1.0, 3.0]);
        assert_eq!(state.history(Asset::Eth), vec![2.0]);
        assert!(state.history(Asset::Dot).is_empty());
    }

    #[test]
    fn test_history_is_capped() {
        let mut state = FeedState::new();
        for i in 0..100 {
            state.record(&PriceSnapshot::new([(Asset::Dot, i as f64)]));
        }

        let history = state.history(Asset::Dot);
        assert_eq!(history.len(), WINDOW_CAPACITY);
        assert_eq!(history.first().copied(), Some(40.0));
    }

    #[test]
    fn test_predictions_need_fifteen_samples() {
        let mut state = FeedState::new();
        for i in 0..MIN_SAMPLES {
            let ena = [(Asset::Ena, 0.5)];
            let both = [(Asset::Ena, 0.5), (Asset::Btc, 60_000.0 + i as f64)];
            if i == 0 {
                state.record(&PriceSnapshot::new(ena));
            } else {
                state.record(&PriceSnapshot::new(both));
            }
        }

        let time = Utc::now();
        let messages = state.predictions(time);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].coin, Asset::Ena);
        assert_eq!(messages[0].trend, Trend::Neutral);
        assert!((0.0..=1.0).contains(&messages[0].confidence));
    }
}
