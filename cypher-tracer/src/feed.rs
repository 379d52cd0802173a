//! Inbound feed frame classification.
//!
//! The server multiplexes two logical channels onto one socket: price tick maps
//! (`{"BTC": 64000.1, "ETH": null}`) and trend predictions (`{"coin": "BTC", ...}`).

use crate::{asset::Asset, error::FeedError, prediction::RawPrediction};
use serde_json::{Map, Value};
use tracing::debug;

/// A decoded frame from the feed socket.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Server greeting sent once per connection.
    Welcome,
    Ticks(TickMessage),
    Prediction(RawPrediction),
}

/// Prices carried by one tick map, for the subset of tracked assets that updated.
///
/// Assets that are absent, explicitly null, non-numeric or non-finite carry no sample
/// and are left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickMessage {
    prices: Vec<(Asset, f64)>,
}

impl TickMessage {
    pub fn new(prices: impl IntoIterator<Item = (Asset, f64)>) -> Self {
        Self {
            prices: prices
                .into_iter()
                .filter(|(_, price)| price.is_finite())
                .collect(),
        }
    }

    /// Extract the tracked asset prices from a tick map object.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let prices = object.iter().filter_map(|(key, value)| {
            let Some(asset) = Asset::from_symbol(key) else {
                debug!(%key, "ignoring untracked asset in tick map");
                return None;
            };

            match value {
                Value::Number(number) => number.as_f64().map(|price| (asset, price)),
                Value::Null => None,
                other => {
                    debug!(%asset, value = %other, "ignoring non-numeric price");
                    None
                }
            }
        });

        Self::new(prices)
    }

    pub fn prices(&self) -> &[(Asset, f64)] {
        &self.prices
    }

    pub fn price(&self, asset: Asset) -> Option<f64> {
        self.prices
            .iter()
            .find(|(candidate, _)| *candidate == asset)
            .map(|(_, price)| *price)
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Decode and classify a raw text frame.
pub fn parse_frame(text: &str) -> Result<FeedMessage, FeedError> {
    let value = serde_json::from_str::<Value>(text)?;

    let Value::Object(object) = value else {
        return Err(FeedError::Malformed(format!(
            "expected a JSON object, received: {text}"
        )));
    };

    if object.get("type").and_then(Value::as_str) == Some("welcome") {
        return Ok(FeedMessage::Welcome);
    }

    if object.contains_key("coin") || object.contains_key("trend") {
        let prediction = serde_json::from_value::<RawPrediction>(Value::Object(object))?;
        return Ok(FeedMessage::Prediction(prediction));
    }

    Ok(FeedMessage::Ticks(TickMessage::from_object(&object)))
}
