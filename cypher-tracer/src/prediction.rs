//! Trend prediction channel.
//!
//! Keeps the latest normalised [`PredictionRecord`] per asset. Predictions are replaced
//! wholesale, never merged, and never expire.

use crate::{
    asset::Asset,
    confidence::{ConfidenceLevel, normalize_confidence},
    error::FeedError,
    feed::{FeedMessage, parse_frame},
    websocket::ConnectionStatus,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, warn};

/// Separator the predictor uses to flatten explanation lines into one string.
pub const EXPLANATION_SEPARATOR: &str = "; ";

/// Predicted price direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Bullish => "bullish",
            Trend::Bearish => "bearish",
            Trend::Neutral => "neutral",
        }
    }
}

impl FromStr for Trend {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bullish" => Ok(Trend::Bullish),
            "bearish" => Ok(Trend::Bearish),
            "neutral" => Ok(Trend::Neutral),
            _ => Err(FeedError::UnknownTrend(s.to_string())),
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Prediction message exactly as it arrives on the wire.
///
/// Every field is optional and kept as raw JSON so a wrongly typed field never fails the
/// whole frame; validation happens in [`PredictionChannel::on_prediction_message`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawPrediction {
    #[serde(default)]
    pub coin: Option<Value>,
    #[serde(default)]
    pub trend: Option<Value>,
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default)]
    pub explanation: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// Latest normalised prediction for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub asset: Asset,
    pub trend: Trend,
    /// Fraction in `[0, 1]`.
    pub confidence: f64,
    pub explanation: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_confidence(self.confidence)
    }
}

/// Why a prediction message was not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingCoin,
    MissingTrend,
    UnknownAsset(String),
    UnknownTrend(String),
    /// Valid prediction for an asset other than the one being displayed.
    NotOfInterest(Asset),
}

/// Result of offering one message to the [`PredictionChannel`].
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Accepted(Asset),
    Ignored(Rejection),
}

/// Split an explanation field into display lines.
///
/// A string is split on [`EXPLANATION_SEPARATOR`] with blank lines dropped; an array is
/// taken element-wise.
pub fn explanation_lines(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::String(text)) => text
            .split(EXPLANATION_SEPARATOR)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(line) => line.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    }
}

/// Parse an ISO-8601-like timestamp.
///
/// RFC 3339 strings keep their offset; naive `YYYY-MM-DDTHH:MM:SS[.f]` strings are read
/// as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Consumer side of the prediction stream.
#[derive(Debug, Clone)]
pub struct PredictionChannel {
    asset_of_interest: Asset,
    records: FnvHashMap<Asset, PredictionRecord>,
    status: ConnectionStatus,
    last_error: Option<FeedError>,
}

impl PredictionChannel {
    pub fn new(asset_of_interest: Asset) -> Self {
        Self {
            asset_of_interest,
            records: FnvHashMap::default(),
            status: ConnectionStatus::Connecting,
            last_error: None,
        }
    }

    pub fn asset_of_interest(&self) -> Asset {
        self.asset_of_interest
    }

    /// Change the asset predictions are accepted for. Records already held are kept.
    pub fn set_asset_of_interest(&mut self, asset: Asset) {
        self.asset_of_interest = asset;
    }

    /// Validate, normalise and store one prediction message received at `now`.
    pub fn on_prediction_message(
        &mut self,
        raw: &RawPrediction,
        now: DateTime<Utc>,
    ) -> PredictionOutcome {
        let record = match self.validate(raw, now) {
            Ok(record) => record,
            Err(rejection) => {
                debug!(?rejection, "prediction ignored");
                return PredictionOutcome::Ignored(rejection);
            }
        };

        let asset = record.asset;
        debug!(
            %asset,
            trend = %record.trend,
            confidence = record.confidence,
            "prediction accepted"
        );
        self.records.insert(asset, record);
        self.status = ConnectionStatus::Connected;
        PredictionOutcome::Accepted(asset)
    }

    /// Handle a raw text frame. Parse failures put the channel into the error state and
    /// leave every record untouched.
    pub fn on_frame(&mut self, text: &str, now: DateTime<Utc>) -> Option<PredictionOutcome> {
        match parse_frame(text) {
            Ok(FeedMessage::Prediction(raw)) => Some(self.on_prediction_message(&raw, now)),
            Ok(_) => None,
            Err(error) => {
                self.on_error(error);
                None
            }
        }
    }

    /// Surface a channel level error (e.g. an unparseable frame).
    pub fn on_error(&mut self, error: FeedError) {
        warn!(%error, "prediction channel error");
        self.status = ConnectionStatus::Error;
        self.last_error = Some(error);
    }

    /// Mirror the feed transport state.
    pub fn observe_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&FeedError> {
        self.last_error.as_ref()
    }

    pub fn latest(&self, asset: Asset) -> Option<&PredictionRecord> {
        self.records.get(&asset)
    }

    /// Latest prediction for the asset of interest.
    pub fn current(&self) -> Option<&PredictionRecord> {
        self.latest(self.asset_of_interest)
    }

    fn validate(
        &self,
        raw: &RawPrediction,
        now: DateTime<Utc>,
    ) -> Result<PredictionRecord, Rejection> {
        let coin = raw
            .coin
            .as_ref()
            .and_then(Value::as_str)
            .filter(|coin| !coin.is_empty())
            .ok_or(Rejection::MissingCoin)?;
        let trend = raw
            .trend
            .as_ref()
            .and_then(Value::as_str)
            .filter(|trend| !trend.is_empty())
            .ok_or(Rejection::MissingTrend)?;

        let asset =
            Asset::from_symbol(coin).ok_or_else(|| Rejection::UnknownAsset(coin.to_string()))?;
        if asset != self.asset_of_interest {
            return Err(Rejection::NotOfInterest(asset));
        }

        let trend = trend
            .parse::<Trend>()
            .map_err(|_| Rejection::UnknownTrend(trend.to_string()))?;

        let timestamp = raw
            .timestamp
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .unwrap_or(now);

        Ok(PredictionRecord {
            asset,
            trend,
            confidence: normalize_confidence(raw.confidence.as_ref()),
            explanation: explanation_lines(raw.explanation.as_ref()),
            timestamp,
        })
    }
}
