//! Dashboard session: one aggregator and one prediction channel driven by a single feed.
//!
//! All mutation goes through one owner. When the feed is consumed on a worker task the
//! [`SharedDashboard`] lock serialises writers, and renderers only ever read owned
//! [`DashboardView`] copies taken under that lock.

use crate::{
    aggregator::{Aggregator, PriceDirection, Selection},
    asset::Asset,
    config::DashboardConfig,
    feed::{FeedMessage, parse_frame},
    prediction::{PredictionChannel, PredictionOutcome, PredictionRecord},
    timeframe::Timeframe,
    websocket::{ConnectionStatus, FeedFrame},
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Effect of one feed frame on the session.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Welcome,
    /// Tick map processed, with the number of admitted samples.
    Ticks(usize),
    Prediction(PredictionOutcome),
    /// Frame could not be decoded; no state besides the channel error changed.
    Malformed,
}

/// Everything the rendering layer needs, detached from the session.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub selection: Selection,
    pub series: Vec<f64>,
    pub live_price: Option<f64>,
    pub direction: Option<PriceDirection>,
    pub prediction: Option<PredictionRecord>,
    pub feed_status: ConnectionStatus,
    pub prediction_status: ConnectionStatus,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    aggregator: Aggregator,
    predictions: PredictionChannel,
    feed_status: ConnectionStatus,
    last_update: Option<DateTime<Utc>>,
}

impl Dashboard {
    pub fn new(selection: Selection) -> Self {
        Self {
            aggregator: Aggregator::new(selection),
            predictions: PredictionChannel::new(selection.asset),
            feed_status: ConnectionStatus::Connecting,
            last_update: None,
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(Selection::new(config.asset, config.timeframe))
    }

    /// Route one raw frame received at `now` to the channel it belongs to.
    pub fn handle_frame(&mut self, text: &str, now: DateTime<Utc>) -> FrameOutcome {
        match parse_frame(text) {
            Ok(FeedMessage::Welcome) => {
                debug!("Received welcome message");
                FrameOutcome::Welcome
            }
            Ok(FeedMessage::Ticks(ticks)) => {
                let admitted = self.aggregator.on_tick(&ticks, now);
                self.last_update = Some(now);
                FrameOutcome::Ticks(admitted)
            }
            Ok(FeedMessage::Prediction(raw)) => {
                FrameOutcome::Prediction(self.predictions.on_prediction_message(&raw, now))
            }
            Err(error) => {
                self.predictions.on_error(error);
                FrameOutcome::Malformed
            }
        }
    }

    pub fn handle_feed_frame(&mut self, frame: &FeedFrame) -> FrameOutcome {
        self.handle_frame(&frame.text, frame.received_at)
    }

    /// Mirror a transport status change into both channels.
    pub fn observe_status(&mut self, status: ConnectionStatus) {
        self.feed_status = status;
        self.predictions.observe_status(status);
    }

    /// Change the visible pair; predictions follow the selected asset.
    pub fn select(&mut self, asset: Asset, timeframe: Timeframe) {
        self.aggregator.on_selection_change(asset, timeframe);
        self.predictions.set_asset_of_interest(asset);
    }

    pub fn select_asset(&mut self, asset: Asset) {
        self.select(asset, self.aggregator.selection().timeframe);
    }

    pub fn select_timeframe(&mut self, timeframe: Timeframe) {
        self.select(self.aggregator.selection().asset, timeframe);
    }

    pub fn selection(&self) -> Selection {
        self.aggregator.selection()
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn predictions(&self) -> &PredictionChannel {
        &self.predictions
    }

    pub fn view(&self) -> DashboardView {
        let selection = self.aggregator.selection();
        DashboardView {
            selection,
            series: self.aggregator.current_series().to_vec(),
            live_price: self.aggregator.latest_price(selection.asset),
            direction: self.aggregator.price_direction(),
            prediction: self.predictions.current().cloned(),
            feed_status: self.feed_status,
            prediction_status: self.predictions.status(),
            last_update: self.last_update,
        }
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(Selection::new(Asset::Dot, Timeframe::TwoSeconds))
    }
}

/// Single-writer handle to a [`Dashboard`] shared between the feed task and a renderer.
#[derive(Debug, Clone, Default)]
pub struct SharedDashboard {
    inner: Arc<Mutex<Dashboard>>,
}

impl SharedDashboard {
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            inner: Arc::new(Mutex::new(dashboard)),
        }
    }

    pub fn handle_feed_frame(&self, frame: &FeedFrame) -> FrameOutcome {
        self.inner.lock().handle_feed_frame(frame)
    }

    pub fn observe_status(&self, status: ConnectionStatus) {
        self.inner.lock().observe_status(status);
    }

    pub fn select(&self, asset: Asset, timeframe: Timeframe) {
        self.inner.lock().select(asset, timeframe);
    }

    /// Apply an arbitrary update under the lock.
    pub fn update<T>(&self, f: impl FnOnce(&mut Dashboard) -> T) -> T {
        f(&mut self.inner.lock())
    }

    /// Consistent copy of the current state.
    pub fn view(&self) -> DashboardView {
        self.inner.lock().view()
    }
}

/// Feed the session from a [`WebSocketClient`](crate::websocket::WebSocketClient)'s
/// receivers until both close.
pub async fn drive(
    dashboard: SharedDashboard,
    mut frames: mpsc::Receiver<FeedFrame>,
    mut statuses: mpsc::Receiver<ConnectionStatus>,
) {
    let mut frames_open = true;
    let mut statuses_open = true;

    while frames_open || statuses_open {
        tokio::select! {
            frame = frames.recv(), if frames_open => match frame {
                Some(frame) => {
                    let outcome = dashboard.handle_feed_frame(&frame);
                    debug!(?outcome, "frame handled");
                }
                None => frames_open = false,
            },
            status = statuses.recv(), if statuses_open => match status {
                Some(status) => {
                    info!(?status, "feed status changed");
                    dashboard.observe_status(status);
                }
                None => statuses_open = false,
            },
        }
    }

    debug!("feed receivers closed, session driver exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{Rejection, Trend};

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn test_routes_ticks_and_predictions() {
        let mut dashboard = Dashboard::new(Selection::new(Asset::Btc, Timeframe::TwoSeconds));

        assert_eq!(
            dashboard.handle_frame(r#"{"type": "welcome"}"#, at(0)),
            FrameOutcome::Welcome
        );
        assert_eq!(
            dashboard.handle_frame(r#"{"BTC": 100.0, "ETH": null}"#, at(0)),
            FrameOutcome::Ticks(4)
        );
        assert_eq!(
            dashboard.handle_frame(
                r#"{"coin": "BTC", "trend": "bearish", "confidence": "40"}"#,
                at(10)
            ),
            FrameOutcome::Prediction(PredictionOutcome::Accepted(Asset::Btc))
        );

        let view = dashboard.view();
        assert_eq!(view.series, vec![100.0]);
        assert_eq!(view.live_price, Some(100.0));
        assert_eq!(view.last_update, Some(at(0)));
        let prediction = view.prediction.unwrap();
        assert_eq!(prediction.trend, Trend::Bearish);
        assert_eq!(prediction.confidence, 0.4);
    }

    #[test]
    fn test_malformed_frame_leaves_buffers_untouched() {
        let mut dashboard = Dashboard::default();
        dashboard.handle_frame(r#"{"DOT": 5.0}"#, at(0));
        let before = dashboard.view();

        assert_eq!(dashboard.handle_frame("<html>", at(2_000)), FrameOutcome::Malformed);

        let after = dashboard.view();
        assert_eq!(after.series, before.series);
        assert_eq!(after.prediction_status, ConnectionStatus::Error);
    }

    #[test]
    fn test_selection_moves_asset_of_interest() {
        let mut dashboard = Dashboard::new(Selection::new(Asset::Eth, Timeframe::TwoSeconds));

        let btc = r#"{"coin": "BTC", "trend": "bullish", "confidence": 0.7}"#;
        assert_eq!(
            dashboard.handle_frame(btc, at(0)),
            FrameOutcome::Prediction(PredictionOutcome::Ignored(Rejection::NotOfInterest(
                Asset::Btc
            )))
        );

        dashboard.select_asset(Asset::Btc);
        assert_eq!(
            dashboard.handle_frame(btc, at(1)),
            FrameOutcome::Prediction(PredictionOutcome::Accepted(Asset::Btc))
        );
        assert_eq!(dashboard.predictions().asset_of_interest(), Asset::Btc);
        assert_eq!(dashboard.selection().timeframe, Timeframe::TwoSeconds);
    }

    #[test]
    fn test_disconnect_keeps_history() {
        let mut dashboard = Dashboard::default();
        dashboard.handle_frame(r#"{"DOT": 5.0}"#, at(0));
        dashboard.handle_frame(r#"{"DOT": 6.0}"#, at(1_000));

        dashboard.observe_status(ConnectionStatus::Disconnected);

        let view = dashboard.view();
        assert_eq!(view.series, vec![5.0, 6.0]);
        assert_eq!(view.feed_status, ConnectionStatus::Disconnected);
        assert_eq!(view.prediction_status, ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_drive_consumes_until_receivers_close() {
        let shared = SharedDashboard::new(Dashboard::default());
        let (frame_tx, frame_rx) = mpsc::channel(8);
        let (status_tx, status_rx) = mpsc::channel(8);

        let driver = tokio::spawn(drive(shared.clone(), frame_rx, status_rx));

        status_tx.send(ConnectionStatus::Connected).await.unwrap();
        frame_tx
            .send(FeedFrame::new(r#"{"DOT": 5.0}"#, at(0)))
            .await
            .unwrap();
        frame_tx
            .send(FeedFrame::new(r#"{"DOT": 6.0}"#, at(400)))
            .await
            .unwrap();
        frame_tx
            .send(FeedFrame::new(r#"{"DOT": 7.0}"#, at(1_200)))
            .await
            .unwrap();
        drop(frame_tx);
        drop(status_tx);

        driver.await.unwrap();

        let view = shared.view();
        assert_eq!(view.series, vec![5.0, 7.0]);
        assert_eq!(view.feed_status, ConnectionStatus::Connected);
    }
}
