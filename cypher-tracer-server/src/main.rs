//! Price & trend feed for the cypher-tracer dashboard.
//!
//! Polls Binance spot prices for the tracked assets, keeps a short rolling history per
//! asset and periodically broadcasts trend predictions computed from it. Every client on
//! `ws://{WS_ADDR}/ws` receives both streams.

mod binance;
mod config;
mod error;
mod indicators;
mod message;
mod predictor;
mod server;
mod state;

use crate::{
    binance::PriceClient,
    config::ServerConfig,
    message::FeedEvent,
    state::FeedState,
};
use chrono::Utc;
use tokio::{
    sync::broadcast,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("Starting cypher-tracer feed server");

    let config = ServerConfig::from_env();
    info!(?config, "configuration loaded");

    let (tx, _) = broadcast::channel::<FeedEvent>(config.buffer_size);

    let listener = server::bind(config.addr).await?;
    tokio::spawn(server::serve(listener, tx.clone()));
    info!("WebSocket server listening on ws://{}/ws", config.addr);

    let client = PriceClient::new(config.binance_rest_url.clone())?;
    let mut state = FeedState::new();

    let mut price_timer = interval(config.price_poll);
    price_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut trend_timer = interval(config.trend_interval);
    trend_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First trend round one full period after start
    trend_timer.tick().await;

    loop {
        tokio::select! {
            _ = price_timer.tick() => {
                let snapshot = client.poll().await;
                state.record(&snapshot);
                publish(&tx, FeedEvent::Prices(snapshot));
            }
            _ = trend_timer.tick() => {
                for message in state.predictions(Utc::now()) {
                    debug!(coin = %message.coin, trend = %message.trend, confidence = message.confidence, "broadcasting trend");
                    publish(&tx, FeedEvent::Prediction(message));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping feed server");
                break;
            }
        }
    }

    Ok(())
}

/// Publish to every subscriber; having none is not an error.
fn publish(tx: &broadcast::Sender<FeedEvent>, event: FeedEvent) {
    if tx.send(event).is_err() {
        debug!("No connected clients, event dropped");
    }
}

/// Initialize logging
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
