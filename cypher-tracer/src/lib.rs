/// Cypher Tracer - live multi-timeframe price tracing
///
/// Turns an unbounded stream of spot price ticks into bounded, down-sampled series for
/// every (asset, timeframe) pair, and keeps the latest trend prediction per asset next to
/// them.
///
/// The library includes:
/// - Throttle clock and bounded window store behind the aggregator
/// - Confidence normalisation and the prediction channel
/// - Feed frame classification and the WebSocket feed client
/// - A single-writer dashboard session for renderers
pub mod aggregator;
pub mod asset;
pub mod confidence;
pub mod config;
pub mod error;
pub mod feed;
pub mod prediction;
pub mod session;
pub mod throttle;
pub mod timeframe;
pub mod websocket;
pub mod window;

// Re-export commonly used types for convenience
pub use aggregator::{Aggregator, PriceDirection, Selection};
pub use asset::Asset;
pub use confidence::{ConfidenceLevel, normalize_confidence};
pub use config::DashboardConfig;
pub use error::FeedError;
pub use feed::{FeedMessage, TickMessage, parse_frame};
pub use prediction::{PredictionChannel, PredictionOutcome, PredictionRecord, RawPrediction, Trend};
pub use session::{Dashboard, DashboardView, FrameOutcome, SharedDashboard, drive};
pub use throttle::{SeriesKey, ThrottleClock};
pub use timeframe::{DEFAULT_INTERVAL_MS, Timeframe, admission_interval};
pub use websocket::{ConnectionStatus, FeedFrame, WebSocketClient, WebSocketConfig};
pub use window::{WINDOW_CAPACITY, WindowBuffer, WindowStore};
