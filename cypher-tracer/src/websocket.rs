/// WebSocket client for the price & prediction feed
///
/// Provides automatic reconnection, heartbeat, and connection status reporting. Frames
/// are forwarded undecoded so malformed payloads surface in the consuming channel.

use crate::error::FeedError;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub(crate) const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(crate) const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);
pub(crate) const DEFAULT_FRAME_BUFFER: usize = 1_000;

/// Status updates are few and coalesce quickly; frames need the real buffer.
const STATUS_BUFFER: usize = 10;

/// Feed socket settings. Built from [`crate::DashboardConfig`] in the binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketConfig {
    pub url: String,
    /// Heartbeat period while connected.
    pub ping_interval: Duration,
    /// Pause between a lost connection and the next attempt.
    pub reconnect_delay: Duration,
    /// Frames buffered before the reader applies backpressure.
    pub frame_buffer: usize,
}

impl WebSocketConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ping_interval: DEFAULT_PING_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            frame_buffer: DEFAULT_FRAME_BUFFER,
        }
    }

    pub fn with_ping_interval(self, ping_interval: Duration) -> Self {
        Self {
            ping_interval,
            ..self
        }
    }

    pub fn with_reconnect_delay(self, reconnect_delay: Duration) -> Self {
        Self {
            reconnect_delay,
            ..self
        }
    }

    /// Zero is bumped to one; the frame channel cannot be unbuffered.
    pub fn with_frame_buffer(self, frame_buffer: usize) -> Self {
        Self {
            frame_buffer: frame_buffer.max(1),
            ..self
        }
    }
}

/// Feed transport state, observed by the consumers but owned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Error,
    Disconnected,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "CONNECTING...",
            ConnectionStatus::Connected => "LIVE",
            ConnectionStatus::Error => "CONNECTION ERROR",
            ConnectionStatus::Disconnected => "DISCONNECTED",
        }
    }
}

/// One text frame as received from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFrame {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl FeedFrame {
    pub fn new(text: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            received_at,
        }
    }
}

/// Reconnecting reader for the dashboard feed.
///
/// Owns the frame and status channels until [`WebSocketClient::start`] hands the
/// receiving halves to the caller.
pub struct WebSocketClient {
    config: WebSocketConfig,
    frame_tx: mpsc::Sender<FeedFrame>,
    frame_rx: mpsc::Receiver<FeedFrame>,
    status_tx: mpsc::Sender<ConnectionStatus>,
    status_rx: mpsc::Receiver<ConnectionStatus>,
}

impl WebSocketClient {
    pub fn with_config(config: WebSocketConfig) -> Self {
        let (frame_tx, frame_rx) = mpsc::channel(config.frame_buffer);
        let (status_tx, status_rx) = mpsc::channel(STATUS_BUFFER);

        Self {
            config,
            frame_tx,
            frame_rx,
            status_tx,
            status_rx,
        }
    }

    /// Spawn the connection loop and return the frame and status receivers.
    ///
    /// The loop stops once the frame receiver is dropped.
    pub fn start(self) -> (mpsc::Receiver<FeedFrame>, mpsc::Receiver<ConnectionStatus>) {
        let config = self.config.clone();
        let frame_tx = self.frame_tx.clone();
        let status_tx = self.status_tx.clone();

        tokio::spawn(async move {
            run_websocket_loop(config, frame_tx, status_tx).await;
        });

        (self.frame_rx, self.status_rx)
    }
}

/// How a single connection ended.
enum SessionEnd {
    /// Server closed or the stream ran dry
    Closed,
    /// Socket error
    Failed(FeedError),
    /// Nobody is listening for frames anymore
    ReceiverDropped,
}

/// Main WebSocket connection loop with auto-reconnect
async fn run_websocket_loop(
    config: WebSocketConfig,
    frame_tx: mpsc::Sender<FeedFrame>,
    status_tx: mpsc::Sender<ConnectionStatus>,
) {
    info!("Starting WebSocket client for {}", config.url);

    loop {
        let _ = status_tx.send(ConnectionStatus::Connecting).await;

        match connect_async(&config.url).await {
            Ok((ws_stream, _)) => {
                info!("Connected to feed at {}", config.url);
                let _ = status_tx.send(ConnectionStatus::Connected).await;

                let (mut write, mut read) = ws_stream.split();

                // Spawn ping task to keep connection alive
                let ping_interval = config.ping_interval;
                let (ping_shutdown_tx, mut ping_shutdown_rx) = mpsc::channel::<()>(1);

                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(ping_interval);
                    loop {
                        tokio::select! {
                            _ = interval.tick() => {
                                if write.send(Message::Ping(vec![].into())).await.is_err() {
                                    debug!("Failed to send ping, connection likely dead");
                                    break;
                                }
                            }
                            _ = ping_shutdown_rx.recv() => {
                                debug!("Ping task shutting down");
                                break;
                            }
                        }
                    }
                });

                let mut end = SessionEnd::Closed;
                while let Some(msg) = read.next().await {
                    match msg {
                        Ok(Message::Text(text)) => {
                            let frame = FeedFrame::new(text.as_str(), Utc::now());
                            if frame_tx.send(frame).await.is_err() {
                                end = SessionEnd::ReceiverDropped;
                                break;
                            }
                        }
                        Ok(Message::Close(_)) => {
                            info!("Server closed connection");
                            break;
                        }
                        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                            // Heartbeat messages - tungstenite handles these automatically
                        }
                        Err(e) => {
                            end = SessionEnd::Failed(FeedError::from(e));
                            break;
                        }
                        _ => {}
                    }
                }

                // Stop ping task
                let _ = ping_shutdown_tx.send(()).await;

                match end {
                    SessionEnd::ReceiverDropped => {
                        warn!("Frame receiver dropped, stopping client");
                        let _ = status_tx.send(ConnectionStatus::Disconnected).await;
                        return;
                    }
                    SessionEnd::Failed(error) => {
                        error!(%error, terminal = error.is_terminal(), "WebSocket error, will reconnect");
                        let _ = status_tx.send(ConnectionStatus::Error).await;
                    }
                    SessionEnd::Closed => {
                        warn!("Connection closed, will reconnect...");
                        let _ = status_tx.send(ConnectionStatus::Disconnected).await;
                    }
                }
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", config.url, e);
                let _ = status_tx.send(ConnectionStatus::Error).await;
            }
        }

        if frame_tx.is_closed() {
            debug!("Frame receiver dropped while disconnected, stopping client");
            return;
        }

        // Wait before reconnecting
        debug!(
            "Waiting {:?} before reconnecting...",
            config.reconnect_delay
        );
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_overrides() {
        struct TestCase {
            input: WebSocketConfig,
            expected: WebSocketConfig,
        }

        let tests = vec![
            TestCase {
                // TC0: url only keeps the defaults
                input: WebSocketConfig::new("ws://feed.local/ws"),
                expected: WebSocketConfig {
                    url: "ws://feed.local/ws".to_string(),
                    ping_interval: DEFAULT_PING_INTERVAL,
                    reconnect_delay: DEFAULT_RECONNECT_DELAY,
                    frame_buffer: DEFAULT_FRAME_BUFFER,
                },
            },
            TestCase {
                // TC1: every override applied
                input: WebSocketConfig::new("ws://feed.local/ws")
                    .with_ping_interval(Duration::from_secs(15))
                    .with_reconnect_delay(Duration::from_secs(5))
                    .with_frame_buffer(500),
                expected: WebSocketConfig {
                    url: "ws://feed.local/ws".to_string(),
                    ping_interval: Duration::from_secs(15),
                    reconnect_delay: Duration::from_secs(5),
                    frame_buffer: 500,
                },
            },
            TestCase {
                // TC2: zero frame buffer
                input: WebSocketConfig::new("ws://feed.local/ws").with_frame_buffer(0),
                expected: WebSocketConfig {
                    frame_buffer: 1,
                    ..WebSocketConfig::new("ws://feed.local/ws")
                },
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input, test.expected, "TC{} failed", index);
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_error() {
        // Port 9 (discard) on loopback is expected to refuse connections
        let config = WebSocketConfig::new("ws://127.0.0.1:9/ws")
            .with_reconnect_delay(Duration::from_secs(60));
        let (_frames, mut statuses) = WebSocketClient::with_config(config).start();

        assert_eq!(statuses.recv().await, Some(ConnectionStatus::Connecting));
        assert_eq!(statuses.recv().await, Some(ConnectionStatus::Error));
    }
}
