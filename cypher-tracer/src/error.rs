use thiserror::Error;

/// All errors generated in `cypher-tracer`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Error)]
pub enum FeedError {
    #[error("malformed feed payload: {0}")]
    Malformed(String),

    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    #[error("unknown timeframe: {0}")]
    UnknownTimeframe(String),

    #[error("unknown trend: {0}")]
    UnknownTrend(String),

    #[error("SocketError: {0}")]
    Socket(String),
}

impl FeedError {
    /// Determine if an error means the feed transport is gone and must reconnect.
    ///
    /// Payload level errors only ever cost the offending frame.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_terminal(&self) -> bool {
        match self {
            FeedError::Socket(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(value.to_string())
    }
}
