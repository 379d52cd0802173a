use thiserror::Error;

/// All errors generated by the feed server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("price request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode price response: {0}")]
    Decode(String),

    #[error("failed to bind WebSocket listener on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for ServerError {
    fn from(error: serde_json::Error) -> Self {
        ServerError::Decode(error.to_string())
    }
}
