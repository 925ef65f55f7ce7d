use overlay_proto::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("{path} returned status {status}")]
    Status { path: String, status: u16 },

    #[error("transport closed")]
    Closed,
}
