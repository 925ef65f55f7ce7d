use std::time::Duration;

use overlay_core::editor::{Canvas, SnapConfig};

use crate::error::ClientError;

/// Which streaming endpoint a transport attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Overlay,
    Moderator,
}

impl Role {
    pub fn path(self) -> &'static str {
        match self {
            Role::Overlay => "/ws/overlay",
            Role::Moderator => "/ws/moderator",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL of the authority, e.g. `http://127.0.0.1:13337`.
    pub server: String,
    /// Delay before reconnecting after the stream closed or failed to open.
    pub reconnect_backoff: Duration,
    /// Full-document poll period while the stream is down.
    pub poll_interval: Duration,
}

impl TransportConfig {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into().trim_end_matches('/').to_string(),
            reconnect_backoff: Duration::from_secs(1),
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.server)
    }

    pub fn ws_url(&self, role: Role) -> Result<String, ClientError> {
        let rest = if let Some(rest) = self.server.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.server.strip_prefix("http://") {
            format!("ws://{rest}")
        } else if self.server.starts_with("ws://") || self.server.starts_with("wss://") {
            self.server.clone()
        } else {
            return Err(ClientError::InvalidUrl(self.server.clone()));
        };
        Ok(format!("{rest}{}", role.path()))
    }
}

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Countdown recompute period.
    pub tick: Duration,
    /// Origin relative media URLs are resolved against.
    pub origin: Option<String>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            tick: overlay_core::DEFAULT_TICK,
            origin: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub canvas: Canvas,
    pub snap: SnapConfig,
    /// Save delay for gestures; rearmed on every edit.
    pub debounce: Duration,
    /// Save delay for explicit commits.
    pub commit_delay: Duration,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            snap: SnapConfig::default(),
            debounce: Duration::from_millis(120),
            commit_delay: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_from_http_base() {
        let config = TransportConfig::new("http://127.0.0.1:13337/");
        assert_eq!(
            config.ws_url(Role::Overlay).unwrap(),
            "ws://127.0.0.1:13337/ws/overlay"
        );
        assert_eq!(config.api_url("/api/scene"), "http://127.0.0.1:13337/api/scene");

        let secure = TransportConfig::new("https://live.example");
        assert_eq!(
            secure.ws_url(Role::Moderator).unwrap(),
            "wss://live.example/ws/moderator"
        );
    }

    #[test]
    fn test_ws_url_rejects_unknown_scheme() {
        let config = TransportConfig::new("ftp://host");
        assert!(matches!(
            config.ws_url(Role::Overlay),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
