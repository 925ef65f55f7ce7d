//! Overlay-Live Client
//!
//! Tokio side of the scene synchronization engine: the auto-reconnecting
//! transport, the overlay subscriber session and the moderator saver.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod headless;
pub mod http;
pub mod moderator;
pub mod overlay;
pub mod transport;

pub use config::{EditorConfig, OverlayConfig, Role, TransportConfig};
pub use error::ClientError;
pub use http::{SceneApi, SceneSource, SceneWriter};
pub use moderator::{ModeratorSession, SaverHandle};
pub use overlay::OverlaySession;
pub use transport::{CommandEmitter, Transport, TransportEvent};
