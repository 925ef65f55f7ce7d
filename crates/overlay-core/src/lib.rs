//! Overlay-Live Core Library
//!
//! Synchronous scene synchronization engine shared by overlay subscribers and
//! the moderator editor. Nothing here performs I/O; the client crate drives
//! it from its transport and timers.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod applier;
pub mod countdown;
pub mod editor;
pub mod event;
pub mod markup;
pub mod media;
pub mod projector;
pub mod store;

pub use applier::{ApplyOutcome, DeltaApplier, SyncState, VersionReport};
pub use countdown::{CountdownBoard, DEFAULT_TICK, TimerFrame, format_countdown, remaining_secs};
pub use editor::{EditorState, SaveDecision, SaveQueue, SaveTiming};
pub use event::ChangeEvent;
pub use media::{
    MediaHost, MediaKind, MediaReconciler, MediaSpec, PlaybackError, PlaybackFlags,
    ReconcileSummary,
};
pub use projector::{PresentationSurface, Projection, RenderProjector, VisualContent, VisualNode};
pub use store::SceneStore;
