//! Moderator-side editing: local document, gestures and save scheduling.

mod gesture;
mod save_queue;
mod snap;
mod state;

pub use gesture::{Gesture, GestureKind};
pub use save_queue::{SaveDecision, SaveQueue, SaveState};
pub use snap::{Canvas, SnapConfig, snap_delta};
pub use state::{EditorState, Nudge, SaveTiming, WRITE_SOURCE, new_layer_id};
