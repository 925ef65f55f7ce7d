//! Pointer gestures on a selected layer.

use super::snap::{Canvas, snap_delta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Move,
    Resize,
}

/// A drag in progress. Positions are computed from the pointer's offset to
/// where the gesture started, so snapping never accumulates error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gesture {
    pub id: String,
    pub kind: GestureKind,
    pointer_origin: (i32, i32),
    /// Layer position (move) or size (resize) when the gesture started.
    value_origin: (i32, i32),
}

impl Gesture {
    pub fn moving(id: impl Into<String>, pointer: (i32, i32), position: (i32, i32)) -> Self {
        Self {
            id: id.into(),
            kind: GestureKind::Move,
            pointer_origin: pointer,
            value_origin: position,
        }
    }

    pub fn resizing(id: impl Into<String>, pointer: (i32, i32), size: (u32, u32)) -> Self {
        Self {
            id: id.into(),
            kind: GestureKind::Resize,
            pointer_origin: pointer,
            value_origin: (
                i32::try_from(size.0).unwrap_or(i32::MAX),
                i32::try_from(size.1).unwrap_or(i32::MAX),
            ),
        }
    }

    fn snapped_delta(&self, pointer: (i32, i32), step: i32) -> (i32, i32) {
        (
            snap_delta(pointer.0 - self.pointer_origin.0, step),
            snap_delta(pointer.1 - self.pointer_origin.1, step),
        )
    }

    /// New layer position for a move gesture, clamped to `canvas`.
    pub fn position(&self, pointer: (i32, i32), step: i32, canvas: &Canvas) -> (i32, i32) {
        let (dx, dy) = self.snapped_delta(pointer, step);
        canvas.clamp(self.value_origin.0 + dx, self.value_origin.1 + dy)
    }

    /// New layer size for a resize gesture; never below one step.
    pub fn size(&self, pointer: (i32, i32), step: i32) -> (u32, u32) {
        let (dx, dy) = self.snapped_delta(pointer, step);
        let min = step.max(1);
        let w = (self.value_origin.0 + dx).max(min);
        let h = (self.value_origin.1 + dy).max(min);
        (w.unsigned_abs(), h.unsigned_abs())
    }
}
