//! Grid snapping and canvas bounds for editor gestures.

/// Grid steps. Plain gestures use the fine step, gestures with the modifier
/// key held use the coarse one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapConfig {
    pub fine_step: i32,
    pub coarse_step: i32,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            fine_step: 1,
            coarse_step: 10,
        }
    }
}

impl SnapConfig {
    pub fn step(&self, coarse: bool) -> i32 {
        if coarse { self.coarse_step } else { self.fine_step }
    }
}

/// Round `delta` to the nearest multiple of `step`; halves round up.
///
/// Steps of `1` or less leave the delta untouched.
pub fn snap_delta(delta: i32, step: i32) -> i32 {
    if step <= 1 {
        return delta;
    }
    (2 * delta + step).div_euclid(2 * step) * step
}

/// Drawable area; layer positions are clamped into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: i32,
    pub height: i32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl Canvas {
    pub fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        (x.clamp(0, self.width.max(0)), y.clamp(0, self.height.max(0)))
    }
}
