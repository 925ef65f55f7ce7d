//! Countdown timers attached to text layers.

use std::collections::BTreeMap;
use std::time::Duration;

use overlay_proto::{Layer, LayerKind, TimerSpec};

/// How often countdown text is recomputed, independent of scene events.
pub const DEFAULT_TICK: Duration = Duration::from_millis(200);

/// Whole seconds left until `deadline_ms`, rounded up, never negative.
pub fn remaining_secs(deadline_ms: i64, now_ms: i64) -> u64 {
    let left_ms = deadline_ms.saturating_sub(now_ms);
    if left_ms <= 0 {
        return 0;
    }
    u64::try_from(left_ms).map_or(0, |ms| ms.div_ceil(1000))
}

/// Substitute `hh`, `mm` and `ss` in `format` with zero-padded values.
///
/// Without an `hh` token the minutes are not wrapped at 60.
pub fn format_countdown(format: &str, remaining_secs: u64) -> String {
    let seconds = remaining_secs % 60;
    let (hours, minutes) = if format.contains("hh") {
        (remaining_secs / 3600, (remaining_secs % 3600) / 60)
    } else {
        (0, remaining_secs / 60)
    };

    format
        .replace("hh", &format!("{hours:02}"))
        .replace("mm", &format!("{minutes:02}"))
        .replace("ss", &format!("{seconds:02}"))
}

/// A freshly computed countdown text for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFrame {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone)]
struct Countdown {
    deadline_epoch_ms: i64,
    format: String,
    last_text: Option<String>,
}

/// Active countdowns keyed by layer id.
///
/// A countdown is cancelled and restarted whenever its layer is updated, and
/// cancelled when the layer is removed or the scene is cleared.
#[derive(Debug, Clone, Default)]
pub struct CountdownBoard {
    timers: BTreeMap<String, Countdown>,
}

impl CountdownBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.timers.contains_key(id)
    }

    pub fn restart(&mut self, id: &str, spec: &TimerSpec) {
        let TimerSpec::Countdown {
            deadline_epoch_ms,
            format,
        } = spec;
        self.timers.insert(
            id.to_string(),
            Countdown {
                deadline_epoch_ms: *deadline_epoch_ms,
                format: format.clone(),
                last_text: None,
            },
        );
    }

    pub fn cancel(&mut self, id: &str) -> bool {
        self.timers.remove(id).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    /// Restart the countdown of a (re)written layer, or cancel it when the
    /// layer no longer carries one.
    pub fn sync_layer(&mut self, layer: &Layer) {
        match (&layer.timer, layer.kind) {
            (Some(spec), LayerKind::Text) => self.restart(&layer.id, spec),
            _ => {
                self.cancel(&layer.id);
            }
        }
    }

    /// Drop everything and start countdowns for every timed layer in `items`.
    pub fn reset(&mut self, items: &[Layer]) {
        self.cancel_all();
        for layer in items {
            self.sync_layer(layer);
        }
    }

    /// Forget the last emitted texts so the next tick re-emits every
    /// countdown. Needed after the surface re-rendered its visual tree.
    pub fn refresh(&mut self) {
        for countdown in self.timers.values_mut() {
            countdown.last_text = None;
        }
    }

    /// Recompute every countdown; returns only texts that changed since the
    /// previous tick.
    pub fn tick(&mut self, now_ms: i64) -> Vec<TimerFrame> {
        let mut frames = Vec::new();
        for (id, countdown) in &mut self.timers {
            let text = format_countdown(
                &countdown.format,
                remaining_secs(countdown.deadline_epoch_ms, now_ms),
            );
            if countdown.last_text.as_deref() != Some(text.as_str()) {
                countdown.last_text = Some(text.clone());
                frames.push(TimerFrame {
                    id: id.clone(),
                    text,
                });
            }
        }
        frames
    }
}
