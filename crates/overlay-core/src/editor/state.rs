//! Moderator-side local document with optimistic edits.
//!
//! Every mutating operation applies to the local document first and returns a
//! [`SaveTiming`] telling the caller how soon the whole document should be
//! written back to the authority.

use overlay_proto::{Layer, LayerKind, LayerPatch, SceneDocument, SceneWrite, WriteMeta};

use super::gesture::{Gesture, GestureKind};
use super::snap::{Canvas, SnapConfig, snap_delta};
use crate::event::ChangeEvent;
use crate::projector::{DEFAULT_BACKGROUND, DEFAULT_COLOR, DEFAULT_FONT_SIZE};
use crate::store::SceneStore;

/// `_meta.source` of writes issued by the editor.
pub const WRITE_SOURCE: &str = "moderator-panel";

/// How soon a local edit should reach the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTiming {
    /// Explicit commits (forms, add, remove, clear). Saved without delay.
    Commit,
    /// Continuous gestures (drag, nudge). Saved after the debounce window,
    /// rearmed by every further edit.
    Debounced,
    /// End of a gesture. Any scheduled save fires now.
    Flush,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    Left,
    Right,
    Up,
    Down,
}

impl Nudge {
    fn offset(self, step: i32) -> (i32, i32) {
        match self {
            Nudge::Left => (-step, 0),
            Nudge::Right => (step, 0),
            Nudge::Up => (0, -step),
            Nudge::Down => (0, step),
        }
    }
}

/// Fresh layer id: the kind followed by 8 random hex characters.
pub fn new_layer_id(kind: LayerKind) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", kind.as_str(), &random[..8])
}

#[derive(Debug, Clone, Default)]
pub struct EditorState {
    store: SceneStore,
    selected: Option<String>,
    version: u64,
    canvas: Canvas,
    snap: SnapConfig,
    gesture: Option<Gesture>,
}

impl EditorState {
    pub fn new(canvas: Canvas, snap: SnapConfig) -> Self {
        Self {
            canvas,
            snap,
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[Layer] {
        self.store.items()
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.store.get(id)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    /// Replace the local document with one read from the authority.
    pub fn load(&mut self, doc: SceneDocument) {
        self.store.replace_all(doc.items);
        self.version = self.version.max(doc.version);
        self.drop_dangling_selection();
    }

    /// Select a layer; unknown ids clear the selection.
    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id.filter(|id| self.store.contains(id)).map(str::to_string);
    }

    /// Add a layer with editor defaults, select it and return its id.
    pub fn add_layer(&mut self, kind: LayerKind, content: impl Into<String>) -> (String, SaveTiming) {
        let id = new_layer_id(kind);
        let mut layer = Layer::new(id.clone(), kind, content);
        layer.x = 100;
        layer.y = 100;
        layer.z = self.store.next_z();
        if kind == LayerKind::Text {
            layer.font_size = Some(DEFAULT_FONT_SIZE);
            layer.color = Some(DEFAULT_COLOR.to_string());
            layer.bg = Some(DEFAULT_BACKGROUND.to_string());
        } else {
            layer.w = Some(300);
        }
        if kind.is_media() {
            layer.looping = Some(true);
            layer.volume = Some(1.0);
        }
        tracing::debug!(id = %id, kind = kind.as_str(), "Layer added locally");
        self.store.upsert(layer);
        self.selected = Some(id.clone());
        (id, SaveTiming::Commit)
    }

    /// Merge a form edit into an existing layer. Positions are clamped to the
    /// canvas. Returns `None` when the layer does not exist.
    pub fn update_layer(&mut self, id: &str, patch: &LayerPatch) -> Option<SaveTiming> {
        let canvas = self.canvas;
        let layer = self.store.get_mut(id)?;
        layer.apply_patch(patch);
        (layer.x, layer.y) = canvas.clamp(layer.x, layer.y);
        Some(SaveTiming::Commit)
    }

    pub fn remove_layer(&mut self, id: &str) -> Option<SaveTiming> {
        self.store.remove(id)?;
        if self.gesture.as_ref().is_some_and(|g| g.id == id) {
            self.gesture = None;
        }
        self.drop_dangling_selection();
        Some(SaveTiming::Commit)
    }

    pub fn bring_to_front(&mut self, id: &str) -> Option<SaveTiming> {
        let top = self.store.next_z();
        self.store.get_mut(id)?.z = top;
        Some(SaveTiming::Commit)
    }

    pub fn clear(&mut self) -> SaveTiming {
        self.store.clear();
        self.selected = None;
        self.gesture = None;
        SaveTiming::Commit
    }

    /// Move the selected layer by one step.
    pub fn nudge(&mut self, direction: Nudge, coarse: bool) -> Option<SaveTiming> {
        let id = self.selected.clone()?;
        let (dx, dy) = direction.offset(self.snap.step(coarse));
        let canvas = self.canvas;
        let layer = self.store.get_mut(&id)?;
        (layer.x, layer.y) = canvas.clamp(layer.x + dx, layer.y + dy);
        Some(SaveTiming::Debounced)
    }

    /// Pointer-down on a layer: select it and start a move gesture.
    pub fn begin_move(&mut self, id: &str, pointer: (i32, i32)) -> bool {
        let Some(layer) = self.store.get(id) else {
            return false;
        };
        self.gesture = Some(Gesture::moving(id, pointer, (layer.x, layer.y)));
        self.selected = Some(id.to_string());
        true
    }

    /// Pointer-down on a resize handle. `rendered_size` is used when the layer
    /// has no forced size.
    pub fn begin_resize(&mut self, id: &str, pointer: (i32, i32), rendered_size: (u32, u32)) -> bool {
        let Some(layer) = self.store.get(id) else {
            return false;
        };
        let size = (
            layer.width().unwrap_or(rendered_size.0),
            layer.height().unwrap_or(rendered_size.1),
        );
        self.gesture = Some(Gesture::resizing(id, pointer, size));
        self.selected = Some(id.to_string());
        true
    }

    /// Pointer-move during a gesture. `coarse` selects the coarse grid.
    pub fn pointer_move(&mut self, pointer: (i32, i32), coarse: bool) -> Option<SaveTiming> {
        let gesture = self.gesture.as_ref()?;
        let step = self.snap.step(coarse);
        let layer = self.store.get_mut(&gesture.id)?;
        match gesture.kind {
            GestureKind::Move => {
                (layer.x, layer.y) = gesture.position(pointer, step, &self.canvas);
            }
            GestureKind::Resize => {
                let (w, h) = gesture.size(pointer, step);
                layer.w = Some(w);
                layer.h = Some(h);
            }
        }
        Some(SaveTiming::Debounced)
    }

    /// Pointer-up: the gesture ends and its result is flushed.
    pub fn pointer_up(&mut self) -> Option<SaveTiming> {
        self.gesture.take().map(|_| SaveTiming::Flush)
    }

    /// Plain delta snapping with the configured grid.
    pub fn snap(&self, delta: i32, coarse: bool) -> i32 {
        snap_delta(delta, self.snap.step(coarse))
    }

    /// Full-document write of the current local state.
    pub fn to_write(&self, client_ts: i64) -> SceneWrite {
        SceneWrite {
            items: self.store.snapshot(),
            meta: WriteMeta {
                source: Some(WRITE_SOURCE.to_string()),
                client_ts,
                known_version: self.version,
            },
        }
    }

    /// Trust the version returned by the authority after a write.
    pub fn adopt_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Apply a broadcast event to the local document. Callers must only do
    /// this while no local save is scheduled or in flight.
    pub fn apply_remote(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Full { items, version, .. } => {
                self.store.replace_all(items);
                if let Some(version) = version {
                    self.version = version;
                }
            }
            ChangeEvent::Add(item) | ChangeEvent::Update(item) => {
                self.store.upsert(item);
            }
            ChangeEvent::Remove(id) => {
                self.store.remove(&id);
            }
            ChangeEvent::Clear => self.store.clear(),
        }
        if let Some(gesture) = &self.gesture
            && !self.store.contains(&gesture.id)
        {
            self.gesture = None;
        }
        self.drop_dangling_selection();
    }

    fn drop_dangling_selection(&mut self) {
        if let Some(id) = &self.selected
            && !self.store.contains(id)
        {
            self.selected = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> EditorState {
        EditorState::new(Canvas::default(), SnapConfig::default())
    }

    #[test]
    fn test_add_layer_defaults() {
        let mut editor = editor();
        let (id, timing) = editor.add_layer(LayerKind::Text, "hello");

        assert_eq!(timing, SaveTiming::Commit);
        assert!(id.starts_with("text"));
        assert_eq!(id.len(), "text".len() + 8);
        assert_eq!(editor.selected(), Some(id.as_str()));

        let layer = editor.layer(&id).unwrap();
        assert_eq!((layer.x, layer.y), (100, 100));
        assert_eq!(layer.font_size, Some(40));
        assert_eq!(layer.z, 2);
    }

    #[test]
    fn test_drag_snaps_and_flushes() {
        let mut editor = editor();
        let (id, _) = editor.add_layer(LayerKind::Image, "/a.png");

        assert!(editor.begin_move(&id, (500, 500)));
        assert_eq!(editor.pointer_move((507, 503), true), Some(SaveTiming::Debounced));
        let layer = editor.layer(&id).unwrap();
        assert_eq!((layer.x, layer.y), (110, 100));

        editor.pointer_move((507, 503), false);
        let layer = editor.layer(&id).unwrap();
        assert_eq!((layer.x, layer.y), (107, 103));

        assert_eq!(editor.pointer_up(), Some(SaveTiming::Flush));
        assert_eq!(editor.pointer_up(), None);
    }

    #[test]
    fn test_resize_uses_rendered_size_when_unforced() {
        let mut editor = editor();
        let (id, _) = editor.add_layer(LayerKind::Text, "x");

        editor.begin_resize(&id, (0, 0), (200, 50));
        editor.pointer_move((14, 0), true);
        let layer = editor.layer(&id).unwrap();
        assert_eq!((layer.w, layer.h), (Some(210), Some(50)));
    }

    #[test]
    fn test_nudge_clamps_to_canvas() {
        let mut editor = editor();
        let (id, _) = editor.add_layer(LayerKind::Text, "x");
        editor
            .update_layer(&id, &LayerPatch { x: Some(5), ..LayerPatch::default() })
            .unwrap();

        assert_eq!(editor.nudge(Nudge::Left, true), Some(SaveTiming::Debounced));
        assert_eq!(editor.layer(&id).unwrap().x, 0);
        editor.nudge(Nudge::Right, false);
        assert_eq!(editor.layer(&id).unwrap().x, 1);
    }

    #[test]
    fn test_bring_to_front_and_remove() {
        let mut editor = editor();
        let (a, _) = editor.add_layer(LayerKind::Text, "a");
        let (b, _) = editor.add_layer(LayerKind::Text, "b");

        editor.bring_to_front(&a);
        assert!(editor.layer(&a).unwrap().z > editor.layer(&b).unwrap().z);

        assert_eq!(editor.remove_layer(&a), Some(SaveTiming::Commit));
        assert_eq!(editor.remove_layer(&a), None);
        assert_eq!(editor.selected(), Some(b.as_str()));
    }

    #[test]
    fn test_bring_to_front_at_max_z_stays_on_top() {
        let mut editor = editor();
        let mut top = Layer::new("top", LayerKind::Text, "");
        top.z = i32::MAX;
        editor.load(SceneDocument::new(vec![top, Layer::new("low", LayerKind::Text, "")], 1));

        editor.bring_to_front("low");
        assert_eq!(editor.layer("low").unwrap().z, i32::MAX);
        let (id, _) = editor.add_layer(LayerKind::Image, "/x.png");
        assert_eq!(editor.layer(&id).unwrap().z, i32::MAX);
        assert_eq!(editor.layer("top").unwrap().z, i32::MAX);
    }

    #[test]
    fn test_write_carries_meta_and_version() {
        let mut editor = editor();
        editor.load(SceneDocument::new(vec![Layer::new("a", LayerKind::Text, "x")], 4));
        let write = editor.to_write(1234);

        assert_eq!(write.items.len(), 1);
        assert_eq!(write.meta.source.as_deref(), Some(WRITE_SOURCE));
        assert_eq!(write.meta.known_version, 4);
        assert_eq!(write.meta.client_ts, 1234);

        editor.adopt_version(9);
        assert_eq!(editor.to_write(0).meta.known_version, 9);
    }

    #[test]
    fn test_remote_remove_ends_gesture() {
        let mut editor = editor();
        editor.load(SceneDocument::new(vec![Layer::new("a", LayerKind::Text, "x")], 1));
        editor.begin_move("a", (0, 0));

        editor.apply_remote(ChangeEvent::Remove("a".into()));
        assert!(editor.gesture().is_none());
        assert!(editor.selected().is_none());
        assert_eq!(editor.pointer_move((10, 10), false), None);
    }
}
