//! Scene layers and the scene document.

use serde::{Deserialize, Serialize};

/// Format used by countdown timers that do not specify one.
pub const DEFAULT_TIMER_FORMAT: &str = "mm:ss";

/// Kind of a scene layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    /// Any kind this build does not know how to render.
    #[serde(other)]
    Unknown,
}

impl LayerKind {
    pub fn is_media(self) -> bool {
        matches!(self, LayerKind::Video | LayerKind::Audio)
    }

    pub fn is_visual(self) -> bool {
        matches!(self, LayerKind::Text | LayerKind::Image)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Text => "text",
            LayerKind::Image => "image",
            LayerKind::Video => "video",
            LayerKind::Audio => "audio",
            LayerKind::Unknown => "unknown",
        }
    }
}

/// Timer attached to a text layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimerSpec {
    Countdown {
        #[serde(rename = "deadlineEpochMs")]
        deadline_epoch_ms: i64,
        #[serde(default = "default_timer_format")]
        format: String,
    },
}

fn default_timer_format() -> String {
    DEFAULT_TIMER_FORMAT.to_string()
}

fn default_z() -> i32 {
    1
}

/// One positioned element of a scene.
///
/// `w`/`h` of `None` or `0` mean the renderer keeps the intrinsic size.
/// `fontSize` is canonical; `font` is accepted when reading older documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: String,
    #[serde(default)]
    pub kind: LayerKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<u32>,
    #[serde(default = "default_z")]
    pub z: i32,
    #[serde(default, alias = "font", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<String>,
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub looping: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerSpec>,
}

impl Layer {
    /// A layer with only the required fields set.
    pub fn new(id: impl Into<String>, kind: LayerKind, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            content: content.into(),
            x: 0,
            y: 0,
            w: None,
            h: None,
            z: default_z(),
            font_size: None,
            color: None,
            bg: None,
            looping: None,
            volume: None,
            muted: None,
            timer: None,
        }
    }

    /// Forced width, if any.
    pub fn width(&self) -> Option<u32> {
        self.w.filter(|w| *w > 0)
    }

    /// Forced height, if any.
    pub fn height(&self) -> Option<u32> {
        self.h.filter(|h| *h > 0)
    }

    /// Overwrite every field present in `patch`. The id is never changed.
    pub fn apply_patch(&mut self, patch: &LayerPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if patch.w.is_some() {
            self.w = patch.w;
        }
        if patch.h.is_some() {
            self.h = patch.h;
        }
        if let Some(z) = patch.z {
            self.z = z;
        }
        if patch.font_size.is_some() {
            self.font_size = patch.font_size;
        }
        if patch.color.is_some() {
            self.color.clone_from(&patch.color);
        }
        if patch.bg.is_some() {
            self.bg.clone_from(&patch.bg);
        }
        if patch.looping.is_some() {
            self.looping = patch.looping;
        }
        if patch.volume.is_some() {
            self.volume = patch.volume;
        }
        if patch.muted.is_some() {
            self.muted = patch.muted;
        }
        if patch.timer.is_some() {
            self.timer.clone_from(&patch.timer);
        }
    }
}

/// A partial layer as sent by editors in `add` and `update` commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<LayerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<i32>,
    #[serde(default, alias = "font", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<String>,
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub looping: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerSpec>,
}

impl From<Layer> for LayerPatch {
    fn from(layer: Layer) -> Self {
        Self {
            id: Some(layer.id),
            kind: Some(layer.kind),
            content: Some(layer.content),
            x: Some(layer.x),
            y: Some(layer.y),
            w: layer.w,
            h: layer.h,
            z: Some(layer.z),
            font_size: layer.font_size,
            color: layer.color,
            bg: layer.bg,
            looping: layer.looping,
            volume: layer.volume,
            muted: layer.muted,
            timer: layer.timer,
        }
    }
}

/// The full ordered collection of layers plus its version counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub items: Vec<Layer>,
    #[serde(default, alias = "_version")]
    pub version: u64,
}

impl SceneDocument {
    pub fn new(items: Vec<Layer>, version: u64) -> Self {
        Self { items, version }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_defaults_from_minimal_json() {
        let layer: Layer = serde_json::from_str(r#"{"id":"a"}"#).unwrap();
        assert_eq!(layer.kind, LayerKind::Text);
        assert_eq!(layer.z, 1);
        assert_eq!(layer.width(), None);
        assert!(layer.timer.is_none());
    }

    #[test]
    fn test_font_alias_reads_into_font_size() {
        let layer: Layer = serde_json::from_str(r#"{"id":"a","font":32}"#).unwrap();
        assert_eq!(layer.font_size, Some(32));

        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(json["fontSize"], 32);
        assert!(json.get("font").is_none());
    }

    #[test]
    fn test_zero_size_means_intrinsic() {
        let layer: Layer = serde_json::from_str(r#"{"id":"a","w":0,"h":120}"#).unwrap();
        assert_eq!(layer.width(), None);
        assert_eq!(layer.height(), Some(120));
    }

    #[test]
    fn test_unknown_kind_is_preserved_as_unknown() {
        let layer: Layer = serde_json::from_str(r#"{"id":"a","kind":"file"}"#).unwrap();
        assert_eq!(layer.kind, LayerKind::Unknown);
    }

    #[test]
    fn test_countdown_timer_wire_shape() {
        let layer: Layer = serde_json::from_str(
            r#"{"id":"t","timer":{"type":"countdown","deadlineEpochMs":1000}}"#,
        )
        .unwrap();
        assert_eq!(
            layer.timer,
            Some(TimerSpec::Countdown {
                deadline_epoch_ms: 1000,
                format: "mm:ss".to_string(),
            })
        );
    }

    #[test]
    fn test_apply_patch_keeps_id_and_absent_fields() {
        let mut layer = Layer::new("a", LayerKind::Text, "hello");
        layer.color = Some("#fff".to_string());

        let patch = LayerPatch {
            id: Some("other".to_string()),
            x: Some(40),
            content: Some("bye".to_string()),
            ..LayerPatch::default()
        };
        layer.apply_patch(&patch);

        assert_eq!(layer.id, "a");
        assert_eq!(layer.x, 40);
        assert_eq!(layer.content, "bye");
        assert_eq!(layer.color.as_deref(), Some("#fff"));
    }

    #[test]
    fn test_document_accepts_legacy_version_key() {
        let doc: SceneDocument = serde_json::from_str(r#"{"items":[],"_version":7}"#).unwrap();
        assert_eq!(doc.version, 7);
    }
}
