//! Messages broadcast by the authority to subscribers.

use serde::{Deserialize, Serialize};

use crate::layer::{Layer, SceneDocument};
use crate::{ProtocolError, decode_tagged};

/// Visual transition hint attached to full snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(rename = "type")]
    pub kind: String,
    pub duration: u32,
}

impl Transition {
    pub fn fade(duration: u32) -> Self {
        Self {
            kind: "fade".to_string(),
            duration,
        }
    }
}

/// Text-to-speech request relayed to overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsSpeak {
    pub text: String,
    #[serde(default = "TtsSpeak::default_lang")]
    pub lang: String,
    #[serde(default = "TtsSpeak::default_unit")]
    pub rate: f32,
    #[serde(default = "TtsSpeak::default_unit")]
    pub pitch: f32,
    #[serde(default = "TtsSpeak::default_unit")]
    pub volume: f32,
    #[serde(default, rename = "voiceName")]
    pub voice_name: String,
}

impl TtsSpeak {
    fn default_lang() -> String {
        "ru-RU".to_string()
    }

    fn default_unit() -> f32 {
        1.0
    }
}

/// Messages received by overlays and moderator panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Complete snapshot; supersedes everything applied before it.
    #[serde(rename = "scene.full")]
    SceneFull {
        scene: SceneDocument,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        server_ts: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transition: Option<Transition>,
    },
    #[serde(rename = "scene.add")]
    SceneAdd { item: Layer },
    /// Full replacement of the addressed layer.
    #[serde(rename = "scene.update")]
    SceneUpdate { item: Layer },
    #[serde(rename = "scene.remove")]
    SceneRemove { id: String },
    #[serde(rename = "scene.clear")]
    SceneClear,
    #[serde(rename = "tts.speak")]
    TtsSpeak(TtsSpeak),
    /// Sent only to the moderator that saved the preset.
    #[serde(rename = "preset.saved")]
    PresetSaved { name: String },
}

impl ServerMessage {
    const TAGS: &'static [&'static str] = &[
        "scene.full",
        "scene.add",
        "scene.update",
        "scene.remove",
        "scene.clear",
        "tts.speak",
        "preset.saved",
    ];

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        decode_tagged(text, Self::TAGS)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Build a full snapshot message for `doc`.
    pub fn full(doc: SceneDocument, server_ts: i64, transition: Option<Transition>) -> Self {
        let version = doc.version;
        ServerMessage::SceneFull {
            scene: doc,
            version: Some(version),
            server_ts: Some(server_ts),
            transition,
        }
    }

    /// Wire tag, for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            ServerMessage::SceneFull { .. } => "scene.full",
            ServerMessage::SceneAdd { .. } => "scene.add",
            ServerMessage::SceneUpdate { .. } => "scene.update",
            ServerMessage::SceneRemove { .. } => "scene.remove",
            ServerMessage::SceneClear => "scene.clear",
            ServerMessage::TtsSpeak(_) => "tts.speak",
            ServerMessage::PresetSaved { .. } => "preset.saved",
        }
    }
}
