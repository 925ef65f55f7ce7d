//! Commands sent to the authority over the moderator/overlay channel.

use serde::{Deserialize, Serialize};

use crate::layer::LayerPatch;
use crate::message::Transition;
use crate::{ProtocolError, decode_tagged};

/// Fire-and-forget commands. No acknowledgement is sent back beyond the
/// broadcast that an accepted command produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    #[serde(rename = "add")]
    Add { item: LayerPatch },
    #[serde(rename = "update")]
    Update { item: LayerPatch },
    #[serde(rename = "remove")]
    Remove { id: String },
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "bringToFront")]
    BringToFront { id: String },
    #[serde(rename = "history.undo")]
    HistoryUndo,
    #[serde(rename = "history.redo")]
    HistoryRedo,
    #[serde(rename = "preset.save")]
    PresetSave { name: String },
    #[serde(rename = "preset.load")]
    PresetLoad {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transition: Option<Transition>,
    },
    /// Overlay telemetry: a strictly newer scene version was applied.
    #[serde(rename = "overlay.ack")]
    OverlayAck {
        version: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        server_ts: Option<i64>,
        applied_ts: i64,
    },
}

impl ClientCommand {
    const TAGS: &'static [&'static str] = &[
        "add",
        "update",
        "remove",
        "clear",
        "bringToFront",
        "history.undo",
        "history.redo",
        "preset.save",
        "preset.load",
        "overlay.ack",
    ];

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        decode_tagged(text, Self::TAGS)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ClientCommand::Add { .. } => "add",
            ClientCommand::Update { .. } => "update",
            ClientCommand::Remove { .. } => "remove",
            ClientCommand::Clear => "clear",
            ClientCommand::BringToFront { .. } => "bringToFront",
            ClientCommand::HistoryUndo => "history.undo",
            ClientCommand::HistoryRedo => "history.redo",
            ClientCommand::PresetSave { .. } => "preset.save",
            ClientCommand::PresetLoad { .. } => "preset.load",
            ClientCommand::OverlayAck { .. } => "overlay.ack",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bring_to_front_tag() {
        let text = ClientCommand::BringToFront { id: "a".into() }.encode().unwrap();
        assert_eq!(text, r#"{"type":"bringToFront","id":"a"}"#);
    }

    #[test]
    fn test_decode_partial_update() {
        let cmd = ClientCommand::decode(r#"{"type":"update","item":{"id":"a","x":12}}"#).unwrap();
        let ClientCommand::Update { item } = cmd else {
            panic!("expected update");
        };
        assert_eq!(item.id.as_deref(), Some("a"));
        assert_eq!(item.x, Some(12));
        assert_eq!(item.content, None);
    }

    #[test]
    fn test_decode_preset_load_without_transition() {
        let cmd = ClientCommand::decode(r#"{"type":"preset.load","name":"intro"}"#).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::PresetLoad {
                name: "intro".into(),
                transition: None
            }
        );
    }

    #[test]
    fn test_scene_event_tags_are_not_commands() {
        assert!(matches!(
            ClientCommand::decode(r#"{"type":"scene.clear"}"#),
            Err(ProtocolError::UnknownType(_))
        ));
    }
}
