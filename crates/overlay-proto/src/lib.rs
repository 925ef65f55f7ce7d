//! Overlay-Live wire protocol
//!
//! JSON messages exchanged between the scene authority, moderator panels and
//! overlay renderers. Every message is an object with a `type` discriminator;
//! decoding goes through [`ServerMessage::decode`] / [`ClientCommand::decode`]
//! so that unknown tags surface as a typed error instead of a silent mismatch.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod layer;
pub mod message;
pub mod rest;

pub use command::ClientCommand;
pub use layer::{DEFAULT_TIMER_FORMAT, Layer, LayerKind, LayerPatch, SceneDocument, TimerSpec};
pub use message::{ServerMessage, Transition, TtsSpeak};
pub use rest::{MetricsSnapshot, PresetList, SceneWrite, WriteAck, WriteMeta};

use serde::de::DeserializeOwned;

/// Errors produced while decoding a wire message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("message has no `type` discriminator")]
    MissingType,

    #[error("unknown message type: '{0}'")]
    UnknownType(String),
}

/// Decode a `type`-tagged JSON object, rejecting tags outside `known`.
fn decode_tagged<T: DeserializeOwned>(text: &str, known: &[&str]) -> Result<T, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let tag = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    if !known.contains(&tag) {
        return Err(ProtocolError::UnknownType(tag.to_string()));
    }

    Ok(serde_json::from_value(value)?)
}
