//! Change events consumed by the delta applier.

use overlay_proto::{Layer, SceneDocument, ServerMessage, Transition};

/// One scene mutation as seen by a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Full snapshot; supersedes all earlier partial state.
    Full {
        items: Vec<Layer>,
        version: Option<u64>,
        server_ts: Option<i64>,
        transition: Option<Transition>,
    },
    Add(Layer),
    /// Full replacement of the addressed layer.
    Update(Layer),
    Remove(String),
    Clear,
}

impl ChangeEvent {
    /// Split scene events out of the server vocabulary. Non-scene messages are
    /// handed back unchanged.
    pub fn from_server(msg: ServerMessage) -> Result<Self, ServerMessage> {
        match msg {
            ServerMessage::SceneFull {
                scene,
                version,
                server_ts,
                transition,
            } => {
                let version = version.or((scene.version > 0).then_some(scene.version));
                Ok(ChangeEvent::Full {
                    items: scene.items,
                    version,
                    server_ts,
                    transition,
                })
            }
            ServerMessage::SceneAdd { item } => Ok(ChangeEvent::Add(item)),
            ServerMessage::SceneUpdate { item } => Ok(ChangeEvent::Update(item)),
            ServerMessage::SceneRemove { id } => Ok(ChangeEvent::Remove(id)),
            ServerMessage::SceneClear => Ok(ChangeEvent::Clear),
            other @ (ServerMessage::TtsSpeak(_) | ServerMessage::PresetSaved { .. }) => Err(other),
        }
    }

    /// Synthetic snapshot built from a polled document read.
    pub fn from_polled(doc: SceneDocument) -> Self {
        ChangeEvent::Full {
            version: (doc.version > 0).then_some(doc.version),
            items: doc.items,
            server_ts: None,
            transition: None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChangeEvent::Full { .. } => "full",
            ChangeEvent::Add(_) => "add",
            ChangeEvent::Update(_) => "update",
            ChangeEvent::Remove(_) => "remove",
            ChangeEvent::Clear => "clear",
        }
    }
}
