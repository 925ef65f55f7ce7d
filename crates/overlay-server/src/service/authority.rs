//! The authoritative scene document.
//!
//! Every mutation happens under one write lock, and its broadcast is sent
//! before the lock is released, so subscribers see events in exactly the
//! order the mutations were applied.

use std::sync::Arc;

use overlay_core::SceneStore;
use overlay_proto::{
    ClientCommand, Layer, LayerKind, LayerPatch, MetricsSnapshot, SceneDocument, SceneWrite,
    ServerMessage, Transition, WriteAck,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use super::history::History;
use super::metrics::Metrics;
use super::presets::PresetStore;
use crate::error::AuthorityError;

/// Transition attached to undo/redo snapshots.
pub const HISTORY_FADE_MS: u32 = 120;
/// Transition used by `preset.load` when none is requested.
pub const PRESET_FADE_MS: u32 = 250;

const BROADCAST_CAPACITY: usize = 256;

/// Encoded message shared by every subscriber.
pub type Outbound = Arc<str>;

struct SceneState {
    store: SceneStore,
    version: u64,
    history: History,
    presets: PresetStore,
}

pub struct SceneAuthority {
    state: RwLock<SceneState>,
    metrics: Mutex<Metrics>,
    hub: broadcast::Sender<Outbound>,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Random 12 hex character layer id.
fn new_layer_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

/// Layer built from an `add` command, with every absent field defaulted.
fn layer_from_add(patch: &LayerPatch) -> Layer {
    let id = patch.id.clone().filter(|id| !id.is_empty()).unwrap_or_else(new_layer_id);
    let mut layer = Layer::new(id, LayerKind::Text, "");
    layer.x = 100;
    layer.y = 100;
    layer.w = Some(600);
    layer.h = Some(0);
    layer.color = Some("#ffffff".to_string());
    layer.bg = Some("transparent".to_string());
    layer.font_size = Some(40);
    layer.z = 1;
    layer.apply_patch(patch);
    layer
}

impl SceneAuthority {
    pub fn new(history_limit: usize) -> Self {
        let (hub, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            state: RwLock::new(SceneState {
                store: SceneStore::new(),
                version: 0,
                history: History::new(history_limit),
                presets: PresetStore::new(),
            }),
            metrics: Mutex::new(Metrics::new()),
            hub,
        }
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    pub fn document(&self) -> SceneDocument {
        let state = self.state.read();
        SceneDocument::new(state.store.snapshot(), state.version)
    }

    /// Snapshot for a new subscriber plus its event feed. Taken under one
    /// lock so nothing falls between the two.
    pub fn subscribe(&self) -> (ServerMessage, broadcast::Receiver<Outbound>) {
        let state = self.state.read();
        let full = ServerMessage::full(
            SceneDocument::new(state.store.snapshot(), state.version),
            now_ms(),
            None,
        );
        (full, self.hub.subscribe())
    }

    pub fn preset_names(&self) -> Vec<String> {
        self.state.read().presets.names()
    }

    pub fn preset(&self, name: &str) -> Result<SceneDocument, AuthorityError> {
        let items = self.state.read().presets.load(name)?;
        Ok(SceneDocument::new(items, 0))
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        let version = self.version();
        self.metrics.lock().snapshot(version)
    }

    pub fn record_ack(&self, version: u64, server_ts: Option<i64>, applied_ts: i64) {
        tracing::trace!(version, ?server_ts, applied_ts, "Overlay applied version");
        self.metrics.lock().record_ack(server_ts, applied_ts);
    }

    fn publish(&self, message: &ServerMessage) {
        match message.encode() {
            Ok(text) => {
                self.metrics.lock().record_broadcast();
                // No receivers is not an error.
                let _ = self.hub.send(Arc::from(text));
            }
            Err(err) => tracing::error!(%err, kind = message.tag(), "Failed to encode broadcast"),
        }
    }

    /// Bump the version and broadcast, still under the caller's write lock.
    fn commit(&self, state: &mut SceneState, message: &ServerMessage) {
        state.version += 1;
        tracing::debug!(
            version = state.version,
            kind = message.tag(),
            undo = state.history.undo_len(),
            redo = state.history.redo_len(),
            "Scene changed"
        );
        self.publish(message);
    }

    fn commit_full(&self, state: &mut SceneState, transition: Option<Transition>) {
        state.version += 1;
        let message = ServerMessage::full(
            SceneDocument::new(state.store.snapshot(), state.version),
            now_ms(),
            transition,
        );
        tracing::debug!(version = state.version, items = state.store.len(), "Scene replaced");
        self.publish(&message);
    }

    /// Replace the whole document. Always succeeds; a stale `known_version`
    /// is only logged.
    pub fn write_scene(&self, write: SceneWrite) -> WriteAck {
        let mut state = self.state.write();
        if write.meta.known_version != state.version {
            tracing::info!(
                known_version = write.meta.known_version,
                version = state.version,
                source = write.meta.source.as_deref().unwrap_or("unknown"),
                "Scene write based on a stale version"
            );
        }
        let before = state.store.snapshot();
        state.history.push(before);
        state.store.replace_all(write.items);
        self.commit_full(&mut state, None);
        WriteAck {
            version: state.version,
        }
    }

    /// Apply one command. Returns a reply addressed only to the sender.
    pub fn handle_command(
        &self,
        command: ClientCommand,
    ) -> Result<Option<ServerMessage>, AuthorityError> {
        if let ClientCommand::OverlayAck {
            version,
            server_ts,
            applied_ts,
        } = command
        {
            self.record_ack(version, server_ts, applied_ts);
            return Ok(None);
        }

        let mut guard = self.state.write();
        let state = &mut *guard;

        match command {
            ClientCommand::Add { item } => {
                let layer = layer_from_add(&item);
                state.history.push(state.store.snapshot());
                state.store.upsert(layer.clone());
                self.commit(state, &ServerMessage::SceneAdd { item: layer });
            }
            ClientCommand::Update { item } => {
                let Some(id) = item.id.clone() else {
                    return Ok(None);
                };
                let before = state.store.snapshot();
                let Some(layer) = state.store.get_mut(&id) else {
                    return Err(AuthorityError::LayerNotFound(id));
                };
                layer.apply_patch(&item);
                let merged = layer.clone();
                state.history.push(before);
                self.commit(state, &ServerMessage::SceneUpdate { item: merged });
            }
            ClientCommand::Remove { id } => {
                let before = state.store.snapshot();
                if state.store.remove(&id).is_some() {
                    state.history.push(before);
                    self.commit(state, &ServerMessage::SceneRemove { id });
                }
            }
            ClientCommand::Clear => {
                state.history.push(state.store.snapshot());
                state.store.clear();
                self.commit(state, &ServerMessage::SceneClear);
            }
            ClientCommand::BringToFront { id } => {
                let before = state.store.snapshot();
                let top = state.store.next_z();
                let Some(layer) = state.store.get_mut(&id) else {
                    return Err(AuthorityError::LayerNotFound(id));
                };
                layer.z = top;
                let raised = layer.clone();
                state.history.push(before);
                self.commit(state, &ServerMessage::SceneUpdate { item: raised });
            }
            ClientCommand::HistoryUndo => {
                if let Some(previous) = state.history.undo(state.store.snapshot()) {
                    state.store.replace_all(previous);
                    self.commit_full(state, Some(Transition::fade(HISTORY_FADE_MS)));
                }
            }
            ClientCommand::HistoryRedo => {
                if let Some(next) = state.history.redo(state.store.snapshot()) {
                    state.store.replace_all(next);
                    self.commit_full(state, Some(Transition::fade(HISTORY_FADE_MS)));
                }
            }
            ClientCommand::PresetSave { name } => {
                let items = state.store.snapshot();
                let name = state.presets.save(&name, items)?;
                tracing::info!(name, "Preset saved");
                return Ok(Some(ServerMessage::PresetSaved { name }));
            }
            ClientCommand::PresetLoad { name, transition } => {
                let items = state.presets.load(&name)?;
                state.history.push(state.store.snapshot());
                state.store.replace_all(items);
                let transition = transition.unwrap_or_else(|| Transition::fade(PRESET_FADE_MS));
                self.commit_full(state, Some(transition));
            }
            ClientCommand::OverlayAck { .. } => {}
        }
        Ok(None)
    }
}
