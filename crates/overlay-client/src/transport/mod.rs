//! Auto-reconnecting event channel to the authority.
//!
//! One background task keeps a WebSocket open, reconnecting after a fixed
//! backoff whenever it drops. Each successful connection is a new epoch; the
//! authority pushes a fresh `scene.full` on every connect, so nothing is
//! stitched across epochs. While the socket is down a second task polls the
//! full document and feeds it in as a synthetic snapshot.

mod poll;
mod session;

use std::sync::Arc;

use overlay_proto::{ClientCommand, LayerPatch, SceneDocument, ServerMessage, Transition};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::{Role, TransportConfig};
use crate::http::SceneSource;

pub use poll::poll_while_down;

/// What the transport delivers to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected { epoch: u64 },
    Disconnected { epoch: u64 },
    Message { epoch: u64, message: ServerMessage },
    /// Document read by the polling fallback. `epoch` is the last epoch the
    /// socket had when the poll started.
    Polled { epoch: u64, doc: SceneDocument },
}

/// Socket state shared between the connector and the poller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Link {
    pub up: bool,
    pub epoch: u64,
}

impl Link {
    pub fn up(epoch: u64) -> Self {
        Self { up: true, epoch }
    }

    pub fn down(epoch: u64) -> Self {
        Self { up: false, epoch }
    }
}

/// Fire-and-forget command sender. Commands issued while the socket is down
/// are dropped.
#[derive(Debug, Clone)]
pub struct CommandEmitter {
    tx: mpsc::UnboundedSender<ClientCommand>,
}

impl CommandEmitter {
    pub fn new(tx: mpsc::UnboundedSender<ClientCommand>) -> Self {
        Self { tx }
    }

    /// Returns `false` once the transport has shut down.
    pub fn send(&self, command: ClientCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn add(&self, item: LayerPatch) -> bool {
        self.send(ClientCommand::Add { item })
    }

    pub fn update(&self, item: LayerPatch) -> bool {
        self.send(ClientCommand::Update { item })
    }

    pub fn remove(&self, id: impl Into<String>) -> bool {
        self.send(ClientCommand::Remove { id: id.into() })
    }

    pub fn clear(&self) -> bool {
        self.send(ClientCommand::Clear)
    }

    pub fn bring_to_front(&self, id: impl Into<String>) -> bool {
        self.send(ClientCommand::BringToFront { id: id.into() })
    }

    pub fn undo(&self) -> bool {
        self.send(ClientCommand::HistoryUndo)
    }

    pub fn redo(&self) -> bool {
        self.send(ClientCommand::HistoryRedo)
    }

    pub fn preset_save(&self, name: impl Into<String>) -> bool {
        self.send(ClientCommand::PresetSave { name: name.into() })
    }

    pub fn preset_load(&self, name: impl Into<String>, transition: Option<Transition>) -> bool {
        self.send(ClientCommand::PresetLoad {
            name: name.into(),
            transition,
        })
    }
}

/// Running transport. Dropping it stops both background tasks.
pub struct Transport {
    pub events: mpsc::Receiver<TransportEvent>,
    pub commands: CommandEmitter,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Transport {
    pub fn spawn(config: TransportConfig, role: Role, source: Arc<dyn SceneSource>) -> Self {
        let (event_tx, events) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (link_tx, link_rx) = watch::channel(Link::default());

        let connect = tokio::spawn(session::connect_loop(
            config.clone(),
            role,
            event_tx.clone(),
            command_rx,
            link_tx,
            shutdown_rx.clone(),
        ));
        let poll = tokio::spawn(poll_while_down(
            source,
            config.poll_interval,
            link_rx,
            event_tx,
            shutdown_rx,
        ));

        Self {
            events,
            commands: CommandEmitter::new(command_tx),
            shutdown,
            tasks: vec![connect, poll],
        }
    }

    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
        for task in &self.tasks {
            task.abort();
        }
    }
}
