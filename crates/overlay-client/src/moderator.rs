//! Moderator side: optimistic local edits written back through a debounced,
//! coalescing saver.
//!
//! The saver is a small actor. Every edit rearms its timer; when the timer
//! fires the whole local document is written. While a write is in flight,
//! further fires only mark the single pending slot, so a burst of edits costs
//! at most two writes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use overlay_core::ChangeEvent;
use overlay_core::editor::{EditorState, SaveDecision, SaveQueue, SaveTiming};
use overlay_proto::{SceneDocument, ServerMessage, WriteAck};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::config::EditorConfig;
use crate::error::ClientError;
use crate::http::SceneWriter;
use crate::overlay::now_ms;
use crate::transport::TransportEvent;

type InFlight = BoxFuture<'static, Result<WriteAck, ClientError>>;

/// Handle to the saver actor.
#[derive(Clone)]
pub struct SaverHandle {
    tx: mpsc::UnboundedSender<SaveTiming>,
    /// Requests sent but not yet seen by the actor.
    queued: Arc<AtomicUsize>,
    busy: watch::Receiver<bool>,
}

impl SaverHandle {
    pub fn schedule(&self, timing: SaveTiming) {
        self.queued.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(timing).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("Saver stopped, edit will not be written");
        }
    }

    /// A save is scheduled or in flight.
    pub fn is_busy(&self) -> bool {
        self.queued.load(Ordering::SeqCst) > 0 || *self.busy.borrow()
    }

    /// Wait until nothing is scheduled or in flight.
    pub async fn idle(&self) {
        let mut busy = self.busy.clone();
        while self.is_busy() {
            if busy.changed().await.is_err() {
                return;
            }
        }
    }
}

pub fn spawn_saver(
    editor: Arc<Mutex<EditorState>>,
    writer: Arc<dyn SceneWriter>,
    config: &EditorConfig,
) -> SaverHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let queued = Arc::new(AtomicUsize::new(0));
    let (busy_tx, busy) = watch::channel(false);

    tokio::spawn(saver_loop(
        editor,
        writer,
        Delays {
            debounce: config.debounce,
            commit: config.commit_delay,
        },
        rx,
        Arc::clone(&queued),
        busy_tx,
    ));

    SaverHandle { tx, queued, busy }
}

#[derive(Debug, Clone, Copy)]
struct Delays {
    debounce: Duration,
    commit: Duration,
}

impl Delays {
    fn of(self, timing: SaveTiming) -> Duration {
        match timing {
            SaveTiming::Commit => self.commit,
            SaveTiming::Debounced => self.debounce,
            SaveTiming::Flush => Duration::ZERO,
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn finish(write: &mut Option<InFlight>) -> Result<WriteAck, ClientError> {
    match write {
        Some(write) => write.await,
        None => std::future::pending().await,
    }
}

fn start_write(editor: &Mutex<EditorState>, writer: &Arc<dyn SceneWriter>) -> InFlight {
    let body = editor.lock().to_write(now_ms());
    tracing::debug!(
        items = body.items.len(),
        known_version = body.meta.known_version,
        "Saving scene"
    );
    let writer = Arc::clone(writer);
    async move { writer.write(body).await }.boxed()
}

async fn saver_loop(
    editor: Arc<Mutex<EditorState>>,
    writer: Arc<dyn SceneWriter>,
    delays: Delays,
    mut rx: mpsc::UnboundedReceiver<SaveTiming>,
    queued: Arc<AtomicUsize>,
    busy: watch::Sender<bool>,
) {
    let mut queue = SaveQueue::new();
    let mut deadline: Option<Instant> = None;
    let mut write: Option<InFlight> = None;
    let mut closed = false;

    loop {
        tokio::select! {
            timing = rx.recv(), if !closed => match timing {
                Some(timing) => {
                    deadline = match timing {
                        // Only hurries a save that is already scheduled.
                        SaveTiming::Flush => deadline.map(|_| Instant::now()),
                        timing => Some(Instant::now() + delays.of(timing)),
                    };
                    // Publish busy before the request stops counting as queued.
                    let _ = busy.send(deadline.is_some() || !queue.is_idle());
                    queued.fetch_sub(1, Ordering::SeqCst);
                }
                None => {
                    closed = true;
                    if deadline.is_some() {
                        deadline = Some(Instant::now());
                    }
                }
            },
            () = until(deadline) => {
                deadline = None;
                if queue.request() == SaveDecision::Start {
                    write = Some(start_write(&editor, &writer));
                }
            }
            result = finish(&mut write) => {
                match result {
                    Ok(ack) => {
                        tracing::debug!(version = ack.version, "Scene saved");
                        editor.lock().adopt_version(ack.version);
                    }
                    Err(err) => tracing::warn!(%err, "Scene save failed"),
                }
                write = queue.complete().then(|| start_write(&editor, &writer));
            }
        }

        let _ = busy.send(deadline.is_some() || !queue.is_idle());
        if closed && deadline.is_none() && write.is_none() {
            break;
        }
    }
}

/// Moderator editing session over a shared local document.
pub struct ModeratorSession {
    editor: Arc<Mutex<EditorState>>,
    saver: SaverHandle,
}

impl ModeratorSession {
    pub fn new(config: &EditorConfig, writer: Arc<dyn SceneWriter>) -> Self {
        let editor = Arc::new(Mutex::new(EditorState::new(config.canvas, config.snap)));
        let saver = spawn_saver(Arc::clone(&editor), writer, config);
        Self { editor, saver }
    }

    pub fn load(&self, doc: SceneDocument) {
        self.editor.lock().load(doc);
    }

    /// Run an edit against the local document and schedule the save it asks
    /// for. The save is queued before the lock is released, so a remote event
    /// never sees the edit without also seeing the saver busy.
    pub fn edit(&self, f: impl FnOnce(&mut EditorState) -> Option<SaveTiming>) {
        let mut editor = self.editor.lock();
        if let Some(timing) = f(&mut editor) {
            self.saver.schedule(timing);
        }
    }

    /// Read the local document.
    pub fn read<R>(&self, f: impl FnOnce(&EditorState) -> R) -> R {
        f(&self.editor.lock())
    }

    pub fn saver(&self) -> &SaverHandle {
        &self.saver
    }

    /// Write any scheduled edit now and wait for it to land.
    pub async fn flush(&self) {
        self.saver.schedule(SaveTiming::Flush);
        self.saver.idle().await;
    }

    pub fn handle(&self, event: TransportEvent) {
        let change = match event {
            TransportEvent::Message { message, .. } => match ChangeEvent::from_server(message) {
                Ok(change) => change,
                Err(ServerMessage::PresetSaved { name }) => {
                    tracing::info!(name, "Preset saved");
                    return;
                }
                Err(other) => {
                    tracing::debug!(kind = other.tag(), "Ignoring non-scene message");
                    return;
                }
            },
            TransportEvent::Polled { doc, .. } => ChangeEvent::from_polled(doc),
            TransportEvent::Connected { .. } | TransportEvent::Disconnected { .. } => return,
        };

        let mut editor = self.editor.lock();
        if self.saver.is_busy() {
            tracing::debug!(event = change.name(), "Local save pending, skipping remote event");
            return;
        }
        editor.apply_remote(change);
    }
}
