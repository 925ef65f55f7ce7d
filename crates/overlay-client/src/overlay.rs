//! Overlay subscriber: transport events → applier → projector → media.

use std::time::Duration;

use overlay_core::{
    ApplyOutcome, ChangeEvent, CountdownBoard, DeltaApplier, MediaHost, MediaReconciler,
    PresentationSurface, RenderProjector,
};
use overlay_proto::{ClientCommand, Layer, ServerMessage};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::OverlayConfig;
use crate::transport::{Transport, TransportEvent};

pub struct OverlaySession<S, H: MediaHost> {
    applier: DeltaApplier,
    projector: RenderProjector,
    media: MediaReconciler<H>,
    countdowns: CountdownBoard,
    surface: S,
    epoch: u64,
}

impl<S: PresentationSurface, H: MediaHost> OverlaySession<S, H> {
    pub fn new(config: &OverlayConfig, surface: S, host: H) -> Self {
        Self {
            applier: DeltaApplier::new(),
            projector: RenderProjector::new(config.origin.clone()),
            media: MediaReconciler::new(host),
            countdowns: CountdownBoard::new(),
            surface,
            epoch: 0,
        }
    }

    pub fn items(&self) -> &[Layer] {
        self.applier.items()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn media(&self) -> &MediaReconciler<H> {
        &self.media
    }

    /// Handle one transport event. Returns the telemetry ack to send, if the
    /// event applied a strictly newer scene version.
    pub fn handle(&mut self, event: TransportEvent, now_ms: i64) -> Option<ClientCommand> {
        match event {
            TransportEvent::Connected { epoch } => {
                tracing::debug!(epoch, "Awaiting snapshot for new epoch");
                self.epoch = epoch;
                None
            }
            TransportEvent::Disconnected { epoch } => {
                tracing::info!(epoch, "Stream lost, polling until reconnected");
                None
            }
            TransportEvent::Message { epoch, .. } | TransportEvent::Polled { epoch, .. }
                if epoch < self.epoch =>
            {
                tracing::debug!(epoch, current = self.epoch, "Dropping event from a previous epoch");
                None
            }
            TransportEvent::Message { message, .. } => match ChangeEvent::from_server(message) {
                Ok(change) => self.apply(change, now_ms),
                Err(ServerMessage::TtsSpeak(request)) => {
                    self.surface.speak(&request);
                    None
                }
                Err(other) => {
                    tracing::debug!(kind = other.tag(), "Ignoring non-scene message");
                    None
                }
            },
            TransportEvent::Polled { doc, .. } => self.apply(ChangeEvent::from_polled(doc), now_ms),
        }
    }

    fn apply(&mut self, change: ChangeEvent, now_ms: i64) -> Option<ClientCommand> {
        let kind = change.name();
        let outcome = self.applier.apply(change);

        let mut transition = None;
        let mut ack = None;
        match &outcome {
            ApplyOutcome::Snapshot {
                report,
                transition: requested,
            } => {
                self.projector.reset();
                self.countdowns.reset(self.applier.items());
                transition.clone_from(requested);
                ack = report.map(|report| ClientCommand::OverlayAck {
                    version: report.version,
                    server_ts: report.server_ts,
                    applied_ts: now_ms,
                });
            }
            ApplyOutcome::Upserted { id, .. } => {
                if let Some(layer) = self.applier.store().get(id) {
                    self.countdowns.sync_layer(layer);
                }
            }
            ApplyOutcome::Removed { id, .. } => {
                self.countdowns.cancel(id);
            }
            ApplyOutcome::Cleared => self.countdowns.cancel_all(),
            ApplyOutcome::NotSynced => return None,
        }
        if !outcome.touched() {
            return ack;
        }

        let projection = self
            .projector
            .project(self.applier.items(), &mut self.surface, transition.as_ref());
        let summary = self.media.reconcile(&projection.media);
        if projection.rendered {
            self.countdowns.refresh();
        }
        self.tick(now_ms);

        tracing::debug!(
            event = kind,
            layers = self.applier.items().len(),
            rendered = projection.rendered,
            started = summary.started,
            stopped = summary.stopped,
            "Applied"
        );
        ack
    }

    /// Push changed countdown texts to the surface.
    pub fn tick(&mut self, now_ms: i64) -> usize {
        let frames = self.countdowns.tick(now_ms);
        for frame in &frames {
            self.surface.set_timer_text(&frame.id, &frame.text);
        }
        frames.len()
    }

    /// A user gesture happened on the presentation side.
    pub fn user_interaction(&mut self) -> usize {
        self.media.unlock_autoplay()
    }

    /// Drive the session until the transport goes away.
    pub async fn run(
        mut self,
        mut transport: Transport,
        tick: Duration,
        mut interactions: mpsc::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = transport.recv() => {
                    let Some(event) = event else { break };
                    if let Some(ack) = self.handle(event, now_ms()) {
                        transport.commands.send(ack);
                    }
                }
                _ = ticker.tick() => {
                    self.tick(now_ms());
                }
                Some(()) = interactions.recv() => {
                    let retried = self.user_interaction();
                    if retried > 0 {
                        tracing::info!(retried, "Autoplay unlocked");
                    }
                }
            }
        }

        self.media.stop_all();
    }
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
