//! Presentation backends that only log, for running an overlay without a
//! display.

use overlay_core::{MediaHost, MediaKind, PlaybackError, PlaybackFlags, PresentationSurface, VisualNode};
use overlay_proto::{Transition, TtsSpeak};

#[derive(Debug, Default)]
pub struct LogSurface {
    renders: u64,
}

impl PresentationSurface for LogSurface {
    fn render_visual(&mut self, nodes: &[VisualNode], transition: Option<&Transition>) {
        self.renders += 1;
        tracing::info!(
            render = self.renders,
            layers = nodes.len(),
            transition = ?transition,
            "Render"
        );
        for node in nodes {
            tracing::debug!(id = %node.id, x = node.x, y = node.y, z = node.z, content = ?node.content, "Layer");
        }
    }

    fn set_timer_text(&mut self, id: &str, text: &str) {
        tracing::info!(id, text, "Timer");
    }

    fn speak(&mut self, request: &TtsSpeak) {
        tracing::info!(text = %request.text, lang = %request.lang, "Speak");
    }
}

#[derive(Debug, Default)]
pub struct LogMediaHost;

impl MediaHost for LogMediaHost {
    type Handle = String;

    fn create(&mut self, id: &str, url: &str, kind: MediaKind, flags: PlaybackFlags) -> String {
        tracing::info!(id, url, kind = ?kind, looping = flags.looping, volume = flags.volume, "Media created");
        id.to_string()
    }

    fn play(&mut self, handle: &mut String) -> Result<(), PlaybackError> {
        tracing::info!(id = %handle, "Media playing");
        Ok(())
    }

    fn set_flags(&mut self, handle: &mut String, flags: PlaybackFlags) {
        tracing::info!(id = %handle, looping = flags.looping, volume = flags.volume, muted = flags.muted, "Media flags");
    }

    fn release(&mut self, handle: String) {
        tracing::info!(id = %handle, "Media stopped");
    }
}
