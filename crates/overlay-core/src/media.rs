//! Media reconciler.
//!
//! Keeps actual audio/video playback in line with the desired set computed from
//! the scene. Entries are keyed by layer id. An entry already playing the same
//! URL is never restarted, whatever else changed; only its loop/volume/mute
//! flags are refreshed. A new URL under a known id is a replace (stop, then
//! start), and an id that disappears is stopped and released.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use overlay_proto::{Layer, LayerKind};

/// Playable media kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn from_layer_kind(kind: LayerKind) -> Option<Self> {
        match kind {
            LayerKind::Audio => Some(MediaKind::Audio),
            LayerKind::Video => Some(MediaKind::Video),
            _ => None,
        }
    }
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "ogv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a", "aac"];

/// Guess the media kind from the URL's file extension, ignoring any query or
/// fragment.
pub fn infer_kind(url: &str) -> Option<MediaKind> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    let (_, ext) = file.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();

    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Audio)
    } else {
        None
    }
}

/// Make `url` absolute against `origin` unless it already is.
pub fn resolve_url(url: &str, origin: Option<&str>) -> String {
    let url = url.trim();
    let Some(origin) = origin else {
        return url.to_string();
    };
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    let origin = origin.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{origin}{url}")
    } else {
        format!("{origin}/{url}")
    }
}

/// Loop/volume/mute flags that can change without restarting playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackFlags {
    pub looping: bool,
    pub volume: f32,
    pub muted: bool,
}

impl Default for PlaybackFlags {
    fn default() -> Self {
        Self {
            looping: true,
            volume: 1.0,
            muted: false,
        }
    }
}

/// One desired media entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSpec {
    pub id: String,
    pub url: String,
    /// Explicit kind. `None` falls back to the URL's extension.
    pub kind: Option<MediaKind>,
    pub flags: PlaybackFlags,
}

impl MediaSpec {
    /// Desired entry for an audio/video layer with a non-empty source.
    pub fn from_layer(layer: &Layer, origin: Option<&str>) -> Option<Self> {
        let kind = MediaKind::from_layer_kind(layer.kind)?;
        if layer.content.trim().is_empty() {
            return None;
        }

        let volume = layer
            .volume
            .filter(|v| v.is_finite())
            .map_or(1.0, |v| v.clamp(0.0, 1.0));

        Some(Self {
            id: layer.id.clone(),
            url: resolve_url(&layer.content, origin),
            kind: Some(kind),
            flags: PlaybackFlags {
                looping: layer.looping.unwrap_or(true),
                volume,
                muted: layer.muted.unwrap_or(false),
            },
        })
    }

    pub fn resolved_kind(&self) -> Option<MediaKind> {
        self.kind.or_else(|| infer_kind(&self.url))
    }
}

/// Errors reported by a media host when starting playback.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("playback blocked by autoplay policy")]
    AutoplayBlocked,

    #[error("media host failed: {0}")]
    Host(String),
}

/// The presentation-side player factory.
pub trait MediaHost {
    type Handle;

    /// Create a player for `url`. The player is not started yet.
    fn create(&mut self, id: &str, url: &str, kind: MediaKind, flags: PlaybackFlags) -> Self::Handle;

    fn play(&mut self, handle: &mut Self::Handle) -> Result<(), PlaybackError>;

    fn set_flags(&mut self, handle: &mut Self::Handle, flags: PlaybackFlags);

    /// Pause and dispose of the player.
    fn release(&mut self, handle: Self::Handle);
}

struct MediaEntry<T> {
    url: String,
    flags: PlaybackFlags,
    handle: T,
}

/// Counts of host operations issued by one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub started: usize,
    pub stopped: usize,
    pub updated: usize,
}

pub struct MediaReconciler<H: MediaHost> {
    host: H,
    playing: BTreeMap<String, MediaEntry<H::Handle>>,
    /// Ids whose play attempt was blocked before autoplay was unlocked.
    pending: BTreeSet<String>,
    unlocked: bool,
}

impl<H: MediaHost> MediaReconciler<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            playing: BTreeMap::new(),
            pending: BTreeSet::new(),
            unlocked: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_playing(&self, id: &str) -> bool {
        self.playing.contains_key(id)
    }

    pub fn playing_url(&self, id: &str) -> Option<&str> {
        self.playing.get(id).map(|entry| entry.url.as_str())
    }

    pub fn playing_count(&self) -> usize {
        self.playing.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn reconcile(&mut self, desired: &[MediaSpec]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        // Last occurrence of an id wins.
        let mut seen = HashSet::new();
        let mut wanted: Vec<&MediaSpec> = desired
            .iter()
            .rev()
            .filter(|spec| seen.insert(spec.id.as_str()))
            .collect();
        wanted.reverse();

        let stale: Vec<String> = self
            .playing
            .keys()
            .filter(|id| !seen.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.stop(&id);
            summary.stopped += 1;
        }

        for spec in wanted {
            if let Some(entry) = self.playing.get_mut(&spec.id) {
                if entry.url == spec.url {
                    if entry.flags != spec.flags {
                        self.host.set_flags(&mut entry.handle, spec.flags);
                        entry.flags = spec.flags;
                        summary.updated += 1;
                    }
                    continue;
                }
                self.stop(&spec.id);
                summary.stopped += 1;
            }

            if self.start(spec) {
                summary.started += 1;
            }
        }

        summary
    }

    fn start(&mut self, spec: &MediaSpec) -> bool {
        let Some(kind) = spec.resolved_kind() else {
            tracing::debug!(id = %spec.id, url = %spec.url, "Unrecognized media kind, skipping");
            return false;
        };

        let mut handle = self.host.create(&spec.id, &spec.url, kind, spec.flags);
        match self.host.play(&mut handle) {
            Ok(()) => {}
            Err(PlaybackError::AutoplayBlocked) if !self.unlocked => {
                tracing::debug!(id = %spec.id, "Autoplay blocked, waiting for user interaction");
                self.pending.insert(spec.id.clone());
            }
            Err(err) => {
                tracing::warn!(id = %spec.id, error = %err, "Media playback failed to start");
            }
        }

        self.playing.insert(
            spec.id.clone(),
            MediaEntry {
                url: spec.url.clone(),
                flags: spec.flags,
                handle,
            },
        );
        true
    }

    /// Stop and release the entry for `id`. Unknown ids are ignored.
    pub fn stop(&mut self, id: &str) {
        self.pending.remove(id);
        if let Some(entry) = self.playing.remove(id) {
            self.host.release(entry.handle);
        }
    }

    pub fn stop_all(&mut self) {
        let ids: Vec<String> = self.playing.keys().cloned().collect();
        for id in ids {
            self.stop(&id);
        }
        self.pending.clear();
    }

    /// Called on any user interaction. The first call retries every blocked
    /// player; later calls do nothing. Returns how many players were retried.
    pub fn unlock_autoplay(&mut self) -> usize {
        if self.unlocked {
            return 0;
        }
        self.unlocked = true;

        let mut retried = 0;
        for id in std::mem::take(&mut self.pending) {
            let Some(entry) = self.playing.get_mut(&id) else {
                continue;
            };
            retried += 1;
            if let Err(err) = self.host.play(&mut entry.handle) {
                tracing::warn!(id = %id, error = %err, "Media still refused to play after unlock");
            }
        }
        retried
    }
}
