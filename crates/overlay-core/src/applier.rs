//! Delta applier: replays change events onto a subscriber's scene store.
//!
//! The applier starts `Uninitialized` and becomes `Synced` on the first full
//! snapshot. Only a snapshot is accepted before that. Every transition is
//! idempotent under re-delivery: adds of an existing id update it, updates of
//! a missing id create it, removes of a missing id do nothing.
//!
//! The version watermark is observational. Deltas carry no version, so it never
//! gates application; it only decides whether a snapshot is worth reporting.

use overlay_proto::{Layer, Transition};

use crate::event::ChangeEvent;
use crate::store::SceneStore;

/// Applier lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Uninitialized,
    Synced,
}

/// Telemetry emitted when a strictly newer version is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionReport {
    pub version: u64,
    pub server_ts: Option<i64>,
}

/// What applying one event did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The whole document was replaced. Derived render state must be reset.
    Snapshot {
        report: Option<VersionReport>,
        transition: Option<Transition>,
    },
    Upserted {
        id: String,
        created: bool,
    },
    Removed {
        id: String,
        existed: bool,
    },
    Cleared,
    /// A delta arrived before the first snapshot and was dropped.
    NotSynced,
}

impl ApplyOutcome {
    /// Whether the document may have changed.
    pub fn touched(&self) -> bool {
        match self {
            ApplyOutcome::Snapshot { .. } | ApplyOutcome::Upserted { .. } | ApplyOutcome::Cleared => {
                true
            }
            ApplyOutcome::Removed { existed, .. } => *existed,
            ApplyOutcome::NotSynced => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeltaApplier {
    store: SceneStore,
    state: SyncState,
    watermark: Option<u64>,
}

impl DeltaApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    pub fn items(&self) -> &[Layer] {
        self.store.items()
    }

    /// Last version reported through telemetry.
    pub fn watermark(&self) -> Option<u64> {
        self.watermark
    }

    pub fn apply(&mut self, event: ChangeEvent) -> ApplyOutcome {
        if self.state == SyncState::Uninitialized && !matches!(event, ChangeEvent::Full { .. }) {
            tracing::debug!(event = event.name(), "Dropping delta received before first snapshot");
            return ApplyOutcome::NotSynced;
        }

        match event {
            ChangeEvent::Full {
                items,
                version,
                server_ts,
                transition,
            } => {
                self.store.replace_all(items);
                self.state = SyncState::Synced;
                let report = version.and_then(|version| self.advance_watermark(version, server_ts));
                ApplyOutcome::Snapshot { report, transition }
            }
            ChangeEvent::Add(item) | ChangeEvent::Update(item) => {
                let id = item.id.clone();
                let created = self.store.upsert(item);
                if created {
                    tracing::trace!(id = %id, "Layer created");
                }
                ApplyOutcome::Upserted { id, created }
            }
            ChangeEvent::Remove(id) => {
                let existed = self.store.remove(&id).is_some();
                if !existed {
                    tracing::trace!(id = %id, "Remove for unknown layer ignored");
                }
                ApplyOutcome::Removed { id, existed }
            }
            ChangeEvent::Clear => {
                self.store.clear();
                ApplyOutcome::Cleared
            }
        }
    }

    fn advance_watermark(&mut self, version: u64, server_ts: Option<i64>) -> Option<VersionReport> {
        if self.watermark.is_some_and(|seen| version <= seen) {
            return None;
        }
        self.watermark = Some(version);
        Some(VersionReport { version, server_ts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_proto::LayerKind;

    fn layer(id: &str, content: &str) -> Layer {
        Layer::new(id, LayerKind::Text, content)
    }

    fn full(items: Vec<Layer>, version: Option<u64>) -> ChangeEvent {
        ChangeEvent::Full {
            items,
            version,
            server_ts: Some(1),
            transition: None,
        }
    }

    fn synced() -> DeltaApplier {
        let mut applier = DeltaApplier::new();
        applier.apply(full(Vec::new(), None));
        applier
    }

    #[test]
    fn test_deltas_before_snapshot_are_dropped() {
        let mut applier = DeltaApplier::new();
        assert_eq!(applier.apply(ChangeEvent::Add(layer("a", ""))), ApplyOutcome::NotSynced);
        assert_eq!(applier.apply(ChangeEvent::Clear), ApplyOutcome::NotSynced);
        assert_eq!(applier.state(), SyncState::Uninitialized);
        assert!(applier.items().is_empty());

        applier.apply(full(vec![layer("b", "")], Some(1)));
        assert_eq!(applier.state(), SyncState::Synced);
        assert_eq!(applier.items().len(), 1);
    }

    #[test]
    fn test_duplicate_add_yields_one_layer() {
        let mut applier = synced();
        applier.apply(ChangeEvent::Add(layer("a", "x")));
        let outcome = applier.apply(ChangeEvent::Add(layer("a", "x")));

        assert_eq!(
            outcome,
            ApplyOutcome::Upserted {
                id: "a".into(),
                created: false
            }
        );
        assert_eq!(applier.items().len(), 1);
    }

    #[test]
    fn test_update_after_remove_self_heals() {
        let mut applier = synced();
        applier.apply(ChangeEvent::Add(layer("a", "v1")));
        applier.apply(ChangeEvent::Remove("a".into()));
        let outcome = applier.apply(ChangeEvent::Update(layer("a", "v2")));

        assert_eq!(
            outcome,
            ApplyOutcome::Upserted {
                id: "a".into(),
                created: true
            }
        );
        assert_eq!(applier.store().get("a").unwrap().content, "v2");
    }

    #[test]
    fn test_update_then_remove_follows_delivery_order() {
        let mut applier = synced();
        applier.apply(ChangeEvent::Update(layer("a", "v1")));
        applier.apply(ChangeEvent::Remove("a".into()));
        assert!(applier.store().get("a").is_none());

        // A late duplicate remove is harmless.
        let outcome = applier.apply(ChangeEvent::Remove("a".into()));
        assert_eq!(
            outcome,
            ApplyOutcome::Removed {
                id: "a".into(),
                existed: false
            }
        );
        assert!(!outcome.touched());
    }

    #[test]
    fn test_every_transition_is_idempotent() {
        let events = vec![
            full(vec![layer("a", "1"), layer("b", "2")], Some(3)),
            ChangeEvent::Add(layer("c", "3")),
            ChangeEvent::Update(layer("a", "changed")),
            ChangeEvent::Remove("b".into()),
            ChangeEvent::Clear,
        ];

        for event in events {
            let mut once = synced();
            once.apply(ChangeEvent::Add(layer("b", "seed")));
            let mut twice = once.clone();

            once.apply(event.clone());
            twice.apply(event.clone());
            twice.apply(event);

            assert_eq!(once.store(), twice.store());
        }
    }

    #[test]
    fn test_snapshot_supersedes_prior_state() {
        let mut applier = synced();
        applier.apply(ChangeEvent::Add(layer("stale", "")));
        applier.apply(ChangeEvent::Add(layer("x", "old")));

        let snapshot = vec![layer("x", "new"), layer("y", "")];
        applier.apply(full(snapshot.clone(), Some(8)));

        assert_eq!(applier.store().snapshot(), snapshot);
    }

    #[test]
    fn test_watermark_reports_only_newer_versions() {
        let mut applier = DeltaApplier::new();

        let ApplyOutcome::Snapshot { report, .. } = applier.apply(full(Vec::new(), Some(5))) else {
            panic!("expected snapshot");
        };
        assert_eq!(report.map(|r| r.version), Some(5));

        // Duplicate and older versions still apply but are not reported.
        let ApplyOutcome::Snapshot { report, .. } =
            applier.apply(full(vec![layer("a", "")], Some(5)))
        else {
            panic!("expected snapshot");
        };
        assert!(report.is_none());
        assert_eq!(applier.items().len(), 1);

        let ApplyOutcome::Snapshot { report, .. } = applier.apply(full(Vec::new(), Some(4))) else {
            panic!("expected snapshot");
        };
        assert!(report.is_none());
        assert!(applier.items().is_empty());

        let ApplyOutcome::Snapshot { report, .. } = applier.apply(full(Vec::new(), Some(6))) else {
            panic!("expected snapshot");
        };
        assert_eq!(report.map(|r| r.version), Some(6));
        assert_eq!(applier.watermark(), Some(6));
    }

    #[test]
    fn test_clear_empties_store() {
        let mut applier = synced();
        applier.apply(ChangeEvent::Add(layer("a", "")));
        assert_eq!(applier.apply(ChangeEvent::Clear), ApplyOutcome::Cleared);
        assert!(applier.items().is_empty());
        assert_eq!(applier.state(), SyncState::Synced);
    }
}
