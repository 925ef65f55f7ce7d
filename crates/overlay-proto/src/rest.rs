//! Request/response bodies of the authority's HTTP API.

use serde::{Deserialize, Serialize};

use crate::layer::Layer;

/// Client-side bookkeeping sent along with a full scene write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub client_ts: i64,
    #[serde(default)]
    pub known_version: u64,
}

/// Body of `PUT /api/scene`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneWrite {
    #[serde(default)]
    pub items: Vec<Layer>,
    #[serde(default, rename = "_meta")]
    pub meta: WriteMeta,
}

/// Response of `PUT /api/scene`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteAck {
    pub version: u64,
}

/// Response of `GET /api/presets`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetList {
    pub presets: Vec<String>,
}

/// Response of `GET /api/metrics/realtime`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub scene_version: u64,
    pub overlay_apply_latency_avg_ms: Option<f64>,
    pub overlay_apply_latency_p95_ms: Option<i64>,
    pub ws_broadcasts: u64,
}
