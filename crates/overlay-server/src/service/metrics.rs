use std::collections::VecDeque;

use overlay_proto::MetricsSnapshot;

/// Apply latencies kept for the realtime metrics.
pub const LATENCY_WINDOW: usize = 200;

/// Broadcast counter and a sliding window of overlay apply latencies.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    latencies_ms: VecDeque<i64>,
    broadcasts: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_broadcast(&mut self) {
        self.broadcasts += 1;
    }

    /// Record one overlay ack. Acks without a server timestamp carry no
    /// latency; negative values from clock skew count as zero.
    pub fn record_ack(&mut self, server_ts: Option<i64>, applied_ts: i64) {
        let Some(server_ts) = server_ts else {
            return;
        };
        self.latencies_ms
            .push_back(applied_ts.saturating_sub(server_ts).max(0));
        while self.latencies_ms.len() > LATENCY_WINDOW {
            self.latencies_ms.pop_front();
        }
    }

    pub fn snapshot(&self, scene_version: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            scene_version,
            overlay_apply_latency_avg_ms: self.average(),
            overlay_apply_latency_p95_ms: self.p95(),
            ws_broadcasts: self.broadcasts,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn average(&self) -> Option<f64> {
        if self.latencies_ms.is_empty() {
            return None;
        }
        let sum = self
            .latencies_ms
            .iter()
            .fold(0i64, |sum, latency| sum.saturating_add(*latency));
        let avg = sum as f64 / self.latencies_ms.len() as f64;
        Some((avg * 10.0).round() / 10.0)
    }

    fn p95(&self) -> Option<i64> {
        if self.latencies_ms.is_empty() {
            return None;
        }
        let mut sorted: Vec<i64> = self.latencies_ms.iter().copied().collect();
        sorted.sort_unstable();
        let rank = (sorted.len() * 95).div_ceil(100);
        sorted.get(rank.saturating_sub(1)).copied()
    }
}
