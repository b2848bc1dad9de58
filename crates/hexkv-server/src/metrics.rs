//! Request counters for a node.
//!
//! Four plain atomics owned by the transport state and shared by `Arc` —
//! no registry, no globals. `GET /metrics` returns the JSON snapshot, and
//! the router aggregates these across the cluster.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Node-level request counters.
#[derive(Debug, Default)]
pub struct Metrics {
    exec_total: AtomicU64,
    put_total: AtomicU64,
    del_total: AtomicU64,
    dedup_hits: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one executed write command (put or delete, fresh or retried).
    pub fn inc_exec(&self) {
        self.exec_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_put(&self) {
        self.put_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_del(&self) {
        self.del_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a command answered from the dedup cache.
    pub fn inc_dedup_hit(&self) {
        self.dedup_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            exec_total: self.exec_total.load(Ordering::Relaxed),
            put_total: self.put_total.load(Ordering::Relaxed),
            del_total: self.del_total.load(Ordering::Relaxed),
            dedup_hits: self.dedup_hits.load(Ordering::Relaxed),
        }
    }
}

/// Wire form of the counters, as served by `GET /metrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub exec_total: u64,
    pub put_total: u64,
    pub del_total: u64,
    pub dedup_hits: u64,
}
