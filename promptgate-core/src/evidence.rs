//! Evidence store: a bounded, append-only log of policy outcomes.
//!
//! The store keeps a monotonic count of everything ever appended and a ring
//! buffer with the most recent [`RECENT_WINDOW`] records. Both live behind one
//! mutex, so an append and its count update are a single step and readers
//! never observe a half-written record.
//!
//! Evidence is in-process only and lost on restart.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::PromptGateError;

/// Number of records returned by [`EvidenceStore::recent`].
pub const RECENT_WINDOW: usize = 100;

/// Record kind written by the gateway after a successful route.
pub const GATEWAY_LOG_KIND: &str = "gateway_log";

/// One compliance evidence entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Origin tag, e.g. `gateway_log`.
    pub kind: String,
    /// Verdict string, when the record is about a decision.
    #[serde(default)]
    pub decision: Option<String>,
}

impl EvidenceRecord {
    /// A record with a kind and optional decision.
    pub fn new(kind: impl Into<String>, decision: Option<String>) -> Self {
        Self {
            kind: kind.into(),
            decision,
        }
    }
}

/// Destination for evidence records.
#[async_trait]
pub trait EvidenceSink: Send + Sync {
    /// Append a record and return the total number of records ever appended.
    ///
    /// # Errors
    ///
    /// Remote sinks return an upstream error when the store is unavailable.
    async fn append(&self, record: EvidenceRecord) -> Result<u64, PromptGateError>;
}

struct Ring {
    records: VecDeque<EvidenceRecord>,
    total: u64,
}

/// In-process evidence store.
pub struct EvidenceStore {
    inner: Mutex<Ring>,
    capacity: usize,
}

impl EvidenceStore {
    /// An empty store retaining the last [`RECENT_WINDOW`] records.
    pub fn new() -> Self {
        Self::with_capacity(RECENT_WINDOW)
    }

    /// An empty store retaining the last `capacity` records (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Ring {
                records: VecDeque::with_capacity(capacity),
                total: 0,
            }),
            capacity,
        }
    }

    /// Append a record, evicting the oldest retained one when full.
    ///
    /// Returns the total count including this record.
    pub fn push(&self, record: EvidenceRecord) -> u64 {
        let mut ring = self.inner.lock();
        if ring.records.len() == self.capacity {
            ring.records.pop_front();
        }
        ring.records.push_back(record);
        ring.total += 1;
        ring.total
    }

    /// The retained records, oldest first.
    pub fn recent(&self) -> Vec<EvidenceRecord> {
        self.inner.lock().records.iter().cloned().collect()
    }

    /// Total number of records ever appended.
    pub fn count(&self) -> u64 {
        self.inner.lock().total
    }
}

impl Default for EvidenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EvidenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceStore")
            .field("capacity", &self.capacity)
            .field("count", &self.count())
            .finish()
    }
}

#[async_trait]
impl EvidenceSink for EvidenceStore {
    async fn append(&self, record: EvidenceRecord) -> Result<u64, PromptGateError> {
        Ok(self.push(record))
    }
}
