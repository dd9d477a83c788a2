//! Single-slot, time-to-live content cache.
//!
//! The cache holds at most one snapshot: the full normalized listing plus the
//! folder and category counts computed by the same refresh. A snapshot is
//! replaced wholesale, never merged. The only in-place change allowed is
//! filling in one summary's lazily fetched document.
//!
//! Refreshes are serialized through [`ContentCache::refresh_guard`] so that
//! concurrent misses wait for one in-flight refresh instead of each hitting
//! upstream. A failed refresh is recorded as well, so the requests that were
//! queued behind it get the same error instead of retrying one by one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::IndexError;
use crate::model::{CategoryCounts, FolderCounts, WorkflowSummary};

#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub workflows: Vec<WorkflowSummary>,
    pub structure: FolderCounts,
    pub categories: CategoryCounts,
    pub populated_at: Instant,
    pub populated_wall: DateTime<Utc>,
}

impl CacheSnapshot {
    pub fn age(&self) -> Duration {
        self.populated_at.elapsed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Empty,
    Fresh,
    Stale,
}

pub struct ContentCache {
    ttl: Duration,
    slot: RwLock<Option<CacheSnapshot>>,
    refresh_gate: Mutex<()>,
    attempts: AtomicU64,
    last_failure: RwLock<Option<IndexError>>,
}

impl ContentCache {
    pub fn new(ttl: Duration) -> Self {
        ContentCache {
            ttl,
            slot: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            attempts: AtomicU64::new(0),
            last_failure: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_snapshot_fresh(&self, snapshot: &CacheSnapshot) -> bool {
        snapshot.age() < self.ttl
    }

    /// Current snapshot, fresh or stale.
    pub async fn get(&self) -> Option<CacheSnapshot> {
        self.slot.read().await.clone()
    }

    /// Current snapshot only if it is still within the TTL.
    pub async fn get_fresh(&self) -> Option<CacheSnapshot> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|snapshot| self.is_snapshot_fresh(snapshot))
            .cloned()
    }

    pub async fn is_fresh(&self) -> bool {
        let slot = self.slot.read().await;
        slot.as_ref().is_some_and(|s| self.is_snapshot_fresh(s))
    }

    pub async fn status(&self) -> CacheStatus {
        match self.slot.read().await.as_ref() {
            None => CacheStatus::Empty,
            Some(s) if self.is_snapshot_fresh(s) => CacheStatus::Fresh,
            Some(_) => CacheStatus::Stale,
        }
    }

    pub async fn age(&self) -> Option<Duration> {
        self.slot.read().await.as_ref().map(CacheSnapshot::age)
    }

    /// Number of cached summaries, 0 when empty.
    pub async fn len(&self) -> usize {
        self.slot
            .read()
            .await
            .as_ref()
            .map(|s| s.workflows.len())
            .unwrap_or(0)
    }

    /// Swaps in a new snapshot and restarts the TTL.
    pub async fn replace(
        &self,
        workflows: Vec<WorkflowSummary>,
        structure: FolderCounts,
        categories: CategoryCounts,
    ) -> CacheSnapshot {
        let snapshot = CacheSnapshot {
            workflows,
            structure,
            categories,
            populated_at: Instant::now(),
            populated_wall: Utc::now(),
        };
        info!(workflows = snapshot.workflows.len(), "Replaced cache snapshot");
        *self.slot.write().await = Some(snapshot.clone());
        *self.last_failure.write().await = None;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        snapshot
    }

    /// Records a refresh that produced no snapshot. The slot is left untouched.
    pub async fn record_failure(&self, error: &IndexError) {
        *self.last_failure.write().await = Some(error.clone());
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    /// Completed refresh attempts, successful or not.
    pub fn refresh_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Error of the latest refresh attempt, `None` if it succeeded.
    pub async fn last_failure(&self) -> Option<IndexError> {
        self.last_failure.read().await.clone()
    }

    /// Back to the never-populated state. Idempotent.
    pub async fn clear(&self) {
        let previous = self.slot.write().await.take();
        *self.last_failure.write().await = None;
        info!(
            had_snapshot = previous.is_some(),
            "Cleared content cache"
        );
    }

    pub async fn find(&self, filename: &str) -> Option<WorkflowSummary> {
        self.slot
            .read()
            .await
            .as_ref()
            .and_then(|s| s.workflows.iter().find(|w| w.filename == filename))
            .cloned()
    }

    /// Mutates the cached summary for `filename` in place and returns the
    /// updated copy. `None` when the cache no longer holds that filename.
    pub async fn update_workflow<F>(&self, filename: &str, update: F) -> Option<WorkflowSummary>
    where
        F: FnOnce(&mut WorkflowSummary),
    {
        let mut slot = self.slot.write().await;
        let summary = slot
            .as_mut()?
            .workflows
            .iter_mut()
            .find(|w| w.filename == filename)?;
        update(summary);
        debug!(filename, "Updated cached workflow in place");
        Some(summary.clone())
    }

    /// Held for the duration of a refresh; concurrent misses queue on it.
    pub async fn refresh_guard(&self) -> MutexGuard<'_, ()> {
        self.refresh_gate.lock().await
    }
}
