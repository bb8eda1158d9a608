//! Reconciled state management.
//!
//! The current `Snapshot` is replaced wholesale, never patched. Every
//! reconciliation pass takes a ticket when it starts; a pass that finishes
//! after a newer one has already published is discarded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tweak_common::{
    category_scores, compute_score, Category, CategoryScore, ReconciledTweak, Risk,
};

/// One complete reconciliation result
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Ticket of the pass that produced this snapshot; 0 before the first pass
    pub generation: u64,
    pub taken_at: DateTime<Utc>,
    /// Catalog order
    pub tweaks: Vec<ReconciledTweak>,
    /// Score derived from `tweaks`
    pub score: u8,
}

impl Snapshot {
    pub fn new(generation: u64, tweaks: Vec<ReconciledTweak>) -> Self {
        let score = compute_score(&tweaks);
        Self {
            generation,
            taken_at: Utc::now(),
            tweaks,
            score,
        }
    }

    /// State before anything was probed
    pub fn empty() -> Self {
        Self::new(0, Vec::new())
    }

    pub fn get(&self, id: &str) -> Option<&ReconciledTweak> {
        self.tweaks.iter().find(|t| t.id() == id)
    }

    /// Tweaks whose key or service exists
    pub fn available(&self) -> Vec<&ReconciledTweak> {
        self.tweaks.iter().filter(|t| t.exists).collect()
    }

    /// Tweaks excluded from scoring because the probe found nothing
    pub fn unavailable(&self) -> Vec<&ReconciledTweak> {
        self.tweaks.iter().filter(|t| !t.exists).collect()
    }

    pub fn enabled_count(&self) -> usize {
        self.tweaks.iter().filter(|t| t.exists && t.is_enabled).count()
    }

    pub fn filter(&self, category: Option<Category>, risk: Option<Risk>) -> Vec<&ReconciledTweak> {
        self.tweaks
            .iter()
            .filter(|t| category.map_or(true, |c| t.descriptor.category == c))
            .filter(|t| risk.map_or(true, |r| t.descriptor.risk == r))
            .collect()
    }

    pub fn category_scores(&self) -> Vec<CategoryScore> {
        category_scores(&self.tweaks)
    }
}

/// Single shared snapshot with last-started-wins publishing
pub struct SharedSnapshot {
    current: RwLock<Arc<Snapshot>>,
    next_ticket: AtomicU64,
}

impl SharedSnapshot {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Ticket for a pass that is about to start. Strictly increasing.
    pub fn issue_ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the current snapshot unless a newer pass already published.
    /// Returns whether `snapshot` became current.
    pub async fn publish(&self, snapshot: Snapshot) -> bool {
        let mut current = self.current.write().await;
        if snapshot.generation <= current.generation {
            return false;
        }
        *current = Arc::new(snapshot);
        true
    }

    pub async fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read().await)
    }
}

impl Default for SharedSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
