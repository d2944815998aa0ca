use std::collections::HashMap;

use tracing::debug;

use crate::models::{reconcile, PostActionState, PostId, ReconcileOutcome};

/// Identity-keyed table of reconciled engagement state.
///
/// Every write, whether an optimistic local mutation or an authoritative
/// server refresh, goes through [`reconcile`], so out-of-order arrivals
/// resolve by one uniform last-writer-wins rule. Suppressed stale overwrites are counted
/// for diagnostics, never raised as errors.
#[derive(Debug, Default)]
pub struct ActionStateTable {
    states: HashMap<PostId, PostActionState>,
    stale_suppressed: u64,
}

impl ActionStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &PostId) -> Option<&PostActionState> {
        self.states.get(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Count of snapshots dropped for being older than the stored one.
    pub fn stale_suppressed(&self) -> u64 {
        self.stale_suppressed
    }

    /// Reconcile one incoming snapshot into the table and return the kept
    /// state.
    pub fn apply(&mut self, incoming: PostActionState) -> PostActionState {
        let id = incoming.id.clone();
        let (kept, outcome) = reconcile(self.states.get(&id), incoming);
        if outcome == ReconcileOutcome::StaleSuppressed {
            self.stale_suppressed += 1;
            debug!(id = %id, suppressed = self.stale_suppressed, "stale engagement snapshot dropped");
        }
        self.states.insert(id, kept.clone());
        kept
    }
}
