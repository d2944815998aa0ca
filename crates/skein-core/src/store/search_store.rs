//! Persisted saved searches, keyed by owning account.
//!
//! Same envelope discipline as the capability store: versioned bincode
//! through the kv boundary, silent discard on mismatch or corruption.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::kv::{now_secs, KvStore};
use crate::constants::SAVED_SEARCH_KEY_PREFIX;
use crate::models::{SavedSearch, SearchScope};

pub const SAVED_SEARCH_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope {
    schema_version: u32,
    saved_at: u64,
    searches: Vec<SavedSearch>,
}

pub struct SavedSearchStore {
    kv: Arc<dyn KvStore>,
    by_account: HashMap<String, Vec<SavedSearch>>,
}

impl SavedSearchStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            by_account: HashMap::new(),
        }
    }

    /// Saved searches for an account, loading from the kv boundary on first
    /// access. Ordered most recent first.
    pub fn searches(&mut self, account_id: &str) -> &[SavedSearch] {
        self.ensure_loaded(account_id);
        self.by_account
            .get(account_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Save a search; the same (query, scope) pair is kept once.
    pub fn add(&mut self, account_id: &str, query: &str, scope: SearchScope) {
        self.ensure_loaded(account_id);
        let searches = self.by_account.entry(account_id.to_string()).or_default();
        if searches.iter().any(|s| s.matches(query, scope)) {
            return;
        }
        let search = SavedSearch::new(account_id, query, scope, now_secs());
        let pos = searches.partition_point(|s| s.created_at > search.created_at);
        searches.insert(pos, search);
        let snapshot = searches.clone();
        self.persist_account(account_id, &snapshot);
    }

    pub fn remove(&mut self, account_id: &str, query: &str, scope: SearchScope) {
        self.ensure_loaded(account_id);
        if let Some(searches) = self.by_account.get_mut(account_id) {
            let before = searches.len();
            searches.retain(|s| !s.matches(query, scope));
            if searches.len() != before {
                let snapshot = searches.clone();
                self.persist_account(account_id, &snapshot);
            }
        }
    }

    fn ensure_loaded(&mut self, account_id: &str) {
        if self.by_account.contains_key(account_id) {
            return;
        }
        let loaded = self.load_account(account_id);
        self.by_account.insert(account_id.to_string(), loaded);
    }

    fn load_account(&self, account_id: &str) -> Vec<SavedSearch> {
        let Some(bytes) = self.kv.load(&key_for(account_id)) else {
            return Vec::new();
        };
        let envelope: Envelope = match bincode::deserialize(&bytes) {
            Ok(envelope) => envelope,
            Err(_) => {
                info!(account = account_id, "saved-search record corrupt — discarding");
                return Vec::new();
            }
        };
        if envelope.schema_version != SAVED_SEARCH_SCHEMA_VERSION {
            info!(
                account = account_id,
                cached = envelope.schema_version,
                current = SAVED_SEARCH_SCHEMA_VERSION,
                "saved-search record schema mismatch — discarding"
            );
            return Vec::new();
        }
        envelope.searches
    }

    fn persist_account(&self, account_id: &str, searches: &[SavedSearch]) {
        let envelope = Envelope {
            schema_version: SAVED_SEARCH_SCHEMA_VERSION,
            saved_at: now_secs(),
            searches: searches.to_vec(),
        };
        let bytes = match bincode::serialize(&envelope) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(account = account_id, %err, "failed to encode saved searches");
                return;
            }
        };
        if let Err(err) = self.kv.save(&key_for(account_id), &bytes) {
            warn!(account = account_id, %err, "failed to persist saved searches");
        }
    }
}

fn key_for(account_id: &str) -> String {
    format!("{SAVED_SEARCH_KEY_PREFIX}{account_id}")
}
