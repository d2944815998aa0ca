//! Persisted per-account capability knowledge.
//!
//! Each account's [`SearchCapabilities`] is written through the kv boundary
//! as a versioned binary envelope. On load, a schema mismatch or corrupt
//! payload silently discards the record and the account starts from
//! `Unknown` again. Records are never aged out; only explicit account
//! removal deletes them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::kv::{now_secs, KvStore};
use crate::constants::CAPABILITY_KEY_PREFIX;
use crate::models::{SearchCapabilities, SearchScope};

/// Increment when the serialized shape of [`SearchCapabilities`] changes
/// incompatibly. Old envelopes are discarded, not migrated.
pub const CAPABILITY_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope {
    schema_version: u32,
    /// Unix seconds when this record was written. Diagnostic only.
    saved_at: u64,
    capabilities: SearchCapabilities,
}

pub struct CapabilityStore {
    kv: Arc<dyn KvStore>,
    by_account: HashMap<String, SearchCapabilities>,
}

impl CapabilityStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            by_account: HashMap::new(),
        }
    }

    pub fn get(&self, account_id: &str) -> Option<&SearchCapabilities> {
        self.by_account.get(account_id)
    }

    /// Record one observed search outcome for an account, creating the
    /// record on first query, and persist the result.
    pub fn record_outcome(
        &mut self,
        account_id: &str,
        instance_domain: &str,
        scope: SearchScope,
        has_results: bool,
        has_other_results: bool,
        now: DateTime<Utc>,
    ) -> &SearchCapabilities {
        let mut caps = match self.by_account.remove(account_id) {
            Some(caps) => caps,
            None => self
                .load_account(account_id)
                .unwrap_or_else(|| SearchCapabilities::new(instance_domain, now)),
        };
        caps.apply_outcome(scope, has_results, has_other_results, now);
        self.persist_account(account_id, &caps);
        &*self.by_account.entry(account_id.to_string()).or_insert(caps)
    }

    /// Record whether the backend serves trends, learned from an
    /// out-of-band probe rather than a search outcome.
    pub fn set_trends_support(
        &mut self,
        account_id: &str,
        instance_domain: &str,
        supported: bool,
        now: DateTime<Utc>,
    ) {
        let mut caps = match self.by_account.remove(account_id) {
            Some(caps) => caps,
            None => self
                .load_account(account_id)
                .unwrap_or_else(|| SearchCapabilities::new(instance_domain, now)),
        };
        caps.supports_trends = supported;
        caps.last_checked = now;
        self.persist_account(account_id, &caps);
        self.by_account.insert(account_id.to_string(), caps);
    }

    pub fn should_show_status_search_warning(&self, account_id: &str) -> bool {
        self.by_account
            .get(account_id)
            .map(|c| c.should_show_status_search_warning())
            .unwrap_or(false)
    }

    /// Load an account's record from the kv boundary if one survives
    /// version and corruption checks.
    pub fn load_account(&self, account_id: &str) -> Option<SearchCapabilities> {
        let bytes = self.kv.load(&key_for(account_id))?;
        let envelope: Envelope = match bincode::deserialize(&bytes) {
            Ok(envelope) => envelope,
            Err(_) => {
                info!(account = account_id, "capability record corrupt — discarding");
                return None;
            }
        };
        if envelope.schema_version != CAPABILITY_SCHEMA_VERSION {
            info!(
                account = account_id,
                cached = envelope.schema_version,
                current = CAPABILITY_SCHEMA_VERSION,
                "capability record schema mismatch — discarding"
            );
            return None;
        }
        Some(envelope.capabilities)
    }

    /// Drop an account's record everywhere (explicit account removal).
    pub fn remove_account(&mut self, account_id: &str) {
        self.by_account.remove(account_id);
        self.kv.remove(&key_for(account_id));
    }

    fn persist_account(&self, account_id: &str, capabilities: &SearchCapabilities) {
        let envelope = Envelope {
            schema_version: CAPABILITY_SCHEMA_VERSION,
            saved_at: now_secs(),
            capabilities: capabilities.clone(),
        };
        let bytes = match bincode::serialize(&envelope) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(account = account_id, %err, "failed to encode capability record");
                return;
            }
        };
        if let Err(err) = self.kv.save(&key_for(account_id), &bytes) {
            warn!(account = account_id, %err, "failed to persist capability record");
        }
    }
}

fn key_for(account_id: &str) -> String {
    format!("{CAPABILITY_KEY_PREFIX}{account_id}")
}
