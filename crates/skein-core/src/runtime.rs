//! Single-writer engine facade.
//!
//! Fetch collaborators complete in any order and hand the engine discrete,
//! already-resolved batches; every merge is a read-modify-write over the
//! whole timeline, so all engine state sits behind one mutex. Because the
//! merge itself is commutative and idempotent, serialization order among
//! concurrent completions does not change the final state.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::CoreConfig;
use crate::models::{PostActionState, PostId, RelationshipState, SavedSearch, SearchCapabilities, SearchScope};
use crate::platforms::{self, NativePost, Platform};
use crate::store::{
    ActionStateTable, CapabilityStore, FileKvStore, KvStore, MemoryPreviewCache, PreviewCache,
    PreviewMetadata, SavedSearchStore, ScrollInstruction, TimelineEntry, TimelineState,
};
use crate::streaming::{Delivery, EventFanIn, UnifiedChatEvent};

/// Opaque pagination state for one (platform, account) feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageInfo {
    pub has_next_page: bool,
    /// Backend-defined token; the engine never interprets it.
    pub next_page_token: Option<String>,
}

/// A completed fetch round handed to the engine by a network collaborator.
#[derive(Debug)]
pub struct FetchBatch {
    pub platform: Platform,
    pub account_id: String,
    /// Fetch round this batch belongs to; see [`Engine::begin_fetch_round`].
    pub generation: u64,
    pub posts: Vec<NativePost>,
    pub page: PageInfo,
}

#[derive(Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    Merged {
        scroll: ScrollInstruction,
        merged: usize,
        /// Malformed items skipped without aborting the batch.
        skipped: usize,
    },
    /// The batch carried a superseded generation and was not applied.
    DiscardedStale,
}

struct EngineState {
    timeline: TimelineState,
    actions: ActionStateTable,
    capabilities: CapabilityStore,
    saved_searches: SavedSearchStore,
    relationships: HashMap<String, RelationshipState>,
    fan_in: EventFanIn,
    pages: HashMap<(Platform, String), PageInfo>,
    generation: u64,
    discarded_batches: u64,
}

pub struct Engine {
    state: Mutex<EngineState>,
    previews: Arc<dyn PreviewCache>,
}

impl Engine {
    pub fn new(kv: Arc<dyn KvStore>, previews: Arc<dyn PreviewCache>) -> Self {
        Self {
            state: Mutex::new(EngineState {
                timeline: TimelineState::new(),
                actions: ActionStateTable::new(),
                capabilities: CapabilityStore::new(kv.clone()),
                saved_searches: SavedSearchStore::new(kv),
                relationships: HashMap::new(),
                fan_in: EventFanIn::new(),
                pages: HashMap::new(),
                generation: 0,
                discarded_batches: 0,
            }),
            previews,
        }
    }

    /// File-backed persistence under `config.data_dir`, in-memory previews.
    pub fn with_config(config: &CoreConfig) -> Result<Self> {
        let kv = Arc::new(FileKvStore::new(&config.data_dir)?);
        Ok(Self::new(kv, Arc::new(MemoryPreviewCache::new())))
    }

    // ===== Fetch rounds =====

    /// Start a new fetch round. Batches tagged with an older generation are
    /// discarded on arrival; merging them would be safe, but their content
    /// is already superseded.
    pub fn begin_fetch_round(&self) -> u64 {
        let mut state = self.state.lock();
        state.generation += 1;
        state.generation
    }

    /// Fold one completed batch into the timeline. Malformed items are
    /// skipped with a warning; the rest of the batch still merges.
    pub fn apply_batch(&self, batch: FetchBatch, preserve_position: bool) -> BatchOutcome {
        let observed_at = Utc::now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if batch.generation < state.generation {
            state.discarded_batches += 1;
            debug!(
                platform = %batch.platform,
                account = %batch.account_id,
                generation = batch.generation,
                current = state.generation,
                "discarding superseded fetch batch"
            );
            return BatchOutcome::DiscardedStale;
        }

        let mut entries = Vec::with_capacity(batch.posts.len());
        let mut skipped = 0usize;
        for native in &batch.posts {
            match platforms::to_entry(native, &batch.account_id) {
                Ok(entry) => {
                    if let Ok(snapshot) = platforms::engagement(native, &batch.account_id, observed_at) {
                        state.actions.apply(snapshot);
                    }
                    entries.push(entry);
                }
                Err(err) => {
                    skipped += 1;
                    warn!(platform = %native.platform(), %err, "skipping malformed post");
                }
            }
        }

        let merged = entries.len();
        let scroll = state.timeline.merge(entries, preserve_position);
        state
            .pages
            .insert((batch.platform, batch.account_id), batch.page);

        BatchOutcome::Merged {
            scroll,
            merged,
            skipped,
        }
    }

    pub fn page_info(&self, platform: Platform, account_id: &str) -> Option<PageInfo> {
        self.state
            .lock()
            .pages
            .get(&(platform, account_id.to_string()))
            .cloned()
    }

    /// Batches discarded for carrying a superseded generation.
    pub fn discarded_batches(&self) -> u64 {
        self.state.lock().discarded_batches
    }

    // ===== Timeline reads & read-state =====

    pub fn timeline_entries(&self) -> Vec<TimelineEntry> {
        self.state.lock().timeline.entries().to_vec()
    }

    pub fn entry(&self, id: &PostId) -> Option<TimelineEntry> {
        self.state.lock().timeline.entry(id).cloned()
    }

    pub fn unread_count(&self) -> usize {
        self.state.lock().timeline.unread_count()
    }

    pub fn mark_read(&self, id: &PostId) {
        self.state.lock().timeline.mark_read(id);
    }

    pub fn mark_all_read(&self) {
        self.state.lock().timeline.mark_all_read();
    }

    pub fn save_scroll_position(&self, id: PostId) {
        self.state.lock().timeline.save_scroll_position(id);
    }

    pub fn restore_scroll_position(&self) -> Option<PostId> {
        self.state.lock().timeline.restore_scroll_position().cloned()
    }

    /// Entries matching a `+`-separated multi-term query.
    pub fn filter_timeline(&self, query: &str) -> Vec<TimelineEntry> {
        self.state
            .lock()
            .timeline
            .filter(query)
            .into_iter()
            .cloned()
            .collect()
    }

    // ===== Engagement =====

    pub fn action_state(&self, id: &PostId) -> Option<PostActionState> {
        self.state.lock().actions.get(id).cloned()
    }

    /// Apply an authoritative engagement snapshot (e.g. from a detail
    /// refresh) through the reconcile path.
    pub fn apply_action_snapshot(&self, snapshot: PostActionState) -> PostActionState {
        self.state.lock().actions.apply(snapshot)
    }

    /// Optimistic like toggle. Returns `None` for an identity the engine has
    /// never seen (no action state and no timeline entry).
    pub fn toggle_like(&self, id: &PostId) -> Option<PostActionState> {
        let now = Utc::now();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let current = Self::current_action_state(state, id, now)?;
        Some(state.actions.apply(current.toggled_like(now)))
    }

    /// Optimistic repost toggle, same rules as [`Self::toggle_like`].
    pub fn toggle_repost(&self, id: &PostId) -> Option<PostActionState> {
        let now = Utc::now();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let current = Self::current_action_state(state, id, now)?;
        Some(state.actions.apply(current.toggled_repost(now)))
    }

    fn current_action_state(
        state: &EngineState,
        id: &PostId,
        now: chrono::DateTime<Utc>,
    ) -> Option<PostActionState> {
        if let Some(current) = state.actions.get(id) {
            return Some(current.clone());
        }
        let platform = state.timeline.entry(id)?.post.platform;
        Some(PostActionState::empty(id.clone(), platform, now))
    }

    /// Engagement snapshots dropped for being older than the stored one.
    pub fn stale_suppressed(&self) -> u64 {
        self.state.lock().actions.stale_suppressed()
    }

    // ===== Search capability learning =====

    /// Report the outcome of an executed search back to the learning state
    /// machine.
    pub fn record_search_outcome(
        &self,
        account_id: &str,
        instance_domain: &str,
        scope: SearchScope,
        has_results: bool,
        has_other_results: bool,
    ) -> SearchCapabilities {
        self.state
            .lock()
            .capabilities
            .record_outcome(
                account_id,
                instance_domain,
                scope,
                has_results,
                has_other_results,
                Utc::now(),
            )
            .clone()
    }

    pub fn should_show_status_search_warning(&self, account_id: &str) -> bool {
        self.state
            .lock()
            .capabilities
            .should_show_status_search_warning(account_id)
    }

    pub fn record_trends_support(&self, account_id: &str, instance_domain: &str, supported: bool) {
        self.state.lock().capabilities.set_trends_support(
            account_id,
            instance_domain,
            supported,
            Utc::now(),
        );
    }

    pub fn capabilities(&self, account_id: &str) -> Option<SearchCapabilities> {
        self.state.lock().capabilities.get(account_id).cloned()
    }

    pub fn remove_account(&self, account_id: &str) {
        self.state.lock().capabilities.remove_account(account_id);
    }

    // ===== Saved searches =====

    pub fn save_search(&self, account_id: &str, query: &str, scope: SearchScope) {
        self.state.lock().saved_searches.add(account_id, query, scope);
    }

    pub fn remove_saved_search(&self, account_id: &str, query: &str, scope: SearchScope) {
        self.state
            .lock()
            .saved_searches
            .remove(account_id, query, scope);
    }

    pub fn saved_searches(&self, account_id: &str) -> Vec<SavedSearch> {
        self.state.lock().saved_searches.searches(account_id).to_vec()
    }

    // ===== Relationships =====

    /// Store a relationship snapshot fetched from a backend. Wholesale
    /// replacement; the engine never computes these flags.
    pub fn update_relationship(&self, actor_id: &str, relationship: RelationshipState) {
        self.state
            .lock()
            .relationships
            .insert(actor_id.to_string(), relationship);
    }

    pub fn relationship(&self, actor_id: &str) -> Option<RelationshipState> {
        self.state.lock().relationships.get(actor_id).copied()
    }

    // ===== Live chat events =====

    pub fn handle_chat_event(&self, event: UnifiedChatEvent) -> Delivery {
        self.state.lock().fan_in.apply(event)
    }

    pub fn conversation_events(&self, conversation_id: &str) -> Vec<UnifiedChatEvent> {
        self.state.lock().fan_in.events(conversation_id).to_vec()
    }

    // ===== Link previews =====

    pub fn preview(&self, url: &str) -> Option<PreviewMetadata> {
        self.previews.get(url)
    }

    pub fn store_preview(&self, url: &str, metadata: PreviewMetadata) {
        self.previews.put(url, metadata);
    }

    pub fn invalidate_preview(&self, url: &str) {
        self.previews.invalidate(url);
    }
}
