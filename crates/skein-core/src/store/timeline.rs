//! The unified timeline and its merge engine.
//!
//! Fetches from independent backends complete at unpredictable times, so the
//! merge must be commutative and idempotent: union by identity, then a full
//! re-sort on the ordering key. Read markers and the scroll anchor survive
//! every merge; a partial incoming batch never deletes entries it does not
//! mention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{PostId, UnifiedPost};
use crate::query;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntryKind {
    Normal,
    Boost { boosted_by: String },
    Reply { parent_id: PostId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Entry identity. Equals the wrapped post's identity except for boosts,
    /// which key by the boost itself so two people boosting one post stay
    /// distinct entries.
    pub id: PostId,
    pub post: UnifiedPost,
    pub kind: EntryKind,
    /// Ordering timestamp, independent of `post.created_at` (a boost is
    /// ordered by when it was boosted).
    pub created_at: DateTime<Utc>,
    /// Owned exclusively by [`TimelineState`]; never reset by a refetch.
    pub is_read: bool,
}

impl TimelineEntry {
    pub fn new(id: PostId, post: UnifiedPost, kind: EntryKind, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            post,
            kind,
            created_at,
            is_read: false,
        }
    }

    /// Plain entry ordered by the post's own timestamp.
    pub fn normal(post: UnifiedPost) -> Self {
        let created_at = post.created_at;
        Self::new(post.id.clone(), post, EntryKind::Normal, created_at)
    }
}

/// What the caller should do with the viewport after a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollInstruction {
    /// Keep this entry at its prior viewport offset.
    PinToAnchor(PostId),
    /// No anchor survives (or none was requested): jump to the top.
    JumpToTop,
}

/// The ordered, deduplicated timeline.
///
/// Ordering key: `created_at` descending, identity string ascending on ties
/// for determinism. `unread_count` is derived and recomputed on every
/// mutation, never stored independently of the entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineState {
    entries: Vec<TimelineEntry>,
    unread_count: usize,
    scroll_anchor_id: Option<PostId>,
    last_known_top_id: Option<PostId>,
}

impl TimelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &PostId) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn last_known_top_id(&self) -> Option<&PostId> {
        self.last_known_top_id.as_ref()
    }

    /// Fold a batch of entries into the timeline.
    ///
    /// When an identity exists on both sides the incoming content replaces
    /// the stored entry (fresher data wins) but the stored `is_read` flag is
    /// copied over; read state is sticky across refetches. Entries absent
    /// from the incoming batch are kept untouched.
    pub fn merge(&mut self, incoming: Vec<TimelineEntry>, preserve_position: bool) -> ScrollInstruction {
        let batch_len = incoming.len();
        let mut added = 0usize;

        for mut entry in incoming {
            match self.entries.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => {
                    entry.is_read = existing.is_read;
                    *existing = entry;
                }
                None => {
                    self.entries.push(entry);
                    added += 1;
                }
            }
        }

        self.sort_entries();
        self.recount_unread();
        self.last_known_top_id = self.entries.first().map(|e| e.id.clone());

        debug!(batch = batch_len, added, total = self.entries.len(), "timeline merge");

        if !preserve_position {
            return ScrollInstruction::JumpToTop;
        }
        match self.scroll_anchor_id.take() {
            Some(anchor) if self.entry(&anchor).is_some() => {
                self.scroll_anchor_id = Some(anchor.clone());
                ScrollInstruction::PinToAnchor(anchor)
            }
            Some(gone) => {
                // Anchor evicted upstream: preserve nothing, drop the anchor.
                debug!(anchor = %gone, "scroll anchor missing after merge");
                ScrollInstruction::JumpToTop
            }
            None => ScrollInstruction::JumpToTop,
        }
    }

    /// Mark one entry read. Idempotent; unknown ids are ignored.
    pub fn mark_read(&mut self, id: &PostId) {
        if let Some(entry) = self.entries.iter_mut().find(|e| &e.id == id) {
            if !entry.is_read {
                entry.is_read = true;
                self.unread_count -= 1;
            }
        }
    }

    /// Mark every entry read. Idempotent.
    pub fn mark_all_read(&mut self) {
        for entry in &mut self.entries {
            entry.is_read = true;
        }
        self.unread_count = 0;
    }

    /// Pin the viewport to `id` across future merges. Set unconditionally,
    /// even for an identity not currently present, so the position can be
    /// restored once a later merge reintroduces it.
    pub fn save_scroll_position(&mut self, id: PostId) {
        self.scroll_anchor_id = Some(id);
    }

    /// The saved anchor, verbatim.
    pub fn restore_scroll_position(&self) -> Option<&PostId> {
        self.scroll_anchor_id.as_ref()
    }

    /// Entries matching a `+`-separated multi-term query.
    pub fn filter(&self, raw_query: &str) -> Vec<&TimelineEntry> {
        let terms = query::parse_terms(raw_query);
        self.entries
            .iter()
            .filter(|e| query::entry_matches(e, &terms))
            .collect()
    }

    fn sort_entries(&mut self) {
        self.entries
            .sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    }

    fn recount_unread(&mut self) {
        self.unread_count = self.entries.iter().filter(|e| !e.is_read).count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Author;
    use crate::platforms::Platform;
    use chrono::TimeZone;

    fn post(native_id: &str, secs: i64) -> UnifiedPost {
        UnifiedPost {
            id: PostId::new(Platform::Mastodon, "acct", native_id),
            author: Author {
                display_name: "Someone".into(),
                handle: "someone@social.example".into(),
                avatar_url: None,
            },
            body: format!("post {native_id}"),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            platform: Platform::Mastodon,
            origin_url: None,
            attachments: vec![],
            mentions: vec![],
            tags: vec![],
        }
    }

    fn entry(native_id: &str, secs: i64) -> TimelineEntry {
        TimelineEntry::normal(post(native_id, secs))
    }

    fn ids(state: &TimelineState) -> Vec<&str> {
        state.entries().iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn merge_orders_newest_first_with_identity_tiebreak() {
        let mut state = TimelineState::new();
        state.merge(vec![entry("b", 10), entry("a", 10), entry("c", 20)], false);
        assert_eq!(
            ids(&state),
            vec!["mastodon:acct:c", "mastodon:acct:a", "mastodon:acct:b"]
        );
    }

    #[test]
    fn merge_is_idempotent() {
        let batch = vec![entry("a", 10), entry("b", 5)];
        let mut once = TimelineState::new();
        once.merge(batch.clone(), false);
        let mut twice = once.clone();
        twice.merge(batch, false);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_batches_commute() {
        let b1 = vec![entry("a", 10), entry("b", 5)];
        let b2 = vec![entry("c", 20), entry("d", 1)];

        let mut left = TimelineState::new();
        left.merge(b1.clone(), false);
        left.merge(b2.clone(), false);

        let mut right = TimelineState::new();
        right.merge(b2, false);
        right.merge(b1, false);

        assert_eq!(left, right);
    }

    #[test]
    fn merge_content_freshness_last_writer_wins() {
        // same identity, different content: whichever batch applies last wins
        let mut stale = entry("a", 10);
        stale.post.body = "old body".into();
        let mut fresh = entry("a", 10);
        fresh.post.body = "edited body".into();

        let mut state = TimelineState::new();
        state.merge(vec![stale], false);
        state.merge(vec![fresh], false);
        let kept = state.entry(&PostId::new(Platform::Mastodon, "acct", "a")).unwrap();
        assert_eq!(kept.post.body, "edited body");
    }

    #[test]
    fn read_state_is_sticky_across_refetch() {
        let mut state = TimelineState::new();
        state.merge(vec![entry("a", 10)], false);
        let id = PostId::new(Platform::Mastodon, "acct", "a");
        state.mark_read(&id);

        let mut refetched = entry("a", 10);
        refetched.post.body = "refetched".into();
        state.merge(vec![refetched], false);

        assert!(state.entry(&id).unwrap().is_read);
        assert_eq!(state.unread_count(), 0);
    }

    #[test]
    fn unread_count_tracks_entries_after_every_operation() {
        let mut state = TimelineState::new();
        state.merge(vec![entry("a", 10), entry("b", 5)], false);
        assert_eq!(state.unread_count(), 2);

        let a = PostId::new(Platform::Mastodon, "acct", "a");
        state.mark_read(&a);
        assert_eq!(state.unread_count(), 1);
        // idempotent
        state.mark_read(&a);
        assert_eq!(state.unread_count(), 1);

        state.merge(vec![entry("c", 20)], false);
        assert_eq!(state.unread_count(), 2);

        state.mark_all_read();
        assert_eq!(state.unread_count(), 0);
        state.mark_all_read();
        assert_eq!(state.unread_count(), 0);

        let expected = state.entries().iter().filter(|e| !e.is_read).count();
        assert_eq!(state.unread_count(), expected);
    }

    #[test]
    fn merge_replaces_content_copies_read_flag_and_recounts() {
        // timeline [A(t=10, unread), B(t=5, read)]; merge [A'(t=10), C(t=20)]
        let mut state = TimelineState::new();
        state.merge(vec![entry("a", 10), entry("b", 5)], false);
        let b = PostId::new(Platform::Mastodon, "acct", "b");
        state.mark_read(&b);
        let a = PostId::new(Platform::Mastodon, "acct", "a");
        state.mark_read(&a);

        let mut a_prime = entry("a", 10);
        a_prime.post.body = "updated".into();
        state.merge(vec![a_prime, entry("c", 20)], false);

        assert_eq!(
            ids(&state),
            vec!["mastodon:acct:c", "mastodon:acct:a", "mastodon:acct:b"]
        );
        assert!(state.entry(&a).unwrap().is_read, "read flag copied onto A'");
        assert_eq!(state.unread_count(), 1);
    }

    #[test]
    fn partial_batch_never_deletes_absent_entries() {
        let mut state = TimelineState::new();
        state.merge(vec![entry("a", 10), entry("b", 5)], false);
        let b = PostId::new(Platform::Mastodon, "acct", "b");
        state.save_scroll_position(b.clone());

        // B unchanged upstream, so the next page doesn't re-send it
        let instruction = state.merge(vec![entry("c", 20)], true);

        assert!(state.entry(&b).is_some(), "absent-from-batch entry survives");
        assert_eq!(instruction, ScrollInstruction::PinToAnchor(b));
    }

    #[test]
    fn anchor_restores_when_present_after_merge() {
        let mut state = TimelineState::new();
        state.merge(vec![entry("a", 10), entry("b", 5)], false);
        let b = PostId::new(Platform::Mastodon, "acct", "b");
        state.save_scroll_position(b.clone());

        let instruction = state.merge(vec![entry("b", 5), entry("c", 20)], true);
        assert_eq!(instruction, ScrollInstruction::PinToAnchor(b.clone()));
        assert_eq!(state.restore_scroll_position(), Some(&b));
    }

    #[test]
    fn missing_anchor_falls_back_to_top_and_clears() {
        let mut state = TimelineState::new();
        state.merge(vec![entry("a", 10)], false);
        state.save_scroll_position(PostId::new(Platform::Mastodon, "acct", "never-seen"));

        let instruction = state.merge(vec![entry("c", 20)], true);
        assert_eq!(instruction, ScrollInstruction::JumpToTop);
        assert_eq!(state.restore_scroll_position(), None);
    }

    #[test]
    fn anchor_can_be_saved_for_an_absent_entry_and_restored_verbatim() {
        let mut state = TimelineState::new();
        let future = PostId::new(Platform::Mastodon, "acct", "later");
        state.save_scroll_position(future.clone());
        assert_eq!(state.restore_scroll_position(), Some(&future));
    }

    #[test]
    fn preserve_false_jumps_to_top_without_touching_anchor() {
        let mut state = TimelineState::new();
        state.merge(vec![entry("a", 10)], false);
        let a = PostId::new(Platform::Mastodon, "acct", "a");
        state.save_scroll_position(a.clone());

        let instruction = state.merge(vec![entry("b", 20)], false);
        assert_eq!(instruction, ScrollInstruction::JumpToTop);
        assert_eq!(state.restore_scroll_position(), Some(&a));
    }

    #[test]
    fn last_known_top_tracks_merges() {
        let mut state = TimelineState::new();
        state.merge(vec![entry("a", 10)], false);
        assert_eq!(state.last_known_top_id().unwrap().as_str(), "mastodon:acct:a");
        state.merge(vec![entry("c", 20)], false);
        assert_eq!(state.last_known_top_id().unwrap().as_str(), "mastodon:acct:c");
    }

    #[test]
    fn filter_narrows_by_all_terms() {
        let mut state = TimelineState::new();
        let mut a = entry("a", 10);
        a.post.body = "Rust release notes".into();
        let mut b = entry("b", 5);
        b.post.body = "release party".into();
        state.merge(vec![a, b], false);

        let hits = state.filter("rust+release");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "mastodon:acct:a");
    }
}
