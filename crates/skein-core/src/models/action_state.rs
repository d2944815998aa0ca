use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::PostId;
use crate::platforms::Platform;

/// Per-post engagement snapshot.
///
/// Two sources produce values of this type: an optimistic local mutation
/// (the user tapped like/repost) and an authoritative server refresh. Both
/// go through [`reconcile`], which adopts one snapshot wholesale. Fields
/// from two snapshots are never mixed, so an old `is_liked` can never pair
/// with a newer count that already reflects the un-like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostActionState {
    pub id: PostId,
    pub platform: Platform,
    pub is_liked: bool,
    pub is_reposted: bool,
    pub like_count: u32,
    pub repost_count: u32,
    pub reply_count: u32,
    pub last_updated_at: DateTime<Utc>,
}

impl PostActionState {
    /// Empty baseline for a post we have no server snapshot for yet.
    pub fn empty(id: PostId, platform: Platform, now: DateTime<Utc>) -> Self {
        Self {
            id,
            platform,
            is_liked: false,
            is_reposted: false,
            like_count: 0,
            repost_count: 0,
            reply_count: 0,
            last_updated_at: now,
        }
    }

    /// Optimistic like toggle: fresh snapshot stamped `now`, count adjusted
    /// immediately and clamped at zero.
    pub fn toggled_like(&self, now: DateTime<Utc>) -> Self {
        let liked = !self.is_liked;
        Self {
            is_liked: liked,
            like_count: if liked {
                self.like_count + 1
            } else {
                self.like_count.saturating_sub(1)
            },
            last_updated_at: now,
            ..self.clone()
        }
    }

    /// Optimistic repost toggle, same rules as [`Self::toggled_like`].
    pub fn toggled_repost(&self, now: DateTime<Utc>) -> Self {
        let reposted = !self.is_reposted;
        Self {
            is_reposted: reposted,
            repost_count: if reposted {
                self.repost_count + 1
            } else {
                self.repost_count.saturating_sub(1)
            },
            last_updated_at: now,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The incoming snapshot was adopted.
    Adopted,
    /// The incoming snapshot was older than the current one and was dropped.
    StaleSuppressed,
}

/// Last-writer-wins reconciliation of engagement snapshots.
///
/// With no current value the incoming snapshot is adopted. Otherwise the
/// incoming snapshot wins iff its `last_updated_at` is at least the current
/// one's, so a server snapshot older than a pending optimistic change never
/// overwrites it. Suppression is reported, not an error.
pub fn reconcile(
    current: Option<&PostActionState>,
    incoming: PostActionState,
) -> (PostActionState, ReconcileOutcome) {
    match current {
        None => (incoming, ReconcileOutcome::Adopted),
        Some(current) => {
            if incoming.last_updated_at >= current.last_updated_at {
                (incoming, ReconcileOutcome::Adopted)
            } else {
                (current.clone(), ReconcileOutcome::StaleSuppressed)
            }
        }
    }
}
