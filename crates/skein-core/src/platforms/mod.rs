//! Platform boundary.
//!
//! Platform-native post shapes cross into the engine only through this
//! module: [`NativePost`] carries the raw payload, and [`normalize`] /
//! [`to_entry`] / [`engagement`] dispatch to per-platform pure functions
//! keyed on the [`Platform`] enumerant. Nothing outside `platforms/`
//! inspects a native structure.

pub mod bluesky;
pub mod mastodon;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{PostActionState, UnifiedPost};
use crate::store::timeline::TimelineEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Mastodon,
    Bluesky,
}

impl Platform {
    /// Stable identity namespace tag. Tags are never reused across
    /// platforms; adding a backend means adding a new tag here.
    pub fn tag(&self) -> &'static str {
        match self {
            Platform::Mastodon => "mastodon",
            Platform::Bluesky => "bluesky",
        }
    }

    pub fn all() -> [Platform; 2] {
        [Platform::Mastodon, Platform::Bluesky]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("native post is missing its id")]
    MissingNativeId,
    #[error("native post is missing the author handle")]
    MissingAuthorHandle,
    #[error("unparseable timestamp: {0}")]
    BadTimestamp(String),
}

/// Platform-native post payload as delivered by a fetch collaborator.
#[derive(Debug, Clone, Deserialize)]
pub enum NativePost {
    Mastodon(mastodon::Status),
    Bluesky(bluesky::FeedViewPost),
}

impl NativePost {
    pub fn platform(&self) -> Platform {
        match self {
            NativePost::Mastodon(_) => Platform::Mastodon,
            NativePost::Bluesky(_) => Platform::Bluesky,
        }
    }
}

/// Normalize a platform-native post fetched through `account_id`.
///
/// Pure: identical input always yields identical output. Fails only when a
/// required field (native id, author handle) is absent; the caller skips the
/// offending item and continues with the rest of the batch.
pub fn normalize(native: &NativePost, account_id: &str) -> Result<UnifiedPost, NormalizationError> {
    match native {
        NativePost::Mastodon(status) => mastodon::normalize(status, account_id),
        NativePost::Bluesky(item) => bluesky::normalize(&item.post, account_id),
    }
}

/// Build the timeline entry for a native post, resolving boosts and replies.
///
/// A boost entry is ordered by the boost's own display time, not the boosted
/// post's creation time.
pub fn to_entry(native: &NativePost, account_id: &str) -> Result<TimelineEntry, NormalizationError> {
    match native {
        NativePost::Mastodon(status) => mastodon::to_entry(status, account_id),
        NativePost::Bluesky(item) => bluesky::to_entry(item, account_id),
    }
}

/// Authoritative engagement snapshot carried by a fetched post, stamped with
/// the observation time so it participates in last-writer-wins reconciliation.
pub fn engagement(
    native: &NativePost,
    account_id: &str,
    observed_at: DateTime<Utc>,
) -> Result<PostActionState, NormalizationError> {
    match native {
        NativePost::Mastodon(status) => mastodon::engagement(status, account_id, observed_at),
        NativePost::Bluesky(item) => bluesky::engagement(&item.post, account_id, observed_at),
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, NormalizationError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| NormalizationError::BadTimestamp(raw.to_string()))
}
