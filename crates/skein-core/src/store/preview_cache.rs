//! Link-preview metadata cache.
//!
//! Fetching previews belongs to a network collaborator; the engine only
//! consumes this cache through an injected handle. Entries expire after
//! [`crate::constants::PREVIEW_CACHE_TTL_SECS`].

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::kv::now_secs;
use crate::constants::PREVIEW_CACHE_TTL_SECS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewMetadata {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

pub trait PreviewCache: Send + Sync {
    fn get(&self, url: &str) -> Option<PreviewMetadata>;
    fn put(&self, url: &str, metadata: PreviewMetadata);
    fn invalidate(&self, url: &str);
}

/// In-memory implementation with per-entry insertion stamps.
#[derive(Default)]
pub struct MemoryPreviewCache {
    entries: Mutex<HashMap<String, (u64, PreviewMetadata)>>,
}

impl MemoryPreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_at(&self, url: &str, now: u64) -> Option<PreviewMetadata> {
        let mut entries = self.entries.lock();
        match entries.get(url) {
            Some((stored_at, metadata)) if now.saturating_sub(*stored_at) <= PREVIEW_CACHE_TTL_SECS => {
                Some(metadata.clone())
            }
            Some(_) => {
                entries.remove(url);
                None
            }
            None => None,
        }
    }

    fn put_at(&self, url: &str, metadata: PreviewMetadata, now: u64) {
        self.entries.lock().insert(url.to_string(), (now, metadata));
    }
}

impl PreviewCache for MemoryPreviewCache {
    fn get(&self, url: &str) -> Option<PreviewMetadata> {
        self.get_at(url, now_secs())
    }

    fn put(&self, url: &str, metadata: PreviewMetadata) {
        self.put_at(url, metadata, now_secs());
    }

    fn invalidate(&self, url: &str) {
        self.entries.lock().remove(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(url: &str) -> PreviewMetadata {
        PreviewMetadata {
            url: url.to_string(),
            title: Some("A page".into()),
            description: None,
            image_url: None,
        }
    }

    #[test]
    fn fresh_entry_is_served() {
        let cache = MemoryPreviewCache::new();
        cache.put_at("https://example.com", metadata("https://example.com"), 1_000);
        assert!(cache.get_at("https://example.com", 1_000 + 60).is_some());
    }

    #[test]
    fn entry_expires_after_24_hours() {
        let cache = MemoryPreviewCache::new();
        cache.put_at("https://example.com", metadata("https://example.com"), 1_000);
        let just_inside = 1_000 + PREVIEW_CACHE_TTL_SECS;
        assert!(cache.get_at("https://example.com", just_inside).is_some());
        let just_past = 1_000 + PREVIEW_CACHE_TTL_SECS + 1;
        assert!(cache.get_at("https://example.com", just_past).is_none());
        // expired entry was dropped, not retained
        assert!(cache.get_at("https://example.com", 1_000).is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = MemoryPreviewCache::new();
        cache.put_at("https://example.com", metadata("https://example.com"), 1_000);
        cache.invalidate("https://example.com");
        assert!(cache.get_at("https://example.com", 1_001).is_none());
    }

    #[test]
    fn put_refreshes_the_stamp() {
        let cache = MemoryPreviewCache::new();
        cache.put_at("https://example.com", metadata("https://example.com"), 1_000);
        cache.put_at("https://example.com", metadata("https://example.com"), 90_000);
        assert!(cache
            .get_at("https://example.com", 90_000 + PREVIEW_CACHE_TTL_SECS)
            .is_some());
    }
}
