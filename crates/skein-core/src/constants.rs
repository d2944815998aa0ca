//! Engine-wide constants
//!
//! Centralized location for magic values that are used across
//! multiple modules.

/// Link-preview metadata expires after this many seconds (24 hours).
pub const PREVIEW_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Key prefix for persisted per-account capability tables.
pub const CAPABILITY_KEY_PREFIX: &str = "capabilities/";

/// Key prefix for persisted per-account saved searches.
pub const SAVED_SEARCH_KEY_PREFIX: &str = "saved-searches/";
