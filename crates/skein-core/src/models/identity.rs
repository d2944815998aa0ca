use std::fmt;

use serde::{Deserialize, Serialize};

use crate::platforms::Platform;

/// Globally unique, deterministic identity for a post.
///
/// Composed as `platform:account_id:native_id`. Platform tags are disjoint
/// namespaces, and the account id scopes native ids that are only unique per
/// backend connection (Mastodon status ids are instance-local). The same
/// native post fetched through the same account always yields the same
/// identity; this string is the sole deduplication and lookup key everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostId(String);

impl PostId {
    pub fn new(platform: Platform, account_id: &str, native_id: &str) -> Self {
        Self(format!("{}:{}:{}", platform.tag(), account_id, native_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
