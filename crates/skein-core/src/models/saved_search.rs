use serde::{Deserialize, Serialize};

use super::capabilities::SearchScope;

/// A search the user chose to keep around, owned by one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub account_id: String,
    pub query: String,
    pub scope: SearchScope,
    /// Unix seconds when the search was saved.
    pub created_at: u64,
}

impl SavedSearch {
    pub fn new(account_id: &str, query: &str, scope: SearchScope, created_at: u64) -> Self {
        Self {
            account_id: account_id.to_string(),
            query: query.trim().to_string(),
            scope,
            created_at,
        }
    }

    /// Two saved searches are the "same" search when query and scope match.
    pub fn matches(&self, query: &str, scope: SearchScope) -> bool {
        self.scope == scope && self.query == query.trim()
    }
}
