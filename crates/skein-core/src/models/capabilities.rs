use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What we currently believe about a backend's support for one search mode.
///
/// Backends do not advertise search capability, so it is learned from
/// observed query outcomes. `Yes`/`No` are not terminal: an instance can be
/// reconfigured, so every state stays re-enterable on new evidence.
/// `Likely` is only seeded from out-of-band hints (e.g. known server
/// software); no query outcome produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilitySupport {
    Unknown,
    Likely,
    LikelyNo,
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchScope {
    Accounts,
    Hashtags,
    Posts,
}

/// Pure transition rule for one observed search outcome.
///
/// `has_results` is whether this scope returned anything; `has_other_results`
/// is whether any sibling scope in the same query did. For the posts scope an
/// all-empty query is inconclusive (it may simply match nothing anywhere)
/// and the state is left unchanged, even if that leaves `Unknown`
/// indefinitely. Account and hashtag search are deterministic enough that an
/// empty result is itself a negative signal.
pub fn next_support(
    current: CapabilitySupport,
    scope: SearchScope,
    has_results: bool,
    has_other_results: bool,
) -> CapabilitySupport {
    match scope {
        SearchScope::Posts => {
            if has_results {
                CapabilitySupport::Yes
            } else if has_other_results {
                CapabilitySupport::LikelyNo
            } else {
                current
            }
        }
        SearchScope::Accounts | SearchScope::Hashtags => {
            if has_results {
                CapabilitySupport::Yes
            } else {
                CapabilitySupport::No
            }
        }
    }
}

/// Per-account record of learned search capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCapabilities {
    pub account_search: CapabilitySupport,
    pub hashtag_search: CapabilitySupport,
    pub post_search: CapabilitySupport,
    pub supports_trends: bool,
    pub instance_domain: String,
    pub last_checked: DateTime<Utc>,
}

impl SearchCapabilities {
    pub fn new(instance_domain: &str, now: DateTime<Utc>) -> Self {
        Self {
            account_search: CapabilitySupport::Unknown,
            hashtag_search: CapabilitySupport::Unknown,
            post_search: CapabilitySupport::Unknown,
            supports_trends: false,
            instance_domain: instance_domain.to_string(),
            last_checked: now,
        }
    }

    /// Apply one observed query outcome and stamp `last_checked`.
    pub fn apply_outcome(
        &mut self,
        scope: SearchScope,
        has_results: bool,
        has_other_results: bool,
        now: DateTime<Utc>,
    ) {
        let slot = match scope {
            SearchScope::Accounts => &mut self.account_search,
            SearchScope::Hashtags => &mut self.hashtag_search,
            SearchScope::Posts => &mut self.post_search,
        };
        *slot = next_support(*slot, scope, has_results, has_other_results);
        self.last_checked = now;
    }

    /// Warn the user before they rely on post search on this account.
    pub fn should_show_status_search_warning(&self) -> bool {
        matches!(
            self.post_search,
            CapabilitySupport::LikelyNo | CapabilitySupport::No
        )
    }
}
