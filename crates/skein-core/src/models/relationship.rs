use serde::{Deserialize, Serialize};

/// Relationship between the authenticated actor and another actor.
///
/// Supplied wholesale by a backend query; the engine stores and exposes it
/// but never computes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationshipState {
    pub is_following: bool,
    pub is_followed_by: bool,
    pub is_muting: bool,
    pub is_blocking: bool,
    pub follow_requested: bool,
}

impl RelationshipState {
    pub fn is_mutual(&self) -> bool {
        self.is_following && self.is_followed_by
    }

    pub fn can_follow(&self) -> bool {
        !self.is_blocking
    }
}
