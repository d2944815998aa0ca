use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::PostId;
use crate::platforms::Platform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub display_name: String,
    /// Account handle as the backend renders it (e.g. `user@instance.social`
    /// or `user.bsky.social`). Required; normalization fails without it.
    pub handle: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
    AnimatedGif,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub url: String,
    pub preview_url: Option<String>,
    pub alt_text: Option<String>,
}

/// Normalized cross-platform post.
///
/// Immutable once constructed; a refetch of the "same" post produces a new
/// value compared by identity, not by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedPost {
    pub id: PostId,
    pub author: Author,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub platform: Platform,
    pub origin_url: Option<String>,
    pub attachments: Vec<Attachment>,
    /// Handles mentioned in the body.
    pub mentions: Vec<String>,
    /// Hashtag names without the leading `#`.
    pub tags: Vec<String>,
}
