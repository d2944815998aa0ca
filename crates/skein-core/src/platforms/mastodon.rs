//! Mastodon-flavored backend shapes.
//!
//! Native-id namespace: status ids are instance-local numeric strings, so a
//! stable identity is only unique together with the owning account id;
//! [`crate::models::PostId`] composes both. Boosts arrive as a wrapper
//! status whose `reblog` field carries the original; the wrapper id keys the
//! timeline entry and the wrapper's `created_at` orders it.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{parse_timestamp, NormalizationError, Platform};
use crate::models::{Attachment, AttachmentKind, Author, PostActionState, PostId, UnifiedPost};
use crate::store::timeline::{EntryKind, TimelineEntry};

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    /// Webfinger-style handle, e.g. `user` or `user@other.instance`.
    #[serde(default)]
    pub acct: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaAttachment {
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mention {
    pub acct: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusTag {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub account: Option<Account>,
    #[serde(default)]
    pub media_attachments: Vec<MediaAttachment>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub tags: Vec<StatusTag>,
    #[serde(default)]
    pub reblog: Option<Box<Status>>,
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
    #[serde(default)]
    pub favourites_count: u32,
    #[serde(default)]
    pub reblogs_count: u32,
    #[serde(default)]
    pub replies_count: u32,
    #[serde(default)]
    pub favourited: bool,
    #[serde(default)]
    pub reblogged: bool,
}

/// Parse a fetched timeline page (JSON array of statuses).
pub fn parse_batch(json: &str) -> Result<Vec<Status>, serde_json::Error> {
    serde_json::from_str(json)
}

fn required_id(status: &Status) -> Result<&str, NormalizationError> {
    status
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(NormalizationError::MissingNativeId)
}

fn required_author(status: &Status) -> Result<&Account, NormalizationError> {
    status
        .account
        .as_ref()
        .filter(|a| !a.acct.is_empty())
        .ok_or(NormalizationError::MissingAuthorHandle)
}

fn attachment_kind(media_type: &str) -> AttachmentKind {
    match media_type {
        "image" => AttachmentKind::Image,
        "video" => AttachmentKind::Video,
        "audio" => AttachmentKind::Audio,
        "gifv" => AttachmentKind::AnimatedGif,
        _ => AttachmentKind::Unknown,
    }
}

pub fn normalize(status: &Status, account_id: &str) -> Result<UnifiedPost, NormalizationError> {
    let native_id = required_id(status)?;
    let account = required_author(status)?;
    let created_at = parse_timestamp(&status.created_at)?;

    let author = Author {
        display_name: if account.display_name.is_empty() {
            account.acct.clone()
        } else {
            account.display_name.clone()
        },
        handle: account.acct.clone(),
        avatar_url: account.avatar.clone(),
    };

    Ok(UnifiedPost {
        id: PostId::new(Platform::Mastodon, account_id, native_id),
        author,
        body: status.content.clone(),
        created_at,
        platform: Platform::Mastodon,
        origin_url: status.url.clone(),
        attachments: status
            .media_attachments
            .iter()
            .map(|m| Attachment {
                kind: attachment_kind(&m.media_type),
                url: m.url.clone(),
                preview_url: m.preview_url.clone(),
                alt_text: m.description.clone(),
            })
            .collect(),
        mentions: status.mentions.iter().map(|m| m.acct.clone()).collect(),
        tags: status.tags.iter().map(|t| t.name.clone()).collect(),
    })
}

pub fn to_entry(status: &Status, account_id: &str) -> Result<TimelineEntry, NormalizationError> {
    if let Some(reblog) = &status.reblog {
        // Boost: the wrapper id keys the entry and the wrapper timestamp
        // orders it, while the wrapped post keeps its own identity.
        let wrapper_id = required_id(status)?;
        let booster = required_author(status)?;
        let display_time = parse_timestamp(&status.created_at)?;
        let post = normalize(reblog, account_id)?;
        return Ok(TimelineEntry::new(
            PostId::new(Platform::Mastodon, account_id, wrapper_id),
            post,
            EntryKind::Boost {
                boosted_by: booster.acct.clone(),
            },
            display_time,
        ));
    }

    let post = normalize(status, account_id)?;
    let kind = match &status.in_reply_to_id {
        Some(parent) => EntryKind::Reply {
            parent_id: PostId::new(Platform::Mastodon, account_id, parent),
        },
        None => EntryKind::Normal,
    };
    let created_at = post.created_at;
    Ok(TimelineEntry::new(post.id.clone(), post, kind, created_at))
}

/// Engagement counts as the server reported them at fetch time. For a boost
/// the counts belong to the boosted post, not the wrapper.
pub fn engagement(
    status: &Status,
    account_id: &str,
    observed_at: DateTime<Utc>,
) -> Result<PostActionState, NormalizationError> {
    let target: &Status = status.reblog.as_deref().unwrap_or(status);
    let native_id = required_id(target)?;
    Ok(PostActionState {
        id: PostId::new(Platform::Mastodon, account_id, native_id),
        platform: Platform::Mastodon,
        is_liked: target.favourited,
        is_reposted: target.reblogged,
        like_count: target.favourites_count,
        repost_count: target.reblogs_count,
        reply_count: target.replies_count,
        last_updated_at: observed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn status_json(id: &str, acct: &str) -> serde_json::Value {
        json!({
            "id": id,
            "created_at": "2024-03-01T12:00:00.000Z",
            "content": "<p>hello fediverse</p>",
            "url": format!("https://social.example/@{acct}/{id}"),
            "account": {
                "id": "77",
                "display_name": "Example User",
                "acct": acct,
                "avatar": "https://social.example/avatar.png"
            },
            "favourites_count": 3,
            "reblogs_count": 1,
            "replies_count": 0,
            "favourited": true,
            "reblogged": false
        })
    }

    fn status(id: &str, acct: &str) -> Status {
        serde_json::from_value(status_json(id, acct)).unwrap()
    }

    #[test]
    fn normalize_is_deterministic() {
        let s = status("101", "alice");
        let a = normalize(&s, "acct-1").unwrap();
        let b = normalize(&s, "acct-1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.id.as_str(), "mastodon:acct-1:101");
        assert_eq!(a.author.handle, "alice");
    }

    #[test]
    fn normalize_fails_without_native_id() {
        let mut s = status("101", "alice");
        s.id = None;
        assert_eq!(
            normalize(&s, "acct-1").unwrap_err(),
            NormalizationError::MissingNativeId
        );
    }

    #[test]
    fn normalize_fails_without_author_handle() {
        let mut s = status("101", "alice");
        s.account.as_mut().unwrap().acct.clear();
        assert_eq!(
            normalize(&s, "acct-1").unwrap_err(),
            NormalizationError::MissingAuthorHandle
        );
    }

    #[test]
    fn attachment_types_map_to_typed_kinds() {
        let mut s = status("101", "alice");
        s.media_attachments = vec![
            MediaAttachment {
                media_type: "gifv".into(),
                url: "https://files.example/a.mp4".into(),
                preview_url: Some("https://files.example/a.png".into()),
                description: Some("a cat".into()),
            },
            MediaAttachment {
                media_type: "sticker".into(),
                url: "https://files.example/b".into(),
                preview_url: None,
                description: None,
            },
        ];
        let post = normalize(&s, "acct-1").unwrap();
        assert_eq!(post.attachments[0].kind, AttachmentKind::AnimatedGif);
        assert_eq!(post.attachments[0].alt_text.as_deref(), Some("a cat"));
        assert_eq!(post.attachments[1].kind, AttachmentKind::Unknown);
    }

    #[test]
    fn boost_entry_keys_by_wrapper_and_orders_by_boost_time() {
        let mut wrapper = status("900", "booster");
        wrapper.created_at = "2024-03-02T08:00:00.000Z".into();
        wrapper.reblog = Some(Box::new(status("101", "alice")));

        let entry = to_entry(&wrapper, "acct-1").unwrap();
        assert_eq!(entry.id.as_str(), "mastodon:acct-1:900");
        assert_eq!(entry.post.id.as_str(), "mastodon:acct-1:101");
        assert_eq!(
            entry.kind,
            EntryKind::Boost {
                boosted_by: "booster".into()
            }
        );
        // ordered by the boost's display time, not the boosted post's
        assert_eq!(
            entry.created_at,
            Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap()
        );
        assert_ne!(entry.created_at, entry.post.created_at);
    }

    #[test]
    fn reply_entry_carries_parent_identity() {
        let mut s = status("102", "alice");
        s.in_reply_to_id = Some("101".into());
        let entry = to_entry(&s, "acct-1").unwrap();
        assert_eq!(
            entry.kind,
            EntryKind::Reply {
                parent_id: PostId::new(Platform::Mastodon, "acct-1", "101")
            }
        );
    }

    #[test]
    fn engagement_targets_the_boosted_post() {
        let mut wrapper = status("900", "booster");
        wrapper.favourites_count = 0;
        wrapper.reblog = Some(Box::new(status("101", "alice")));
        let observed = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let state = engagement(&wrapper, "acct-1", observed).unwrap();
        assert_eq!(state.id.as_str(), "mastodon:acct-1:101");
        assert_eq!(state.like_count, 3);
        assert_eq!(state.last_updated_at, observed);
    }

    #[test]
    fn parse_batch_reads_a_wire_page() {
        let page = serde_json::to_string(&vec![status_json("1", "a"), status_json("2", "b")]).unwrap();
        let statuses = parse_batch(&page).unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[1].id.as_deref(), Some("2"));
    }
}
