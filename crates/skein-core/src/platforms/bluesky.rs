//! Bluesky-flavored backend shapes.
//!
//! Native-id namespace: posts are addressed by AT-URI
//! (`at://did:plc:…/app.bsky.feed.post/rkey`), globally unique on the
//! network but still scoped by account id in [`crate::models::PostId`] so
//! multi-account sessions never cross-contaminate. A repost has no native id
//! of its own, so its entry id is derived from the subject URI plus the
//! reposter's DID.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{parse_timestamp, NormalizationError, Platform};
use crate::models::{Attachment, AttachmentKind, Author, PostActionState, PostId, UnifiedPost};
use crate::store::timeline::{EntryKind, TimelineEntry};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewBasic {
    #[serde(default)]
    pub did: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Facet {
    #[serde(default)]
    pub features: Vec<FacetFeature>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub facets: Vec<Facet>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedImage {
    pub fullsize: String,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalView {
    pub uri: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum Embed {
    #[serde(rename = "app.bsky.embed.images#view")]
    Images { images: Vec<EmbedImage> },
    #[serde(rename = "app.bsky.embed.video#view")]
    #[serde(rename_all = "camelCase")]
    Video {
        playlist: String,
        #[serde(default)]
        thumbnail: Option<String>,
        #[serde(default)]
        alt: String,
    },
    #[serde(rename = "app.bsky.embed.external#view")]
    External { external: ExternalView },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerState {
    /// URI of the viewer's like record, present iff the viewer liked.
    #[serde(default)]
    pub like: Option<String>,
    #[serde(default)]
    pub repost: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub author: Option<ProfileViewBasic>,
    #[serde(default)]
    pub record: Option<PostRecord>,
    #[serde(default)]
    pub embed: Option<Embed>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub repost_count: u32,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub viewer: Option<ViewerState>,
    #[serde(default)]
    pub indexed_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonRepost {
    pub by: ProfileViewBasic,
    #[serde(default)]
    pub indexed_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostRef {
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyRef {
    #[serde(default)]
    pub parent: Option<PostRef>,
}

/// One item from a fetched feed page.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedViewPost {
    pub post: PostView,
    #[serde(default)]
    pub reason: Option<ReasonRepost>,
    #[serde(default)]
    pub reply: Option<ReplyRef>,
}

/// Parse a fetched feed page (JSON array of feed items).
pub fn parse_batch(json: &str) -> Result<Vec<FeedViewPost>, serde_json::Error> {
    serde_json::from_str(json)
}

fn required_uri(view: &PostView) -> Result<&str, NormalizationError> {
    view.uri
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(NormalizationError::MissingNativeId)
}

fn required_author(view: &PostView) -> Result<&ProfileViewBasic, NormalizationError> {
    view.author
        .as_ref()
        .filter(|a| !a.handle.is_empty())
        .ok_or(NormalizationError::MissingAuthorHandle)
}

/// Public web URL for a post, derived from the record key of the AT-URI.
fn web_url(handle: &str, uri: &str) -> Option<String> {
    let rkey = uri.rsplit('/').next()?;
    Some(format!("https://bsky.app/profile/{handle}/post/{rkey}"))
}

fn attachments(embed: Option<&Embed>) -> Vec<Attachment> {
    match embed {
        Some(Embed::Images { images }) => images
            .iter()
            .map(|img| Attachment {
                kind: AttachmentKind::Image,
                url: img.fullsize.clone(),
                preview_url: img.thumb.clone(),
                alt_text: if img.alt.is_empty() {
                    None
                } else {
                    Some(img.alt.clone())
                },
            })
            .collect(),
        Some(Embed::Video {
            playlist,
            thumbnail,
            alt,
        }) => vec![Attachment {
            kind: AttachmentKind::Video,
            url: playlist.clone(),
            preview_url: thumbnail.clone(),
            alt_text: if alt.is_empty() { None } else { Some(alt.clone()) },
        }],
        // External link cards belong to the link-preview collaborator.
        _ => Vec::new(),
    }
}

pub fn normalize(view: &PostView, account_id: &str) -> Result<UnifiedPost, NormalizationError> {
    let uri = required_uri(view)?;
    let author = required_author(view)?;

    let record = view.record.as_ref();
    let raw_ts = record
        .and_then(|r| r.created_at.as_deref())
        .or(view.indexed_at.as_deref())
        .ok_or_else(|| NormalizationError::BadTimestamp(String::new()))?;
    let created_at = parse_timestamp(raw_ts)?;

    let mut mentions = Vec::new();
    let mut tags = Vec::new();
    if let Some(record) = record {
        for facet in &record.facets {
            for feature in &facet.features {
                match feature {
                    // Facet mentions resolve to DIDs, not handles.
                    FacetFeature::Mention { did } => mentions.push(did.clone()),
                    FacetFeature::Tag { tag } => tags.push(tag.clone()),
                    FacetFeature::Other => {}
                }
            }
        }
    }

    Ok(UnifiedPost {
        id: PostId::new(Platform::Bluesky, account_id, uri),
        author: Author {
            display_name: author
                .display_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| author.handle.clone()),
            handle: author.handle.clone(),
            avatar_url: author.avatar.clone(),
        },
        body: record.map(|r| r.text.clone()).unwrap_or_default(),
        created_at,
        platform: Platform::Bluesky,
        origin_url: web_url(&author.handle, uri),
        attachments: attachments(view.embed.as_ref()),
        mentions,
        tags,
    })
}

pub fn to_entry(item: &FeedViewPost, account_id: &str) -> Result<TimelineEntry, NormalizationError> {
    let post = normalize(&item.post, account_id)?;

    if let Some(reason) = &item.reason {
        let subject_uri = required_uri(&item.post)?;
        let display_time = match reason.indexed_at.as_deref() {
            Some(raw) => parse_timestamp(raw)?,
            None => post.created_at,
        };
        return Ok(TimelineEntry::new(
            PostId::new(
                Platform::Bluesky,
                account_id,
                &format!("{subject_uri}#repost-{}", reason.by.did),
            ),
            post,
            EntryKind::Boost {
                boosted_by: reason.by.handle.clone(),
            },
            display_time,
        ));
    }

    let kind = match item
        .reply
        .as_ref()
        .and_then(|r| r.parent.as_ref())
        .and_then(|p| p.uri.as_deref())
    {
        Some(parent_uri) => EntryKind::Reply {
            parent_id: PostId::new(Platform::Bluesky, account_id, parent_uri),
        },
        None => EntryKind::Normal,
    };
    let created_at = post.created_at;
    Ok(TimelineEntry::new(post.id.clone(), post, kind, created_at))
}

pub fn engagement(
    view: &PostView,
    account_id: &str,
    observed_at: DateTime<Utc>,
) -> Result<PostActionState, NormalizationError> {
    let uri = required_uri(view)?;
    let viewer = view.viewer.as_ref();
    Ok(PostActionState {
        id: PostId::new(Platform::Bluesky, account_id, uri),
        platform: Platform::Bluesky,
        is_liked: viewer.is_some_and(|v| v.like.is_some()),
        is_reposted: viewer.is_some_and(|v| v.repost.is_some()),
        like_count: view.like_count,
        repost_count: view.repost_count,
        reply_count: view.reply_count,
        last_updated_at: observed_at,
    })
}
