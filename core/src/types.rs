//! Domain DTOs for the feed API.
//!
//! # Design
//! Field names follow the backend's wire format (`_id`, camelCase) through
//! serde attributes so the Rust side keeps snake_case. The mock server defines
//! its own copies; integration tests catch drift between the two.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Page size used when the caller does not pick one.
pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Media {
    pub uri: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    #[serde(rename = "userId")]
    pub author: String,
    #[serde(rename = "content")]
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A feed item. `likes` is a set: membership means "liked".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub author: UserSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    #[serde(default)]
    pub likes: BTreeSet<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub views: u64,
}

impl Post {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.contains(user_id)
    }
}

/// Response body of `GET {base}/{scopeId}?page&limit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<Post>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub current_page: u32,
}

/// A local file to upload alongside a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl Attachment {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string())
    }

    /// MIME type guessed from the extension, falling back on the media kind.
    pub fn content_type(&self) -> &'static str {
        let ext = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match (ext.as_deref(), self.kind) {
            (Some("png"), _) => "image/png",
            (Some("gif"), _) => "image/gif",
            (Some("webp"), _) => "image/webp",
            (Some("jpg" | "jpeg"), _) => "image/jpeg",
            (Some("mov"), _) => "video/quicktime",
            (Some("webm"), _) => "video/webm",
            (Some("mp4"), _) => "video/mp4",
            (_, MediaKind::Image) => "image/jpeg",
            (_, MediaKind::Video) => "video/mp4",
        }
    }
}

/// Input for creating a post.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub author_id: String,
    /// Set when posting into a community list.
    pub community_id: Option<String>,
    pub content: Option<String>,
    pub attachment: Option<Attachment>,
}

/// Input for editing a post. Omitted fields stay unchanged on the server.
#[derive(Debug, Clone, Default)]
pub struct PostEdit {
    pub content: Option<String>,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePostBody<'a> {
    pub user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_id: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserRef<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewComment<'a> {
    pub user_id: &'a str,
    pub content: &'a str,
}
