//! Stateless HTTP request builder and response parser for the feed API.
//!
//! # Design
//! `FeedClient` holds the origin and an optional bearer token and nothing
//! else. Every endpoint has a `build_*` method that produces an `HttpRequest`
//! and a `parse_*` method that consumes an `HttpResponse`. Both list scopes
//! (personal posts and community posts) share one endpoint shape under
//! different base paths, selected by `ListScope`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, GENERIC_FAILURE};
use crate::http::{FormPart, HttpBody, HttpMethod, HttpRequest, HttpResponse, PartValue};
use crate::types::{
    Attachment, Comment, CreatePostBody, NewComment, Post, PostDraft, PostEdit, PostPage, UserRef,
};

/// Which list an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListScope {
    /// A user's own posts.
    Posts,
    /// Posts inside a community.
    Community,
}

impl ListScope {
    pub fn base_path(self) -> &'static str {
        match self {
            ListScope::Posts => "/api/posts",
            ListScope::Community => "/api/communities/posts",
        }
    }

    /// Key of this list's branch in the persisted state.
    pub fn slice_name(self) -> &'static str {
        match self {
            ListScope::Posts => "posts",
            ListScope::Community => "commposts",
        }
    }
}

/// Builds requests and parses responses for the feed API.
///
/// The client never touches the network. Callers send the `HttpRequest` it
/// returns through a `Transport` and hand the `HttpResponse` back to the
/// matching `parse_*` method.
#[derive(Debug, Clone)]
pub struct FeedClient {
    base_url: String,
    token: Option<String>,
}

impl FeedClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_fetch_page(
        &self,
        scope: ListScope,
        scope_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<HttpRequest, ApiError> {
        require("scope id", scope_id)?;
        if page == 0 {
            return Err(ApiError::Invalid("page numbers start at 1".to_string()));
        }
        if limit == 0 {
            return Err(ApiError::Invalid("limit must be at least 1".to_string()));
        }
        Ok(self.request(
            HttpMethod::Get,
            format!("{}/{scope_id}?page={page}&limit={limit}", scope.base_path()),
            None,
        ))
    }

    /// JSON when there is no attachment, multipart otherwise.
    pub fn build_create_post(&self, scope: ListScope, draft: &PostDraft) -> Result<HttpRequest, ApiError> {
        require("author id", &draft.author_id)?;
        let content = draft.content.as_deref().filter(|c| !c.trim().is_empty());
        if content.is_none() && draft.attachment.is_none() {
            return Err(ApiError::Invalid("a post needs text or an attachment".to_string()));
        }
        let path = scope.base_path().to_string();
        match &draft.attachment {
            None => {
                let body = to_json(&CreatePostBody {
                    user_id: &draft.author_id,
                    content,
                    community_id: draft.community_id.as_deref(),
                })?;
                Ok(self.request(HttpMethod::Post, path, Some(HttpBody::Json(body))))
            }
            Some(attachment) => {
                check_attachment(attachment)?;
                let mut parts = vec![FormPart::text("userId", draft.author_id.as_str())];
                if let Some(content) = content {
                    parts.push(FormPart::text("content", content));
                }
                if let Some(community_id) = &draft.community_id {
                    parts.push(FormPart::text("communityId", community_id.as_str()));
                }
                parts.push(media_part(attachment));
                Ok(self.request(HttpMethod::Post, path, Some(HttpBody::Multipart(parts))))
            }
        }
    }

    /// Edits are always sent as multipart, even without a new attachment.
    pub fn build_edit_post(&self, scope: ListScope, id: &str, edit: &PostEdit) -> Result<HttpRequest, ApiError> {
        require("post id", id)?;
        if edit.content.is_none() && edit.attachment.is_none() {
            return Err(ApiError::Invalid("nothing to update".to_string()));
        }
        let mut parts = Vec::new();
        if let Some(content) = &edit.content {
            parts.push(FormPart::text("content", content.as_str()));
        }
        if let Some(attachment) = &edit.attachment {
            check_attachment(attachment)?;
            parts.push(media_part(attachment));
        }
        Ok(self.request(
            HttpMethod::Put,
            format!("{}/{id}", scope.base_path()),
            Some(HttpBody::Multipart(parts)),
        ))
    }

    pub fn build_delete_post(&self, scope: ListScope, id: &str) -> Result<HttpRequest, ApiError> {
        require("post id", id)?;
        Ok(self.request(HttpMethod::Delete, format!("{}/{id}", scope.base_path()), None))
    }

    pub fn build_toggle_like(&self, scope: ListScope, id: &str, user_id: &str) -> Result<HttpRequest, ApiError> {
        require("post id", id)?;
        require("user id", user_id)?;
        let body = to_json(&UserRef { user_id })?;
        Ok(self.request(
            HttpMethod::Put,
            format!("{}/like/{id}", scope.base_path()),
            Some(HttpBody::Json(body)),
        ))
    }

    pub fn build_add_comment(
        &self,
        scope: ListScope,
        id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<HttpRequest, ApiError> {
        require("post id", id)?;
        require("user id", user_id)?;
        if text.trim().is_empty() {
            return Err(ApiError::Invalid("comment text is empty".to_string()));
        }
        let body = to_json(&NewComment {
            user_id,
            content: text,
        })?;
        Ok(self.request(
            HttpMethod::Post,
            format!("{}/comment/{id}", scope.base_path()),
            Some(HttpBody::Json(body)),
        ))
    }

    pub fn build_increment_share(&self, scope: ListScope, id: &str) -> Result<HttpRequest, ApiError> {
        require("post id", id)?;
        Ok(self.request(HttpMethod::Put, format!("{}/share/{id}", scope.base_path()), None))
    }

    pub fn build_request_join(&self, community_id: &str, user_id: &str) -> Result<HttpRequest, ApiError> {
        require("community id", community_id)?;
        require("user id", user_id)?;
        let body = to_json(&UserRef { user_id })?;
        Ok(self.request(
            HttpMethod::Post,
            format!("/api/communities/join/{community_id}"),
            Some(HttpBody::Json(body)),
        ))
    }

    pub fn parse_fetch_page(&self, response: HttpResponse) -> Result<PostPage, ApiError> {
        parse_json(response)
    }

    pub fn parse_create_post(&self, response: HttpResponse) -> Result<Post, ApiError> {
        parse_json(response)
    }

    pub fn parse_edit_post(&self, response: HttpResponse) -> Result<Post, ApiError> {
        parse_json(response)
    }

    pub fn parse_add_comment(&self, response: HttpResponse) -> Result<Comment, ApiError> {
        parse_json(response)
    }

    /// Delete, like, share and join responses carry nothing the store uses.
    pub fn parse_ack(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    fn request(&self, method: HttpMethod, path: String, body: Option<HttpBody>) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(HttpBody::Json(_)) = &body {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = &self.token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        tracing::debug!(method = method.as_str(), %path, "built request");
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers,
            body,
        }
    }
}

fn require(what: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Invalid(format!("{what} is empty")));
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// The file is read at send time, so a missing one must be caught here.
fn check_attachment(attachment: &Attachment) -> Result<(), ApiError> {
    if !attachment.path.is_file() {
        return Err(ApiError::Invalid(format!(
            "attachment {} is not a readable file",
            attachment.path.display()
        )));
    }
    Ok(())
}

fn media_part(attachment: &Attachment) -> FormPart {
    FormPart {
        name: "media".to_string(),
        value: PartValue::File {
            path: attachment.path.clone(),
            file_name: attachment.file_name(),
            content_type: attachment.content_type().to_string(),
        },
    }
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Map non-2xx status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::Server {
        status: response.status,
        message: server_message(&response.body),
    })
}

/// The backend reports failures as `{"message": ..}` or `{"error": ..}`.
fn server_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(serde_json::Value::String(msg)) = map.get(key) {
                return msg.clone();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        GENERIC_FAILURE.to_string()
    } else {
        trimmed.to_string()
    }
}
