//! Paginated post list with server-confirmed mutations.
//!
//! # Design
//! Each operation has two halves. The *begin* half (`fetch_page`,
//! `create_post`, `toggle_like`, ...) checks local preconditions and returns
//! a `Pending` holding the request to send. `apply` takes that `Pending` plus
//! the transport outcome, parses it and patches the snapshot. Nothing changes
//! locally until the server has answered, so there is never an optimistic
//! state to roll back. `dispatch` does both halves with a `Transport`.
//!
//! Targets are found by linear scan on `id`. A mutation whose target is no
//! longer in the list is dropped without error.

use serde::{Deserialize, Serialize};

use crate::client::{FeedClient, ListScope};
use crate::error::{ApiError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{Comment, Post, PostDraft, PostEdit, PostPage, DEFAULT_LIMIT};

/// The current value of one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListSnapshot {
    pub items: Vec<Post>,
    /// Last successfully fetched page; 0 before the first fetch.
    pub page: u32,
    /// Server-reported page count; 0 means unknown.
    pub total_pages: u32,
    #[serde(skip)]
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ListSnapshot {
    pub fn has_more(&self) -> bool {
        self.total_pages == 0 || self.page < self.total_pages
    }

    pub fn get(&self, id: &str) -> Option<&Post> {
        self.items.iter().find(|p| p.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|p| p.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Post> {
        self.items.iter_mut().find(|p| p.id == id)
    }

    /// Page 1 replaces the list; later pages append, skipping ids already present.
    pub fn merge_page(&mut self, requested: u32, page: PostPage) {
        if requested <= 1 {
            self.items.clear();
        }
        for post in page.posts {
            if self.position(&post.id).is_none() {
                self.items.push(post);
            }
        }
        self.page = requested;
        self.total_pages = page.total_pages;
    }

    pub fn prepend(&mut self, post: Post) {
        self.items.retain(|p| p.id != post.id);
        self.items.insert(0, post);
    }

    /// Swap the item at `id` for `post`. Returns false when `id` is not in the list.
    pub fn replace(&mut self, id: &str, post: Post) -> bool {
        match self.position(id) {
            Some(at) => {
                self.items[at] = post;
                true
            }
            None => false,
        }
    }

    /// Returns how many items were removed.
    pub fn remove(&mut self, id: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|p| p.id != id);
        before - self.items.len()
    }

    pub fn toggle_like(&mut self, id: &str, user_id: &str) -> bool {
        let Some(post) = self.find_mut(id) else {
            return false;
        };
        if !post.likes.remove(user_id) {
            post.likes.insert(user_id.to_string());
        }
        true
    }

    pub fn push_comment(&mut self, id: &str, comment: Comment) -> bool {
        let Some(post) = self.find_mut(id) else {
            return false;
        };
        post.comments.push(comment);
        true
    }

    pub fn increment_share(&mut self, id: &str) -> bool {
        let Some(post) = self.find_mut(id) else {
            return false;
        };
        post.shares += 1;
        true
    }
}

/// What to do with the response once it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    FetchPage { page: u32 },
    Create,
    Edit { id: String },
    Delete { id: String },
    ToggleLike { id: String, user_id: String },
    AddComment { id: String },
    IncrementShare { id: String },
    /// The response is checked but the snapshot is left alone.
    Acknowledge,
}

/// A request in flight, paired with the patch to apply on success.
#[derive(Debug, Clone)]
#[must_use = "a pending operation does nothing until it is applied"]
pub struct Pending {
    pub request: HttpRequest,
    pub mutation: Mutation,
}

/// One synchronized list, bound to a scope and a client.
///
/// The store owns its `ListSnapshot` and only changes it in `apply`, once a
/// response has come back. Begin methods take `&self` except the fetches,
/// which set `is_loading` so a second fetch is refused until the first one
/// is applied or abandoned.
#[derive(Debug, Clone)]
pub struct ListStore {
    scope: ListScope,
    client: FeedClient,
    limit: u32,
    snapshot: ListSnapshot,
}

impl ListStore {
    pub fn new(scope: ListScope, client: FeedClient) -> Self {
        Self::with_snapshot(scope, client, ListSnapshot::default())
    }

    /// Start from a rehydrated snapshot.
    pub fn with_snapshot(scope: ListScope, client: FeedClient, mut snapshot: ListSnapshot) -> Self {
        snapshot.is_loading = false;
        Self {
            scope,
            client,
            limit: DEFAULT_LIMIT,
            snapshot,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn scope(&self) -> ListScope {
        self.scope
    }

    pub fn snapshot(&self) -> &ListSnapshot {
        &self.snapshot
    }

    pub fn client_mut(&mut self) -> &mut FeedClient {
        &mut self.client
    }

    /// Drop all items and counters, keeping scope and client.
    pub fn reset(&mut self) {
        self.snapshot = ListSnapshot::default();
    }

    /// Begin fetching `page`. Returns `Ok(None)` while another fetch is
    /// outstanding. The returned `Pending` must be applied, or released with
    /// `abandon_fetch`, before the next fetch can start.
    pub fn fetch_page(&mut self, page: u32, limit: Option<u32>, scope_id: &str) -> Result<Option<Pending>, ApiError> {
        if self.snapshot.is_loading {
            tracing::debug!(scope = self.scope.slice_name(), page, "fetch skipped, already loading");
            return Ok(None);
        }
        let request = self
            .client
            .build_fetch_page(self.scope, scope_id, page, limit.unwrap_or(self.limit))?;
        self.snapshot.is_loading = true;
        Ok(Some(Pending {
            request,
            mutation: Mutation::FetchPage { page },
        }))
    }

    /// Begin fetching the page after the last one, if the server has more.
    pub fn fetch_next(&mut self, scope_id: &str) -> Result<Option<Pending>, ApiError> {
        if !self.snapshot.has_more() {
            return Ok(None);
        }
        let Some(next) = self.snapshot.page.checked_add(1) else {
            return Ok(None);
        };
        self.fetch_page(next, None, scope_id)
    }

    /// Release the fetch gate for a `Pending` that will never be applied.
    pub fn abandon_fetch(&mut self) {
        if self.snapshot.is_loading {
            tracing::debug!(scope = self.scope.slice_name(), "fetch abandoned");
            self.snapshot.is_loading = false;
        }
    }

    pub fn create_post(&self, draft: &PostDraft) -> Result<Pending, ApiError> {
        Ok(Pending {
            request: self.client.build_create_post(self.scope, draft)?,
            mutation: Mutation::Create,
        })
    }

    pub fn edit_post(&self, id: &str, edit: &PostEdit) -> Result<Pending, ApiError> {
        Ok(Pending {
            request: self.client.build_edit_post(self.scope, id, edit)?,
            mutation: Mutation::Edit { id: id.to_string() },
        })
    }

    pub fn delete_post(&self, id: &str) -> Result<Pending, ApiError> {
        Ok(Pending {
            request: self.client.build_delete_post(self.scope, id)?,
            mutation: Mutation::Delete { id: id.to_string() },
        })
    }

    pub fn toggle_like(&self, id: &str, user_id: &str) -> Result<Pending, ApiError> {
        Ok(Pending {
            request: self.client.build_toggle_like(self.scope, id, user_id)?,
            mutation: Mutation::ToggleLike {
                id: id.to_string(),
                user_id: user_id.to_string(),
            },
        })
    }

    pub fn add_comment(&self, id: &str, user_id: &str, text: &str) -> Result<Pending, ApiError> {
        Ok(Pending {
            request: self.client.build_add_comment(self.scope, id, user_id, text)?,
            mutation: Mutation::AddComment { id: id.to_string() },
        })
    }

    pub fn increment_share(&self, id: &str) -> Result<Pending, ApiError> {
        Ok(Pending {
            request: self.client.build_increment_share(self.scope, id)?,
            mutation: Mutation::IncrementShare { id: id.to_string() },
        })
    }

    /// Ask to join a community. Success has no local effect.
    pub fn request_join(&self, community_id: &str, user_id: &str) -> Result<Pending, ApiError> {
        Ok(Pending {
            request: self.client.build_request_join(community_id, user_id)?,
            mutation: Mutation::Acknowledge,
        })
    }

    /// Send `pending` through `transport` and apply the outcome.
    pub fn dispatch<T: Transport + ?Sized>(&mut self, pending: Pending, transport: &T) -> Result<(), ApiError> {
        let outcome = transport.execute(&pending.request);
        self.apply(pending.mutation, outcome)
    }

    /// Patch the snapshot from a finished request. Failures are recorded in
    /// `error` and returned; `items` are untouched on failure.
    pub fn apply(&mut self, mutation: Mutation, outcome: Result<HttpResponse, TransportError>) -> Result<(), ApiError> {
        if matches!(mutation, Mutation::FetchPage { .. }) {
            self.snapshot.is_loading = false;
        }
        let result = outcome
            .map_err(ApiError::from)
            .and_then(|response| self.patch(&mutation, response));
        match &result {
            Ok(()) => self.snapshot.error = None,
            Err(err) => {
                tracing::warn!(scope = self.scope.slice_name(), ?mutation, error = %err, "request failed");
                self.snapshot.error = Some(err.user_message());
            }
        }
        result
    }

    fn patch(&mut self, mutation: &Mutation, response: HttpResponse) -> Result<(), ApiError> {
        let client = &self.client;
        let snapshot = &mut self.snapshot;
        let found = match mutation {
            Mutation::FetchPage { page } => {
                let fetched = client.parse_fetch_page(response)?;
                tracing::info!(
                    scope = self.scope.slice_name(),
                    page,
                    received = fetched.posts.len(),
                    total_pages = fetched.total_pages,
                    "page loaded"
                );
                snapshot.merge_page(*page, fetched);
                true
            }
            Mutation::Create => {
                snapshot.prepend(client.parse_create_post(response)?);
                true
            }
            Mutation::Edit { id } => snapshot.replace(id, client.parse_edit_post(response)?),
            Mutation::Delete { id } => {
                client.parse_ack(response)?;
                snapshot.remove(id);
                true
            }
            Mutation::ToggleLike { id, user_id } => {
                client.parse_ack(response)?;
                snapshot.toggle_like(id, user_id)
            }
            Mutation::AddComment { id } => {
                let comment = client.parse_add_comment(response)?;
                snapshot.push_comment(id, comment)
            }
            Mutation::IncrementShare { id } => {
                client.parse_ack(response)?;
                snapshot.increment_share(id)
            }
            Mutation::Acknowledge => {
                client.parse_ack(response)?;
                true
            }
        };
        if !found {
            tracing::debug!(scope = self.scope.slice_name(), ?mutation, "target not in list, dropped");
        }
        Ok(())
    }
}
