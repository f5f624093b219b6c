//! Application state container: session plus the two post lists.
//!
//! # Design
//! `AppState` is built explicitly with `init` and handed by `&mut` to
//! whatever drives it; there is no process-wide instance. `persisted()`
//! produces the whitelisted branches written to disk, and `init` accepts the
//! same shape back.

use serde::{Deserialize, Serialize};

use crate::client::{FeedClient, ListScope};
use crate::config::ClientConfig;
use crate::store::{ListSnapshot, ListStore};
use crate::types::UserSummary;

/// The `auth` branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

/// What survives a restart, keyed by slice name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub auth: SessionState,
    pub posts: ListSnapshot,
    pub commposts: ListSnapshot,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub auth: SessionState,
    pub posts: ListStore,
    pub commposts: ListStore,
}

impl AppState {
    /// Build the container, optionally from a rehydrated state.
    pub fn init(config: &ClientConfig, persisted: Option<PersistedState>) -> Self {
        let PersistedState {
            auth,
            posts,
            commposts,
        } = persisted.unwrap_or_default();
        let client = FeedClient::new(&config.base_url).with_token(auth.token.clone());
        tracing::info!(
            base_url = client.base_url(),
            posts = posts.items.len(),
            commposts = commposts.items.len(),
            signed_in = auth.is_signed_in(),
            "state initialized"
        );
        Self {
            posts: ListStore::with_snapshot(ListScope::Posts, client.clone(), posts).with_limit(config.page_limit),
            commposts: ListStore::with_snapshot(ListScope::Community, client, commposts)
                .with_limit(config.page_limit),
            auth,
        }
    }

    pub fn list(&self, scope: ListScope) -> &ListStore {
        match scope {
            ListScope::Posts => &self.posts,
            ListScope::Community => &self.commposts,
        }
    }

    pub fn list_mut(&mut self, scope: ListScope) -> &mut ListStore {
        match scope {
            ListScope::Posts => &mut self.posts,
            ListScope::Community => &mut self.commposts,
        }
    }

    /// Store a new session and attach its token to every request.
    pub fn sign_in(&mut self, session: SessionState) {
        self.set_token(session.token.clone());
        self.auth = session;
    }

    /// Logout: clear every branch.
    pub fn reset(&mut self) {
        tracing::info!("state reset");
        self.auth = SessionState::default();
        self.set_token(None);
        self.posts.reset();
        self.commposts.reset();
    }

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            auth: self.auth.clone(),
            posts: self.posts.snapshot().clone(),
            commposts: self.commposts.snapshot().clone(),
        }
    }

    fn set_token(&mut self, token: Option<String>) {
        self.posts.client_mut().set_token(token.clone());
        self.commposts.client_mut().set_token(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Post, UserSummary};

    fn user() -> UserSummary {
        UserSummary {
            id: "u1".to_string(),
            display_name: "Ada".to_string(),
            avatar: None,
        }
    }

    fn session() -> SessionState {
        SessionState {
            token: Some("tok".to_string()),
            user: Some(user()),
        }
    }

    fn snapshot_with(id: &str) -> ListSnapshot {
        ListSnapshot {
            items: vec![Post {
                id: id.to_string(),
                author: user(),
                content: None,
                media: None,
                likes: Default::default(),
                comments: Vec::new(),
                shares: 0,
                views: 0,
            }],
            page: 1,
            total_pages: 4,
            is_loading: true,
            error: None,
        }
    }

    #[test]
    fn init_rehydrates_every_branch() {
        let persisted = PersistedState {
            auth: session(),
            posts: snapshot_with("p1"),
            commposts: snapshot_with("c1"),
        };
        let state = AppState::init(&ClientConfig::default(), Some(persisted));
        assert!(state.auth.is_signed_in());
        assert_eq!(state.posts.snapshot().items[0].id, "p1");
        assert_eq!(state.list(ListScope::Community).snapshot().items[0].id, "c1");
        assert!(!state.posts.snapshot().is_loading);
    }

    #[test]
    fn rehydrated_token_is_sent() {
        let persisted = PersistedState {
            auth: session(),
            ..PersistedState::default()
        };
        let state = AppState::init(&ClientConfig::default(), Some(persisted));
        let pending = state.posts.increment_share("p1").unwrap();
        assert_eq!(pending.request.header("authorization"), Some("Bearer tok"));
    }

    #[test]
    fn sign_in_then_reset() {
        let mut state = AppState::init(&ClientConfig::default(), None);
        state.sign_in(session());
        assert_eq!(state.auth.user_id(), Some("u1"));
        let pending = state.commposts.increment_share("p1").unwrap();
        assert_eq!(pending.request.header("authorization"), Some("Bearer tok"));

        *state.list_mut(ListScope::Posts) = ListStore::with_snapshot(
            ListScope::Posts,
            FeedClient::new("http://x"),
            snapshot_with("p1"),
        );
        state.reset();
        assert_eq!(state.persisted(), PersistedState::default());
        let pending = state.commposts.increment_share("p1").unwrap();
        assert!(pending.request.header("authorization").is_none());
    }

    #[test]
    fn persisted_layout_uses_slice_names() {
        let state = AppState::init(&ClientConfig::default(), None);
        let json = serde_json::to_value(state.persisted()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["auth", "commposts", "posts"]);
    }
}
