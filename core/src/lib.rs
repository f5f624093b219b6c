//! Client core for the social feed API.
//!
//! # Overview
//! Fetches paginated post lists, applies like/comment/share/edit/delete
//! mutations once the server confirms them, and persists the result locally
//! so the next start can show the last known feed before the network answers.
//!
//! # Design
//! - `FeedClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network; `Transport` is the I/O seam and
//!   `UreqTransport` the production implementation.
//! - `ListStore` owns one `ListSnapshot` and splits every operation into a
//!   begin step that returns a `Pending` and an `apply` step that patches
//!   the snapshot from the response.
//! - `AppState` is the explicitly constructed container (session plus the
//!   personal and community lists); `Persister` saves and restores it.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod persist;
pub mod state;
pub mod store;
pub mod transport;
pub mod types;

pub use client::{FeedClient, ListScope};
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, PersistError, TransportError};
pub use http::{FormPart, HttpBody, HttpMethod, HttpRequest, HttpResponse, PartValue};
pub use persist::Persister;
pub use state::{AppState, PersistedState, SessionState};
pub use store::{ListSnapshot, ListStore, Mutation, Pending};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Attachment, Comment, Media, MediaKind, Post, PostDraft, PostEdit, PostPage, UserSummary, DEFAULT_LIMIT,
};
