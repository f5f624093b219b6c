//! Local persistence of `PersistedState` with a debounced flush.
//!
//! # Design
//! The caller marks the state dirty after every change and polls
//! `flush_if_due` from its idle/timer hook; the write happens once the
//! debounce window has elapsed since the first unflushed change.
//! `shutdown` always writes. Files are replaced atomically so a crash
//! mid-write leaves the previous state intact.
//!
//! Loading decodes each branch on its own: one corrupt branch falls back to
//! its default without discarding the others.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::PersistError;
use crate::state::{PersistedState, SessionState};
use crate::store::ListSnapshot;

#[derive(Debug)]
pub struct Persister {
    path: PathBuf,
    debounce: Duration,
    dirty_since: Option<Instant>,
}

impl Persister {
    pub fn new(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            path: path.into(),
            debounce,
            dirty_since: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// Read the state file. A missing file yields the empty state.
    pub fn load(&self) -> Result<PersistedState, PersistError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no saved state");
                return Ok(PersistedState::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(decode(&raw))
    }

    /// Start the debounce window unless one is already open.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.dirty_since.get_or_insert(now);
    }

    /// Write if dirty and the debounce window has elapsed. Returns whether a
    /// write happened.
    pub fn flush_if_due(&mut self, now: Instant, state: &PersistedState) -> Result<bool, PersistError> {
        match self.dirty_since {
            Some(since) if now.saturating_duration_since(since) >= self.debounce => {
                self.flush(state)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Write now, regardless of the debounce window.
    pub fn flush(&mut self, state: &PersistedState) -> Result<(), PersistError> {
        write_atomic(&self.path, &serde_json::to_vec(state)?)?;
        self.dirty_since = None;
        tracing::info!(
            path = %self.path.display(),
            posts = state.posts.items.len(),
            commposts = state.commposts.items.len(),
            "state flushed"
        );
        Ok(())
    }

    /// Final flush on orderly shutdown.
    pub fn shutdown(mut self, state: &PersistedState) -> Result<(), PersistError> {
        self.flush(state)
    }
}

fn decode(raw: &str) -> PersistedState {
    let mut root = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::warn!("saved state is not a JSON object, starting empty");
            return PersistedState::default();
        }
    };
    PersistedState {
        auth: branch::<SessionState>(&mut root, "auth"),
        posts: branch::<ListSnapshot>(&mut root, "posts"),
        commposts: branch::<ListSnapshot>(&mut root, "commposts"),
    }
}

fn branch<T: DeserializeOwned + Default>(root: &mut Map<String, Value>, key: &str) -> T {
    let Some(value) = root.remove(key) else {
        return T::default();
    };
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(branch = key, error = %e, "discarding unreadable branch");
        T::default()
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserSummary;

    const DEBOUNCE: Duration = Duration::from_millis(500);

    fn state() -> PersistedState {
        let mut state = PersistedState::default();
        state.auth.token = Some("tok".to_string());
        state.auth.user = Some(UserSummary {
            id: "u1".to_string(),
            display_name: "Ada".to_string(),
            avatar: None,
        });
        state.posts.page = 2;
        state.posts.total_pages = 5;
        state
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let persister = Persister::new(dir.path().join("state.json"), DEBOUNCE);
        assert_eq!(persister.load().unwrap(), PersistedState::default());
    }

    #[test]
    fn flush_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut persister = Persister::new(dir.path().join("nested/state.json"), DEBOUNCE);
        persister.flush(&state()).unwrap();
        assert_eq!(persister.load().unwrap(), state());
    }

    #[test]
    fn flush_waits_for_debounce() {
        let dir = tempfile::tempdir().unwrap();
        let mut persister = Persister::new(dir.path().join("state.json"), DEBOUNCE);
        let t0 = Instant::now();
        assert!(!persister.flush_if_due(t0, &state()).unwrap());

        persister.mark_dirty(t0);
        persister.mark_dirty(t0 + Duration::from_millis(400));
        assert!(!persister.flush_if_due(t0 + Duration::from_millis(300), &state()).unwrap());
        assert!(!persister.path().exists());

        assert!(persister.flush_if_due(t0 + DEBOUNCE, &state()).unwrap());
        assert!(!persister.is_dirty());
        assert!(persister.path().exists());
        assert!(!persister.flush_if_due(t0 + DEBOUNCE * 4, &state()).unwrap());
    }

    #[test]
    fn shutdown_writes_even_when_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        Persister::new(&path, DEBOUNCE).shutdown(&state()).unwrap();
        assert_eq!(Persister::new(&path, DEBOUNCE).load().unwrap(), state());
    }

    #[test]
    fn corrupt_branch_falls_back_alone() {
        let raw = r#"{
            "auth": {"token": "tok"},
            "posts": {"items": "not a list", "page": 3},
            "commposts": {"items": [], "page": 2, "totalPages": 2}
        }"#;
        let state = decode(raw);
        assert_eq!(state.auth.token.as_deref(), Some("tok"));
        assert_eq!(state.posts, ListSnapshot::default());
        assert_eq!(state.commposts.page, 2);
    }

    #[test]
    fn garbage_file_loads_empty() {
        assert_eq!(decode("{{{"), PersistedState::default());
        assert_eq!(decode("[1,2]"), PersistedState::default());
    }
}
