use crate::api::{ApiError, ApiResult};
use crate::models::Role;
use crate::session::SessionState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Durable string key-value storage for credentials.
///
/// Reads are best-effort (`None` on any failure); writes and removals report
/// failure so token loss is never silent.
pub trait CredentialBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> ApiResult<()>;
    fn remove(&self, key: &str) -> ApiResult<()>;

    /// Writes every entry or none of them.
    ///
    /// The default writes one key at a time and, when a write fails, puts the
    /// keys already written back to their previous values.
    fn set_all(&self, entries: &[(&str, &str)]) -> ApiResult<()> {
        let previous: Vec<(&str, Option<String>)> =
            entries.iter().map(|(key, _)| (*key, self.get(key))).collect();

        for (i, (key, value)) in entries.iter().enumerate() {
            if let Err(e) = self.set(key, value) {
                for (key, old) in previous[..i].iter().rev() {
                    let undo = match old {
                        Some(old) => self.set(key, old),
                        None => self.remove(key),
                    };
                    if let Err(undo) = undo {
                        log::error!("failed to roll back {key}: {undo}");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Browser `localStorage`. Survives reloads and restarts of the app.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorageBackend;

impl LocalStorageBackend {
    fn storage() -> ApiResult<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or_else(|| ApiError::storage("localStorage is unavailable"))
    }
}

impl CredentialBackend for LocalStorageBackend {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage().ok()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|_| ApiError::storage(format!("failed to write {key}")))
    }

    fn remove(&self, key: &str) -> ApiResult<()> {
        Self::storage()?
            .remove_item(key)
            .map_err(|_| ApiError::storage(format!("failed to remove {key}")))
    }
}

/// JSON file holding a flat string map. Used by native builds.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone, Debug)]
pub struct FileBackend {
    path: std::path::PathBuf,
    lock: Arc<Mutex<()>>,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileBackend {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn load(&self) -> HashMap<String, String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn store(&self, map: &HashMap<String, String>) -> ApiResult<()> {
        let raw = serde_json::to_string(map).map_err(ApiError::storage)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(ApiError::storage)?;
        }
        std::fs::write(&self.path, raw).map_err(ApiError::storage)
    }

    fn modify(&self, f: impl FnOnce(&mut HashMap<String, String>)) -> ApiResult<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| ApiError::storage("credential file lock poisoned"))?;
        let mut map = self.load();
        f(&mut map);
        self.store(&map)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl CredentialBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().ok()?;
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        self.modify(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> ApiResult<()> {
        self.modify(|map| {
            map.remove(key);
        })
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> ApiResult<()> {
        self.modify(|map| {
            for (key, value) in entries {
                map.insert(key.to_string(), value.to_string());
            }
        })
    }
}

/// Process-local map. Nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl CredentialBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| ApiError::storage("memory store poisoned"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ApiResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| ApiError::storage("memory store poisoned"))?;
        items.remove(key);
        Ok(())
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> ApiResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| ApiError::storage("memory store poisoned"))?;
        for (key, value) in entries {
            items.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// Access/refresh token persistence. Every write recomputes the session role.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn CredentialBackend>,
    session: SessionState,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn CredentialBackend>, session: SessionState) -> Self {
        Self { backend, session }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Persists both tokens together and returns the role decoded from
    /// `access`.
    ///
    /// On failure the role is recomputed from whatever access token is left
    /// in storage, so the session never disagrees with the stored pair.
    pub fn save(&self, access: &str, refresh: &str) -> ApiResult<Option<Role>> {
        if let Err(e) = self
            .backend
            .set_all(&[(ACCESS_TOKEN_KEY, access), (REFRESH_TOKEN_KEY, refresh)])
        {
            log::error!("failed to persist credentials: {e}");
            self.restore();
            return Err(e);
        }
        Ok(self.session.apply(Some(access)))
    }

    pub fn access_token(&self) -> Option<String> {
        self.backend
            .get(ACCESS_TOKEN_KEY)
            .filter(|t| !t.trim().is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.backend
            .get(REFRESH_TOKEN_KEY)
            .filter(|t| !t.trim().is_empty())
    }

    /// Recomputes the role from whatever access token is on disk.
    pub fn restore(&self) -> Option<Role> {
        self.session.apply(self.access_token().as_deref())
    }

    /// Deletes both tokens. The role is reset even if a removal fails.
    pub fn clear(&self) -> ApiResult<()> {
        let access = self.backend.remove(ACCESS_TOKEN_KEY);
        let refresh = self.backend.remove(REFRESH_TOKEN_KEY);
        self.session.apply(None);
        access.and(refresh).inspect_err(|e| {
            log::error!("failed to clear credentials: {e}");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::token_with;

    fn memory_store() -> (CredentialStore, MemoryBackend) {
        let backend = MemoryBackend::default();
        let store = CredentialStore::new(Arc::new(backend.clone()), SessionState::new());
        (store, backend)
    }

    struct FailingBackend;

    impl CredentialBackend for FailingBackend {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, key: &str, _value: &str) -> ApiResult<()> {
            Err(ApiError::storage(format!("disk full writing {key}")))
        }

        fn remove(&self, _key: &str) -> ApiResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_save_persists_both_tokens_and_resolves_role() {
        let (store, backend) = memory_store();
        let access = token_with("OWNER", 4_000_000_000);

        let role = store.save(&access, "refresh-1").expect("save should succeed");

        assert_eq!(role, Some(Role::Owner));
        assert_eq!(store.session().role_untracked(), Some(Role::Owner));
        assert_eq!(backend.get(ACCESS_TOKEN_KEY).as_deref(), Some(access.as_str()));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn test_clear_removes_tokens_and_role() {
        let (store, _) = memory_store();
        store
            .save(&token_with("EMPLOYEE", 4_000_000_000), "r")
            .expect("save should succeed");

        store.clear().expect("clear should succeed");

        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert_eq!(store.session().role_untracked(), None);
    }

    #[test]
    fn test_save_failure_propagates_and_keeps_role() {
        let session = SessionState::new();
        let store = CredentialStore::new(Arc::new(FailingBackend), session);

        let err = store
            .save(&token_with("OWNER", 4_000_000_000), "r")
            .expect_err("write failure must surface");

        assert_eq!(err.kind, crate::api::ApiErrorKind::Storage);
        assert_eq!(store.session().role_untracked(), None);
    }

    /// Accepts the access token but refuses the refresh token.
    #[derive(Default)]
    struct RefreshRejectingBackend {
        inner: MemoryBackend,
    }

    impl CredentialBackend for RefreshRejectingBackend {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> ApiResult<()> {
            if key == REFRESH_TOKEN_KEY {
                return Err(ApiError::storage("quota exceeded"));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> ApiResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_half_written_save_rolls_back() {
        let backend = Arc::new(RefreshRejectingBackend::default());
        let employee = token_with("EMPLOYEE", 4_000_000_000);
        backend.inner.set(ACCESS_TOKEN_KEY, &employee).unwrap();
        backend.inner.set(REFRESH_TOKEN_KEY, "old-refresh").unwrap();
        let store = CredentialStore::new(backend, SessionState::new());
        assert_eq!(store.restore(), Some(Role::Employee));

        let err = store
            .save(&token_with("OWNER", 4_000_000_000), "new-refresh")
            .expect_err("refresh write fails");

        assert_eq!(err.kind, crate::api::ApiErrorKind::Storage);
        assert_eq!(store.access_token().as_deref(), Some(employee.as_str()));
        assert_eq!(store.refresh_token().as_deref(), Some("old-refresh"));
        assert_eq!(store.session().role_untracked(), Some(Role::Employee));
    }

    #[test]
    fn test_half_written_first_save_leaves_nothing() {
        let store = CredentialStore::new(
            Arc::new(RefreshRejectingBackend::default()),
            SessionState::new(),
        );

        store
            .save(&token_with("OWNER", 4_000_000_000), "r")
            .expect_err("refresh write fails");

        assert!(store.access_token().is_none());
        assert_eq!(store.session().role_untracked(), None);
    }

    #[test]
    fn test_restore_reads_access_token() {
        let (store, backend) = memory_store();
        backend
            .set(ACCESS_TOKEN_KEY, &token_with("OWNER", 4_000_000_000))
            .unwrap();

        assert_eq!(store.restore(), Some(Role::Owner));
    }

    #[test]
    fn test_blank_tokens_read_as_missing() {
        let (store, backend) = memory_store();
        backend.set(ACCESS_TOKEN_KEY, "  ").unwrap();
        assert!(store.access_token().is_none());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_backend_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("credentials.json");

        let first = FileBackend::new(&path);
        first.set(ACCESS_TOKEN_KEY, "a1").unwrap();
        first.set(REFRESH_TOKEN_KEY, "r1").unwrap();

        let reopened = FileBackend::new(&path);
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).as_deref(), Some("a1"));
        assert_eq!(reopened.get(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));

        reopened
            .set_all(&[(ACCESS_TOKEN_KEY, "a2"), (REFRESH_TOKEN_KEY, "r2")])
            .unwrap();
        assert_eq!(FileBackend::new(&path).get(ACCESS_TOKEN_KEY).as_deref(), Some("a2"));

        reopened.set(REFRESH_TOKEN_KEY, "r1").unwrap();
        reopened.remove(ACCESS_TOKEN_KEY).unwrap();
        assert!(FileBackend::new(&path).get(ACCESS_TOKEN_KEY).is_none());
        assert_eq!(FileBackend::new(&path).get(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
    }
}
