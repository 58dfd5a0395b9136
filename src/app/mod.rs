use crate::api::{ApiClient, EnvConfig};
use crate::session::SessionState;
use crate::state::{AppContext, AppState, CakeListStore};
use crate::storage::{CredentialBackend, CredentialStore};
use leptos::callback::Callback;
use leptos::prelude::*;
use std::sync::Arc;

pub const LOGIN_PATH: &str = "/login";

#[cfg(target_arch = "wasm32")]
fn credential_backend() -> Arc<dyn CredentialBackend> {
    Arc::new(crate::storage::LocalStorageBackend)
}

// Outside the browser, `CREDENTIALS_PATH` selects a file; otherwise tokens
// live only as long as the process.
#[cfg(not(target_arch = "wasm32"))]
fn credential_backend() -> Arc<dyn CredentialBackend> {
    match std::env::var("CREDENTIALS_PATH") {
        Ok(path) if !path.trim().is_empty() => Arc::new(crate::storage::FileBackend::new(path)),
        _ => Arc::new(crate::storage::MemoryBackend::default()),
    }
}

#[cfg(target_arch = "wasm32")]
fn redirect_to_login() {
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.location().set_href(LOGIN_PATH) {
            log::error!("redirect to {LOGIN_PATH} failed: {e:?}");
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn redirect_to_login() {
    log::info!("session expired, login required at {LOGIN_PATH}");
}

/// Builds the application state over `backend`, restoring any stored session.
pub fn build_app_state(config: EnvConfig, backend: Arc<dyn CredentialBackend>) -> AppState {
    let credentials = CredentialStore::new(backend, SessionState::new());
    match credentials.restore() {
        Some(role) => log::info!("restored session as {role}"),
        None => log::debug!("no stored session"),
    }

    let cakes = CakeListStore::new();
    let api = ApiClient::new(config, credentials).on_session_expired(Callback::new(move |_| {
        cakes.reset();
        redirect_to_login();
    }));

    AppState::new(api, cakes)
}

/// Creates the app state from the environment and provides it as context.
pub fn provide_app_context() -> AppState {
    let state = build_app_state(EnvConfig::new(), credential_backend());
    provide_context(AppContext(state.clone()));
    state
}
