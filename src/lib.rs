pub mod api;
pub mod app;
pub mod forms;
pub mod models;
pub mod session;
pub mod state;
pub mod storage;
pub mod util;

pub use api::{ApiClient, ApiError, ApiErrorKind, ApiResult, EnvConfig};
pub use app::{build_app_state, provide_app_context};
pub use models::{Cake, CakeForm, CakePage, CakeSort, Role, TokenPair};
pub use session::SessionState;
pub use state::{
    AppContext, AppState, CakeListState, CakeListStore, CakeSync, ConfirmDialog, FetchOutcome,
    Notifications, PendingAction,
};
pub use storage::{CredentialBackend, CredentialStore};

use leptos::reactive::owner::Owner;
use std::cell::RefCell;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

thread_local! {
    /// Owner of the app context; lives as long as the page.
    static ROOT_OWNER: RefCell<Option<Owner>> = const { RefCell::new(None) };
}

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    #[cfg(target_arch = "wasm32")]
    wasm_logger::init(wasm_logger::Config::new(log::Level::Debug));

    let owner = Owner::new();
    let state = owner.with(provide_app_context);
    ROOT_OWNER.with(|root| *root.borrow_mut() = Some(owner));

    log::info!(
        "storefront client ready against {} (signed in: {})",
        state.api.config().base_url(),
        state.session.is_authenticated()
    );
}
