mod cake_list;
mod cake_sync;

pub use cake_list::{CakeListState, CakeListStore, CAKE_PAGE_SIZE};
pub use cake_sync::{CakeSync, FetchOutcome};

use crate::api::ApiClient;
use crate::forms::{LoginErrors, LoginInput};
use crate::models::Cake;
use crate::session::SessionState;
use leptos::prelude::*;

/// Transient message strip shown at the bottom of the screen.
#[derive(Clone, Copy)]
pub struct Notifications {
    message: RwSignal<String>,
    visible: RwSignal<bool>,
}

impl Notifications {
    pub fn new() -> Self {
        Self {
            message: RwSignal::new(String::new()),
            visible: RwSignal::new(false),
        }
    }

    pub fn show(&self, message: impl Into<String>) {
        self.message.set(message.into());
        self.visible.set(true);
    }

    /// Keeps the last message so it can fade out.
    pub fn hide(&self) {
        self.visible.set(false);
    }

    pub fn message(&self) -> Signal<String> {
        self.message.into()
    }

    pub fn visible(&self) -> Signal<bool> {
        self.visible.into()
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new()
    }
}

/// What the confirmation dialog runs when accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingAction {
    DeleteCake { id: String },
    DiscardForm,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
    pub action_title: String,
    pub action: PendingAction,
}

/// Single modal confirmation. Asking again replaces the open prompt.
#[derive(Clone, Copy)]
pub struct ConfirmDialog {
    prompt: RwSignal<Option<ConfirmPrompt>>,
}

impl ConfirmDialog {
    pub fn new() -> Self {
        Self {
            prompt: RwSignal::new(None),
        }
    }

    pub fn prompt(&self) -> Signal<Option<ConfirmPrompt>> {
        self.prompt.into()
    }

    pub fn is_open(&self) -> bool {
        self.prompt.with_untracked(Option::is_some)
    }

    pub fn ask_delete(&self, cake: &Cake) {
        self.prompt.set(Some(ConfirmPrompt {
            title: "Hapus Kue".to_string(),
            message: format!("Apakah Anda yakin ingin menghapus {}?", cake.name),
            action_title: "Hapus".to_string(),
            action: PendingAction::DeleteCake {
                id: cake.id.clone(),
            },
        }));
    }

    pub fn ask_discard_form(&self) {
        self.prompt.set(Some(ConfirmPrompt {
            title: "Keluar dari formulir".to_string(),
            message: "Apakah Anda yakin?".to_string(),
            action_title: "Keluar".to_string(),
            action: PendingAction::DiscardForm,
        }));
    }

    pub fn cancel(&self) {
        self.prompt.set(None);
    }

    /// Closes the dialog and runs its action. Returns the accepted action
    /// when it went through, `None` when nothing was open or it failed.
    pub async fn confirm(&self, sync: &CakeSync) -> Option<PendingAction> {
        let prompt = self.prompt.get_untracked()?;
        self.prompt.set(None);

        match &prompt.action {
            PendingAction::DeleteCake { id } => {
                if !sync.submit_delete(id).await {
                    return None;
                }
            }
            PendingAction::DiscardForm => {}
        }
        Some(prompt.action)
    }
}

impl Default for ConfirmDialog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub session: SessionState,
    pub cakes: CakeListStore,
    pub sync: CakeSync,
    pub notifications: Notifications,
    pub dialog: ConfirmDialog,
}

impl AppState {
    /// Wires the stores around `api`. The session is the one behind its
    /// credential store.
    pub fn new(api: ApiClient, cakes: CakeListStore) -> Self {
        let notifications = Notifications::new();
        let session = api.credentials().session().clone();
        let sync = CakeSync::new(api.clone(), cakes, notifications);
        Self {
            api,
            session,
            cakes,
            sync,
            notifications,
            dialog: ConfirmDialog::new(),
        }
    }

    /// Validates `input` locally, then logs in.
    ///
    /// `Err` carries field errors and means no request was sent. `Ok(false)`
    /// means the server refused; the reason is in the notifications.
    pub async fn login(&self, input: &LoginInput) -> Result<bool, LoginErrors> {
        let req = input.validate()?;
        match self.api.login(&req.username, &req.password).await {
            Ok(_) => {
                self.cakes.reset();
                Ok(true)
            }
            Err(e) => {
                log::warn!("login failed: {e}");
                self.notifications.show(e.user_message());
                Ok(false)
            }
        }
    }

    pub fn logout(&self) {
        if let Err(e) = self.api.logout() {
            self.notifications.show(e.user_message());
        }
        self.cakes.reset();
        self.dialog.cancel();
        log::info!("logged out");
    }
}

#[derive(Clone)]
pub struct AppContext(pub AppState);

/// The app state provided at the root, if any.
pub fn use_app_state() -> Option<AppState> {
    use_context::<AppContext>().map(|ctx| ctx.0)
}
