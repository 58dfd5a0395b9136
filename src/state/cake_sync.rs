use crate::api::{ApiClient, ApiResult, GetCakesQuery};
use crate::models::{Cake, CakeForm, CakeSort};
use crate::state::cake_list::{CakeListStore, CAKE_PAGE_SIZE};
use crate::state::Notifications;

/// What a call to [`CakeSync::fetch_next_page`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// `count` cakes from `page` were merged into the list.
    Appended { page: u32, count: usize },
    /// The server already reported fewer pages than the cursor; no request.
    Exhausted,
    /// A fetch for the same list generation is outstanding; no request.
    Busy,
    /// The list was reset or cleared while the request was in flight; the
    /// response was dropped.
    Stale,
}

/// Keeps a [`CakeListStore`] in step with the backend.
///
/// Responsibilities:
/// - paging through `GET /cakes` with the store's filter and sort
/// - remote writes followed by local reconciliation
/// - turning failures of user-initiated writes into notifications
#[derive(Clone)]
pub struct CakeSync {
    api: ApiClient,
    list: CakeListStore,
    notifications: Notifications,
}

impl CakeSync {
    pub fn new(api: ApiClient, list: CakeListStore, notifications: Notifications) -> Self {
        Self {
            api,
            list,
            notifications,
        }
    }

    pub fn list(&self) -> CakeListStore {
        self.list
    }

    /// Requests the page under the cursor and appends it.
    ///
    /// Errors propagate untouched; the store is only written on success.
    pub async fn fetch_next_page(&self) -> ApiResult<FetchOutcome> {
        let Some(guard) = self.list.begin_fetch() else {
            log::debug!("cake fetch already in flight, skipping");
            return Ok(FetchOutcome::Busy);
        };

        let state = self.list.snapshot();
        if !state.has_more() {
            return Ok(FetchOutcome::Exhausted);
        }

        let query = GetCakesQuery {
            page: state.page,
            limit: CAKE_PAGE_SIZE,
            name_filter: state.name_filter,
            sort: state.sort,
        };
        log::debug!("fetching cakes page {} ({})", query.page, query.sort);

        let page = self.api.get_cakes(&query).await?;

        if self.list.generation() != guard.generation() {
            log::debug!("dropping stale cakes page {}", query.page);
            return Ok(FetchOutcome::Stale);
        }

        let count = page.cakes.len();
        self.list.append(page.cakes);
        self.list.set_total_pages(page.total_pages);
        log::debug!(
            "cakes page {} loaded: {} items, {} pages total",
            query.page,
            count,
            page.total_pages
        );

        Ok(FetchOutcome::Appended {
            page: query.page,
            count,
        })
    }

    /// Drops the loaded cakes and reloads page 1 with the current filter.
    pub async fn refresh_list(&self) -> ApiResult<FetchOutcome> {
        self.list.clear();
        self.fetch_next_page().await
    }

    /// Applies a new filter/sort and reloads from page 1.
    pub async fn apply_filter(
        &self,
        name_filter: impl Into<String>,
        sort: CakeSort,
    ) -> ApiResult<FetchOutcome> {
        self.list.set_filter(name_filter);
        self.list.set_sort(sort);
        self.refresh_list().await
    }

    pub async fn get(&self, id: &str) -> ApiResult<Cake> {
        self.api.get_cake(id).await
    }

    pub async fn create(&self, form: &CakeForm) -> ApiResult<()> {
        let cake = self.api.create_cake(form).await?;
        log::info!("created cake {}", cake.id);
        self.refresh_list().await?;
        Ok(())
    }

    pub async fn edit(&self, id: &str, form: &CakeForm) -> ApiResult<()> {
        self.api.edit_cake(id, form).await?;
        log::info!("updated cake {id}");
        self.refresh_list().await?;
        Ok(())
    }

    /// Local removal is authoritative once the server accepts the delete.
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.api.delete_cake(id).await?;
        log::info!("deleted cake {id}");
        self.list.remove(id);
        Ok(())
    }

    /// `create` for a form submission: failures become a notification.
    pub async fn submit_create(&self, form: &CakeForm) -> bool {
        self.report(self.create(form).await)
    }

    pub async fn submit_edit(&self, id: &str, form: &CakeForm) -> bool {
        self.report(self.edit(id, form).await)
    }

    pub async fn submit_delete(&self, id: &str) -> bool {
        self.report(self.delete(id).await)
    }

    /// `fetch_next_page` for a "load more" trigger.
    pub async fn load_more(&self) -> bool {
        self.report(self.fetch_next_page().await.map(|_| ()))
    }

    fn report(&self, result: ApiResult<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                log::warn!("cake request failed: {e}");
                self.notifications.show(e.user_message());
                false
            }
        }
    }
}
