use crate::models::{Cake, CakeSort};
use leptos::prelude::*;
use std::collections::HashMap;

/// Number of cakes requested per page.
pub const CAKE_PAGE_SIZE: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CakeListState {
    /// Server order, unique by `id`.
    pub cakes: Vec<Cake>,
    /// Next page to fetch; never below 1.
    pub page: u32,
    pub total_pages: u32,
    pub name_filter: String,
    pub sort: CakeSort,
}

impl Default for CakeListState {
    fn default() -> Self {
        Self {
            cakes: Vec::new(),
            page: 1,
            total_pages: 0,
            name_filter: String::new(),
            sort: CakeSort::default(),
        }
    }
}

impl CakeListState {
    /// `false` once the server has reported a page count and we are past it.
    pub fn has_more(&self) -> bool {
        self.total_pages == 0 || self.page <= self.total_pages
    }
}

/// Observable cake list.
///
/// The state signal is private: readers get a read-only [`Signal`] or a
/// snapshot, and writes go through the methods below. Each write notifies
/// subscribers once.
///
/// `generation` is bumped by `reset`/`clear`; a fetch started under an older
/// generation is stale and its response is dropped. `in_flight` holds the
/// generation of the fetch currently outstanding, so at most one fetch runs
/// per generation.
#[derive(Clone, Copy)]
pub struct CakeListStore {
    state: RwSignal<CakeListState>,
    in_flight: RwSignal<Option<u64>>,
    generation: RwSignal<u64>,
}

impl CakeListStore {
    pub fn new() -> Self {
        Self {
            state: RwSignal::new(CakeListState::default()),
            in_flight: RwSignal::new(None),
            generation: RwSignal::new(0),
        }
    }

    /// Tracked view for the presentation layer.
    pub fn state(&self) -> Signal<CakeListState> {
        self.state.into()
    }

    pub fn loading(&self) -> Signal<bool> {
        let in_flight = self.in_flight;
        Signal::derive(move || in_flight.get().is_some())
    }

    pub fn snapshot(&self) -> CakeListState {
        self.state.get_untracked()
    }

    /// Back to defaults, filter and sort included.
    pub fn reset(&self) {
        self.bump_generation();
        self.state.set(CakeListState::default());
    }

    /// Empties the list and rewinds to page 1, keeping filter and sort.
    pub fn clear(&self) {
        self.bump_generation();
        self.state.update(|s| {
            s.cakes.clear();
            s.page = 1;
        });
    }

    /// Merges a fetched page and advances the cursor.
    ///
    /// An id already present is overwritten in place; ids repeated within
    /// `new_cakes` keep the last occurrence.
    pub fn append(&self, new_cakes: Vec<Cake>) {
        self.state.update(|s| {
            let mut index: HashMap<String, usize> = s
                .cakes
                .iter()
                .enumerate()
                .map(|(i, c)| (c.id.clone(), i))
                .collect();

            for cake in new_cakes {
                match index.get(&cake.id) {
                    Some(&i) => s.cakes[i] = cake,
                    None => {
                        index.insert(cake.id.clone(), s.cakes.len());
                        s.cakes.push(cake);
                    }
                }
            }

            s.page = s.page.saturating_add(1);
        });
    }

    /// Drops the cake with `id`; no-op (and no notification) if absent.
    pub fn remove(&self, id: &str) {
        let present = self
            .state
            .with_untracked(|s| s.cakes.iter().any(|c| c.id == id));
        if present {
            self.state.update(|s| s.cakes.retain(|c| c.id != id));
        }
    }

    pub fn set_total_pages(&self, total_pages: u32) {
        self.state.update(|s| s.total_pages = total_pages);
    }

    pub fn set_filter(&self, name_filter: impl Into<String>) {
        let name_filter = name_filter.into();
        self.state.update(|s| s.name_filter = name_filter);
    }

    pub fn set_sort(&self, sort: CakeSort) {
        self.state.update(|s| s.sort = sort);
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.get_untracked()
    }

    fn bump_generation(&self) {
        self.generation.update(|g| *g = g.wrapping_add(1));
    }

    /// Marks a fetch as in flight for the current generation. `None` when
    /// one already is.
    pub(crate) fn begin_fetch(&self) -> Option<FetchGuard> {
        let generation = self.generation();
        if self.in_flight.get_untracked() == Some(generation) {
            return None;
        }
        self.in_flight.set(Some(generation));
        Some(FetchGuard {
            in_flight: self.in_flight,
            generation,
        })
    }
}

impl Default for CakeListStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the in-flight slot when dropped, including on error or when the
/// owning future is dropped.
pub(crate) struct FetchGuard {
    in_flight: RwSignal<Option<u64>>,
    generation: u64,
}

impl FetchGuard {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        let generation = self.generation;
        // A newer generation may own the slot by now.
        let _ = self.in_flight.try_update(|slot| {
            if *slot == Some(generation) {
                *slot = None;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cake(id: &str, name: &str, price: u64) -> Cake {
        Cake {
            id: id.to_string(),
            name: name.to_string(),
            price,
        }
    }

    fn ids(store: &CakeListStore) -> Vec<String> {
        store.snapshot().cakes.into_iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_new_store_defaults() {
        let state = CakeListStore::new().snapshot();
        assert_eq!(state, CakeListState::default());
        assert_eq!(state.page, 1);
        assert_eq!(state.total_pages, 0);
        assert_eq!(state.sort, CakeSort::NameAscending);
        assert!(state.has_more());
    }

    #[test]
    fn test_append_dedups_last_write_wins() {
        let store = CakeListStore::new();
        store.append(vec![cake("a", "A", 1), cake("b", "B", 2)]);
        store.append(vec![cake("c", "C", 3), cake("a", "A2", 10), cake("c", "C2", 30)]);

        let state = store.snapshot();
        assert_eq!(ids(&store), vec!["a", "b", "c"]);
        assert_eq!(state.cakes[0], cake("a", "A2", 10));
        assert_eq!(state.cakes[2], cake("c", "C2", 30));
        assert_eq!(state.page, 3);
    }

    #[test]
    fn test_append_same_page_twice_does_not_duplicate() {
        let store = CakeListStore::new();
        let batch = vec![cake("a", "A", 1), cake("b", "B", 2)];
        store.append(batch.clone());
        store.append(batch);
        assert_eq!(ids(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_append_many_batches_never_duplicates() {
        let store = CakeListStore::new();
        for round in 0..20u64 {
            let batch = (0..5)
                .map(|i| {
                    let id = format!("c{}", (round * 3 + i) % 11);
                    cake(&id, &format!("round {round}"), round)
                })
                .collect();
            store.append(batch);
        }

        let state = store.snapshot();
        let mut seen = std::collections::HashSet::new();
        assert!(state.cakes.iter().all(|c| seen.insert(c.id.clone())));
        for c in &state.cakes {
            let n: u64 = c.id[1..].parse().unwrap();
            let last_round = (0..20u64)
                .rev()
                .find(|r| (0..5).any(|i| (r * 3 + i) % 11 == n))
                .unwrap();
            assert_eq!(c.price, last_round, "cake {}", c.id);
        }
    }

    #[test]
    fn test_reset_restores_defaults() {
        let store = CakeListStore::new();
        store.set_filter("bolu");
        store.set_sort(CakeSort::PriceDescending);
        store.append(vec![cake("a", "A", 1)]);
        store.set_total_pages(4);
        let before = store.generation();

        store.reset();

        assert_eq!(store.snapshot(), CakeListState::default());
        assert_ne!(store.generation(), before);
    }

    #[test]
    fn test_clear_keeps_filter_and_sort() {
        let store = CakeListStore::new();
        store.set_filter("bolu");
        store.set_sort(CakeSort::PriceAscending);
        store.append(vec![cake("a", "A", 1)]);
        store.set_total_pages(2);

        store.clear();

        let state = store.snapshot();
        assert!(state.cakes.is_empty());
        assert_eq!(state.page, 1);
        assert_eq!(state.name_filter, "bolu");
        assert_eq!(state.sort, CakeSort::PriceAscending);
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let store = CakeListStore::new();
        store.append(vec![cake("a", "A", 1), cake("b", "B", 2), cake("c", "C", 3)]);

        store.remove("b");
        assert_eq!(ids(&store), vec!["a", "c"]);

        store.remove("zzz");
        assert_eq!(ids(&store), vec!["a", "c"]);
        assert_eq!(store.snapshot().page, 2);
    }

    #[test]
    fn test_has_more_respects_total_pages() {
        let mut state = CakeListState::default();
        assert!(state.has_more());
        state.total_pages = 2;
        state.page = 2;
        assert!(state.has_more());
        state.page = 3;
        assert!(!state.has_more());
    }

    #[test]
    fn test_fetch_guard_is_exclusive_per_generation() {
        let store = CakeListStore::new();
        let first = store.begin_fetch().expect("first fetch starts");
        assert!(store.begin_fetch().is_none());
        assert!(store.loading().get_untracked());

        store.clear();
        let second = store.begin_fetch().expect("a cleared list may fetch again");
        assert_ne!(first.generation(), second.generation());

        // The stale guard must not release the newer fetch.
        drop(first);
        assert!(store.loading().get_untracked());
        assert!(store.begin_fetch().is_none());

        drop(second);
        assert!(!store.loading().get_untracked());
    }
}
