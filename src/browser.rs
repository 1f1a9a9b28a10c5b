//! Listing screen model.
//!
//! A [`ListingBrowser`] is what one list screen owns: the fetched listings,
//! the user's filter and sort choices, and the windowing policy. Data only
//! flows one way (fetch, filter, sort, window); toggles patch the loaded
//! array in place without refetching.

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{ApiError, ListingQuery, ListingsApi};
use crate::engine::window::DEFAULT_MAX_BUTTONS;
use crate::engine::{
    self, FilterCriteria, InfiniteWindow, PageButton, PageRange, PageState, SortField, SortSpec,
};
use crate::models::{Flag, Listing};
use crate::notify::{Notification, Notifier};
use crate::store::ListingStore;
use crate::toggle::{self, ToggleOptions, ToggleOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseMode {
    /// The backend owns page boundaries; changing page refetches.
    ServerPaged(PageState),
    /// The whole result is loaded and shown as a growing prefix.
    Infinite(InfiniteWindow),
}

/// What the pagination area of the screen should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationDisplay {
    Pages {
        range: PageRange,
        buttons: Vec<PageButton>,
    },
    /// Client-side filters narrow the loaded page; page numbers are hidden.
    Filtered { shown: usize },
    Window { shown: usize, matched: usize },
}

pub struct ListingBrowser {
    api: Arc<dyn ListingsApi>,
    notifier: Arc<dyn Notifier>,
    store: ListingStore,
    criteria: FilterCriteria,
    sort: SortSpec,
    mode: BrowseMode,
    toggle_options: ToggleOptions,
}

impl ListingBrowser {
    /// Server-paginated screen, newest listings first.
    pub fn paged(api: Arc<dyn ListingsApi>, notifier: Arc<dyn Notifier>, page_size: usize) -> Self {
        Self::with_mode(api, notifier, BrowseMode::ServerPaged(PageState::new(page_size)))
            .with_sort(SortSpec::newest_first())
    }

    /// Infinite-scroll screen, cheapest listings first.
    pub fn infinite(api: Arc<dyn ListingsApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_mode(api, notifier, BrowseMode::Infinite(InfiniteWindow::default()))
    }

    pub fn with_mode(
        api: Arc<dyn ListingsApi>,
        notifier: Arc<dyn Notifier>,
        mode: BrowseMode,
    ) -> Self {
        Self {
            api,
            notifier,
            store: ListingStore::new(),
            criteria: FilterCriteria::default(),
            sort: SortSpec::default(),
            mode,
            toggle_options: ToggleOptions::default(),
        }
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Initial filter, applied before the first fetch.
    pub fn with_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn with_toggle_options(mut self, options: ToggleOptions) -> Self {
        self.toggle_options = options;
        self
    }

    pub fn store(&self) -> &ListingStore {
        &self.store
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn mode(&self) -> BrowseMode {
        self.mode
    }

    /// Fetch the current page (or the whole set) and replace local data.
    ///
    /// On failure the previous data stays on screen and a notification is
    /// shown; nothing is retried.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let result = self.fetch().await;
        if let Err(err) = &result {
            self.notifier
                .notify(Notification::error(format!("Could not load listings: {err}")));
        }
        result
    }

    async fn fetch(&mut self) -> Result<(), ApiError> {
        match &mut self.mode {
            BrowseMode::ServerPaged(page) => {
                let mut query = ListingQuery::page(page.current_page())
                    .with_ordering(self.sort)
                    .with_page_size(page.page_size());
                if let Some(search) = self.criteria.search_query() {
                    query = query.with_search(search);
                }

                let response = self.api.list_page(&query).await?;
                page.set_total(response.count);
                info!(
                    page = page.current_page(),
                    total = response.count,
                    loaded = response.results.len(),
                    "Loaded listing page"
                );
                self.store.replace(response.results);
            }
            BrowseMode::Infinite(window) => {
                let listings = self.api.list_sorted(&self.sort).await?;
                info!(loaded = listings.len(), "Loaded listings");
                self.store.replace(listings);
                window.reset();
            }
        }
        Ok(())
    }

    /// Replace the filter. Refetches when the server-side search changed.
    pub async fn set_criteria(&mut self, criteria: FilterCriteria) -> Result<(), ApiError> {
        let changed = criteria != self.criteria;
        let search_changed = criteria.search_query() != self.criteria.search_query();
        self.criteria = criteria;

        let needs_fetch = match &mut self.mode {
            BrowseMode::Infinite(window) => {
                if changed {
                    window.reset();
                }
                false
            }
            BrowseMode::ServerPaged(page) => {
                if search_changed {
                    page.go_to(1);
                }
                search_changed
            }
        };

        if needs_fetch {
            self.refresh().await
        } else {
            Ok(())
        }
    }

    /// Click on a sort control.
    pub async fn select_sort(&mut self, field: SortField) -> Result<(), ApiError> {
        self.sort.select(field);
        debug!(sort = %self.sort.to_ordering(), "Sort changed");

        let needs_fetch = match &mut self.mode {
            BrowseMode::Infinite(window) => {
                window.reset();
                false
            }
            BrowseMode::ServerPaged(page) => {
                page.go_to(1);
                true
            }
        };

        if needs_fetch {
            self.refresh().await
        } else {
            Ok(())
        }
    }

    /// Move to `page`; only server-paginated screens have pages.
    pub async fn go_to_page(&mut self, page_number: usize) -> Result<(), ApiError> {
        let changed = match &mut self.mode {
            BrowseMode::ServerPaged(page) => page.go_to(page_number),
            BrowseMode::Infinite(_) => false,
        };
        if changed {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Grow the infinite window by one step. Returns whether it grew.
    pub fn load_more(&mut self) -> bool {
        let matched = self.matched().len();
        match &mut self.mode {
            BrowseMode::Infinite(window) => window.grow(matched),
            BrowseMode::ServerPaged(_) => false,
        }
    }

    pub fn on_scroll(
        &mut self,
        scroll_offset: f64,
        viewport_height: f64,
        content_height: f64,
    ) -> bool {
        const THRESHOLD: f64 = 200.0;
        let matched = self.matched().len();
        match &mut self.mode {
            BrowseMode::Infinite(window) => {
                window.on_scroll(scroll_offset, viewport_height, content_height, THRESHOLD, matched)
            }
            BrowseMode::ServerPaged(_) => false,
        }
    }

    // Server-paginated screens send search to the backend, so it is not
    // reapplied to the page locally.
    fn local_criteria(&self) -> FilterCriteria {
        match self.mode {
            BrowseMode::ServerPaged(_) => FilterCriteria {
                search: String::new(),
                ..self.criteria.clone()
            },
            BrowseMode::Infinite(_) => self.criteria.clone(),
        }
    }

    /// Every loaded listing passing the filter, in display order.
    pub fn matched(&self) -> Vec<&Listing> {
        engine::run_pipeline(self.store.listings(), &self.local_criteria(), &self.sort)
    }

    /// The listings to render right now.
    pub fn visible(&self) -> Vec<&Listing> {
        let matched = self.matched();
        match &self.mode {
            BrowseMode::Infinite(window) => engine::visible_slice(&matched, window).to_vec(),
            BrowseMode::ServerPaged(_) => matched,
        }
    }

    pub fn pagination(&self) -> PaginationDisplay {
        match &self.mode {
            BrowseMode::ServerPaged(_) if !self.local_criteria().is_empty() => {
                PaginationDisplay::Filtered {
                    shown: self.matched().len(),
                }
            }
            BrowseMode::ServerPaged(page) => PaginationDisplay::Pages {
                range: page.range(),
                buttons: page.buttons(DEFAULT_MAX_BUTTONS),
            },
            BrowseMode::Infinite(window) => {
                let matched = self.matched().len();
                PaginationDisplay::Window {
                    shown: window.visible(matched),
                    matched,
                }
            }
        }
    }

    /// Toggle a flag on a loaded listing.
    pub async fn toggle(&mut self, id: &str, flag: Flag) -> ToggleOutcome {
        toggle::toggle_flag(
            self.api.as_ref(),
            &mut self.store,
            id,
            flag,
            self.toggle_options,
            self.notifier.as_ref(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryApi;
    use crate::engine::BedroomCategory;
    use crate::notify::Toasts;
    use crate::toggle::{DiscardPolicy, ToggleMode};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn backend(n: usize) -> Arc<InMemoryApi> {
        let listings = (1..=n)
            .map(|i| {
                serde_json::from_value(json!({
                    "id": i.to_string(),
                    "name": format!("Apartamento {i}"),
                    "zone": if i % 3 == 0 { "Chiado, Lisboa" } else { "Benfica" },
                    "price": 500 + i * 25,
                    "bedrooms": i % 4,
                    "scraped_at": format!("2026-10-{:02}T08:00:00Z", (i % 28) + 1),
                }))
                .unwrap()
            })
            .collect();
        Arc::new(InMemoryApi::new(listings))
    }

    #[tokio::test]
    async fn infinite_window_grows_and_resets_on_filter_change() {
        let api = backend(40);
        let mut browser = ListingBrowser::infinite(api, Arc::new(Toasts::new()));
        browser.refresh().await.unwrap();

        assert_eq!(browser.visible().len(), 10);
        assert!(browser.load_more());
        assert!(browser.load_more());
        assert_eq!(browser.visible().len(), 20);

        browser
            .set_criteria(FilterCriteria::new().with_bedrooms([BedroomCategory::Studio]))
            .await
            .unwrap();
        assert_eq!(browser.pagination(), PaginationDisplay::Window { shown: 10, matched: 10 });
        assert!(!browser.load_more());
    }

    #[tokio::test]
    async fn reapplying_the_same_filter_keeps_the_window() {
        let api = backend(40);
        let mut browser = ListingBrowser::infinite(api, Arc::new(Toasts::new()));
        browser.refresh().await.unwrap();
        let criteria = FilterCriteria::new().with_price_ceiling(1000.0);

        browser.set_criteria(criteria.clone()).await.unwrap();
        assert!(browser.load_more());
        assert_eq!(browser.visible().len(), 15);

        browser.set_criteria(criteria).await.unwrap();
        assert_eq!(browser.visible().len(), 15);

        browser.set_criteria(FilterCriteria::new()).await.unwrap();
        assert_eq!(browser.visible().len(), 10);
    }

    #[tokio::test]
    async fn sort_change_resets_window() {
        let api = backend(40);
        let mut browser = ListingBrowser::infinite(api, Arc::new(Toasts::new()));
        browser.refresh().await.unwrap();
        browser.load_more();

        browser.select_sort(SortField::Price).await.unwrap();
        assert_eq!(browser.sort(), SortSpec::descending(SortField::Price));
        assert_eq!(browser.visible().len(), 10);
        assert_eq!(browser.visible()[0].id, "40");
    }

    #[tokio::test]
    async fn paged_screen_shows_page_strip() {
        let api = backend(95);
        let mut browser = ListingBrowser::paged(api, Arc::new(Toasts::new()), 20);
        browser.refresh().await.unwrap();

        assert_eq!(browser.visible().len(), 20);
        assert_matches!(browser.pagination(), PaginationDisplay::Pages { range, buttons } => {
            assert_eq!(range.to_string(), "Showing 1–20 of 95 results");
            assert_eq!(buttons.len(), 5);
        });

        browser.go_to_page(5).await.unwrap();
        assert_eq!(browser.visible().len(), 15);
        assert_matches!(
            browser.pagination(),
            PaginationDisplay::Pages { range, .. } if range.start == 81 && range.end == 95
        );
    }

    #[tokio::test]
    async fn paged_search_goes_to_the_backend() {
        let api = backend(95);
        let mut browser = ListingBrowser::paged(api, Arc::new(Toasts::new()), 20);
        browser.refresh().await.unwrap();
        browser.go_to_page(3).await.unwrap();

        browser.set_criteria(FilterCriteria::new().with_search("chiado")).await.unwrap();

        // 31 of 95 listings are in Chiado, across every page.
        assert_matches!(
            browser.pagination(),
            PaginationDisplay::Pages { range, .. } if range.total == 31 && range.start == 1
        );
        assert!(browser.visible().iter().all(|l| l.zone.starts_with("Chiado")));
    }

    #[tokio::test]
    async fn paged_local_filters_hide_page_numbers() {
        let api = backend(95);
        let mut browser = ListingBrowser::paged(api, Arc::new(Toasts::new()), 20);
        browser.refresh().await.unwrap();

        browser
            .set_criteria(FilterCriteria::new().with_bedrooms([BedroomCategory::Two]))
            .await
            .unwrap();
        assert_matches!(
            browser.pagination(),
            PaginationDisplay::Filtered { shown } if shown == browser.visible().len()
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_data_and_notifies() {
        let api = backend(12);
        let toasts = Arc::new(Toasts::new());
        let mut browser = ListingBrowser::infinite(api.clone(), toasts.clone());
        browser.refresh().await.unwrap();

        api.fail_with(Some(500));
        assert!(browser.refresh().await.is_err());
        assert_eq!(browser.store().len(), 12);
        assert_eq!(toasts.errors(), 1);
    }

    #[tokio::test]
    async fn discard_on_list_screen_removes_item() {
        let api = backend(12);
        let mut browser = ListingBrowser::infinite(api.clone(), Arc::new(Toasts::new()))
            .with_toggle_options(ToggleOptions {
                mode: ToggleMode::Optimistic,
                discard: DiscardPolicy::RemoveFromList,
            });
        browser.refresh().await.unwrap();

        let outcome = browser.toggle("3", Flag::Discarded).await;
        assert_eq!(outcome, ToggleOutcome::Applied { value: true });
        assert!(browser.store().get("3").is_none());
        assert!(api.listings().iter().any(|l| l.id == "3" && l.is_discarded));
    }
}
