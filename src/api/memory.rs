//! In-process backend serving listings from memory.
//!
//! Backs the CLI's `--offline` mode (browsing a JSON export) and stands in
//! for the HTTP backend in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::error::ApiError;
use crate::api::traits::ListingsApi;
use crate::api::types::{
    ListingQuery, Paginated, RunRequest, RunResponse, ScraperStatus, STATUS_RUNNING,
};
use crate::engine::{self, FilterCriteria, SortSpec};
use crate::models::{Flag, Listing};

const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Default)]
pub struct InMemoryApi {
    listings: Mutex<Vec<Listing>>,
    // Front is served next; the last entry repeats.
    statuses: Mutex<VecDeque<ScraperStatus>>,
    failure: Mutex<Option<u16>>,
    status_calls: AtomicUsize,
    toggle_calls: AtomicUsize,
}

impl InMemoryApi {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: Mutex::new(listings),
            ..Self::default()
        }
    }

    /// Status snapshots returned by successive `scraper_status` calls.
    pub fn with_statuses(self, statuses: impl IntoIterator<Item = ScraperStatus>) -> Self {
        *lock(&self.statuses) = statuses.into_iter().collect();
        self
    }

    /// Make every call fail with `status` until cleared with `None`.
    pub fn fail_with(&self, status: Option<u16>) {
        *lock(&self.failure) = status;
    }

    pub fn listings(&self) -> Vec<Listing> {
        lock(&self.listings).clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn toggle_calls(&self) -> usize {
        self.toggle_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), ApiError> {
        match *lock(&self.failure) {
            Some(status) => Err(ApiError::from_status(status, "memory", "injected failure".into())),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ListingsApi for InMemoryApi {
    async fn list_page(&self, query: &ListingQuery) -> Result<Paginated<Listing>, ApiError> {
        self.check_failure()?;
        let listings = lock(&self.listings);

        let criteria = FilterCriteria::new().with_search(query.search.clone().unwrap_or_default());
        let sort = query.ordering.unwrap_or_else(SortSpec::newest_first);
        let ordered = engine::run_pipeline(&listings, &criteria, &sort);

        let size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = query.page.max(1);
        let results: Vec<Listing> = ordered
            .iter()
            .skip((page - 1) * size)
            .take(size)
            .map(|l| (*l).clone())
            .collect();

        let has_next = page * size < ordered.len();
        Ok(Paginated {
            count: ordered.len(),
            next: has_next.then(|| format!("?page={}", page + 1)),
            previous: (page > 1).then(|| format!("?page={}", page - 1)),
            results,
        })
    }

    async fn list_sorted(&self, sort: &SortSpec) -> Result<Vec<Listing>, ApiError> {
        self.check_failure()?;
        Ok(engine::sort::sorted(&lock(&self.listings), sort))
    }

    async fn get_listing(&self, id: &str) -> Result<Listing, ApiError> {
        self.check_failure()?;
        lock(&self.listings)
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("listing {id}")))
    }

    async fn toggle(&self, id: &str, flag: Flag) -> Result<bool, ApiError> {
        self.toggle_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let mut listings = lock(&self.listings);
        let listing = listings
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("listing {id}")))?;
        let value = !listing.flag(flag);
        listing.set_flag(flag, value);
        Ok(value)
    }

    async fn scraper_status(&self) -> Result<ScraperStatus, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let mut statuses = lock(&self.statuses);
        let status = if statuses.len() > 1 {
            statuses.pop_front().unwrap_or_default()
        } else {
            statuses.front().cloned().unwrap_or_default()
        };
        Ok(status)
    }

    async fn run_scrapers(&self, request: &RunRequest) -> Result<RunResponse, ApiError> {
        self.check_failure()?;
        let mut statuses = lock(&self.statuses);
        let mut running = statuses.back().cloned().unwrap_or_default();
        running.main_run.status = STATUS_RUNNING.to_string();
        running.main_run.error_message = None;
        statuses.clear();
        statuses.push_back(running);

        let target = match (&request.scrapers, request.all) {
            (Some(names), _) => names.join(", "),
            (None, Some(true)) => "all scrapers".to_string(),
            _ => "default scrapers".to_string(),
        };
        Ok(RunResponse {
            status: "started".to_string(),
            output: Some(format!("Started {target}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::RunStatus;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn api() -> InMemoryApi {
        let listings = (1..=45)
            .map(|i| {
                let name = format!("Casa {i}");
                serde_json::from_value(json!({"id": i, "name": name, "price": i * 100})).unwrap()
            })
            .collect();
        InMemoryApi::new(listings)
    }

    #[tokio::test]
    async fn pages_carry_count_and_links() {
        let api = api();
        let query = ListingQuery::page(3).with_ordering(SortSpec::default());
        let page = api.list_page(&query).await.unwrap();
        assert_eq!(page.count, 45);
        assert_eq!(page.results.len(), 5);
        assert_eq!(page.results[0].id, "41");
        assert!(page.next.is_none());
        assert!(page.previous.is_some());
    }

    #[tokio::test]
    async fn search_spans_every_page() {
        let api = api();
        let page = api.list_page(&ListingQuery::page(1).with_search("casa 44")).await.unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].id, "44");
    }

    #[tokio::test]
    async fn toggle_flips_each_call() {
        let api = api();
        assert!(api.toggle("3", Flag::Favorite).await.unwrap());
        assert!(!api.toggle("3", Flag::Favorite).await.unwrap());
        assert_matches!(api.toggle("999", Flag::Favorite).await, Err(ApiError::NotFound(_)));
        assert_eq!(api.toggle_calls(), 3);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let api = api();
        api.fail_with(Some(503));
        assert_matches!(api.get_listing("1").await, Err(ApiError::Server { status: 503, .. }));
        api.fail_with(None);
        assert!(api.get_listing("1").await.is_ok());
    }

    #[tokio::test]
    async fn status_script_repeats_last_entry() {
        let running = ScraperStatus {
            main_run: RunStatus {
                status: "running".into(),
                ..RunStatus::default()
            },
            ..ScraperStatus::default()
        };
        let done = ScraperStatus {
            main_run: RunStatus {
                status: "success".into(),
                ..RunStatus::default()
            },
            ..ScraperStatus::default()
        };
        let api = InMemoryApi::default().with_statuses([running, done]);

        assert!(api.scraper_status().await.unwrap().is_running());
        assert!(!api.scraper_status().await.unwrap().is_running());
        assert!(!api.scraper_status().await.unwrap().is_running());
        assert_eq!(api.status_calls(), 3);
    }

    #[tokio::test]
    async fn run_marks_status_running() {
        let api = InMemoryApi::default();
        let response = api.run_scrapers(&RunRequest::all()).await.unwrap();
        assert_eq!(response.output.as_deref(), Some("Started all scrapers"));
        assert!(api.scraper_status().await.unwrap().is_running());
    }
}
