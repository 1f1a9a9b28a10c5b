use crate::api::error::ApiError;
use crate::api::types::{ListingQuery, Paginated, RunRequest, RunResponse, ScraperStatus};
use crate::engine::SortSpec;
use crate::models::{Flag, Listing};
use async_trait::async_trait;

/// Operations the clients need from the listings backend.
/// Screens depend on this trait so tests can swap in an in-memory backend.
#[async_trait]
pub trait ListingsApi: Send + Sync {
    /// One server-defined page of listings.
    async fn list_page(&self, query: &ListingQuery) -> Result<Paginated<Listing>, ApiError>;

    /// Every listing, ordered by the backend.
    async fn list_sorted(&self, sort: &SortSpec) -> Result<Vec<Listing>, ApiError>;

    async fn get_listing(&self, id: &str) -> Result<Listing, ApiError>;

    /// Flip `flag` on the backend and return its new, confirmed value.
    async fn toggle(&self, id: &str, flag: Flag) -> Result<bool, ApiError>;

    async fn scraper_status(&self) -> Result<ScraperStatus, ApiError>;

    async fn run_scrapers(&self, request: &RunRequest) -> Result<RunResponse, ApiError>;
}
