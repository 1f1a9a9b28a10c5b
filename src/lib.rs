//! Client-side engine for browsing scraped Lisbon rental listings.
//!
//! Listings are fetched from the scraping backend ([`api`]), narrowed and
//! ordered locally ([`engine`]), and shown one page or window at a time
//! ([`browser`]). Flag toggles ([`toggle`]) and scraper status polling
//! ([`poller`]) round out what a listing screen needs.

pub mod api;
pub mod browser;
pub mod config;
pub mod engine;
pub mod models;
pub mod notify;
pub mod poller;
pub mod store;
pub mod toggle;

pub use browser::{BrowseMode, ListingBrowser, PaginationDisplay};
pub use engine::{FilterCriteria, SortSpec};
pub use models::{Flag, Listing};
