//! Listing filter/sort/window pipeline.
//!
//! Stages always run in the same order: predicate filter, comparator sort,
//! then windowing. Every stage is pure and works on borrowed listings.

pub mod criteria;
pub mod filter;
pub mod sort;
pub mod window;

pub use criteria::{BedroomCategory, FilterCriteria};
pub use filter::{filter_listings, matches};
pub use sort::{sort_listings, SortDirection, SortField, SortSpec};
pub use window::{page_buttons, InfiniteWindow, PageButton, PageRange, PageState};

use crate::models::Listing;

/// Filter then sort.
pub fn run_pipeline<'a>(
    listings: &'a [Listing],
    criteria: &FilterCriteria,
    sort: &SortSpec,
) -> Vec<&'a Listing> {
    let mut matched = filter_listings(listings, criteria);
    sort_listings(&mut matched, sort);
    matched
}

/// The prefix of an ordered result an infinite-scroll screen renders.
pub fn visible_slice<'s, 'a>(
    ordered: &'s [&'a Listing],
    window: &InfiniteWindow,
) -> &'s [&'a Listing] {
    &ordered[..window.visible(ordered.len())]
}
