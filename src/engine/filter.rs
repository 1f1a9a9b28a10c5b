use crate::engine::criteria::FilterCriteria;
use crate::models::Listing;

/// Keep the listings that satisfy every active criterion.
///
/// Returns borrowed references in input order. Inactive criteria always
/// pass, so an empty [`FilterCriteria`] yields the whole input.
pub fn filter_listings<'a>(listings: &'a [Listing], criteria: &FilterCriteria) -> Vec<&'a Listing> {
    if criteria.is_empty() {
        return listings.iter().collect();
    }

    // Lowercase once, not per listing.
    let query = criteria.search_query().map(str::to_lowercase);

    listings
        .iter()
        .filter(|listing| matches_with_query(listing, criteria, query.as_deref()))
        .collect()
}

/// Check a single listing against `criteria`.
pub fn matches(listing: &Listing, criteria: &FilterCriteria) -> bool {
    let query = criteria.search_query().map(str::to_lowercase);
    matches_with_query(listing, criteria, query.as_deref())
}

fn matches_with_query(listing: &Listing, criteria: &FilterCriteria, query: Option<&str>) -> bool {
    within_price(listing, criteria)
        && in_bedroom_categories(listing, criteria)
        && from_selected_source(listing, criteria)
        && has_required_flags(listing, criteria)
        && query.map_or(true, |q| matches_search(listing, q))
}

fn within_price(listing: &Listing, criteria: &FilterCriteria) -> bool {
    criteria
        .price_ceiling
        .map_or(true, |ceiling| listing.price <= ceiling)
}

fn in_bedroom_categories(listing: &Listing, criteria: &FilterCriteria) -> bool {
    criteria.bedrooms.is_empty()
        || criteria
            .bedrooms
            .iter()
            .any(|category| category.matches(listing.bedrooms))
}

fn from_selected_source(listing: &Listing, criteria: &FilterCriteria) -> bool {
    criteria.sources.is_empty() || criteria.sources.contains(&listing.source)
}

// Active flags combine with AND.
fn has_required_flags(listing: &Listing, criteria: &FilterCriteria) -> bool {
    (!criteria.favorites_only || listing.is_favorite)
        && (!criteria.contacted_only || listing.is_contacted)
        && (!criteria.discarded_only || listing.is_discarded)
}

/// `query` must already be lowercase.
fn matches_search(listing: &Listing, query: &str) -> bool {
    let contains = |field: &str| field.to_lowercase().contains(query);

    contains(listing.name.as_str())
        || contains(listing.zone.as_str())
        || listing.description.as_deref().is_some_and(contains)
        || listing.location_names().any(contains)
}
