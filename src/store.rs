//! Screen-owned listing state.
//!
//! Each screen owns one [`ListingStore`]; there is no process-wide cache.
//! The array is replaced wholesale on refresh and patched one flag at a time
//! when a toggle succeeds.

use std::collections::HashMap;

use crate::models::{Flag, Listing};

/// Identifies one in-flight toggle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleTicket {
    pub id: String,
    pub flag: Flag,
    seq: u64,
    /// Flag value when the request was issued, used for rollback.
    pub previous: bool,
}

#[derive(Debug, Default)]
pub struct ListingStore {
    listings: Vec<Listing>,
    next_seq: u64,
    latest: HashMap<(String, Flag), u64>,
}

impl ListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_listings(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            ..Self::default()
        }
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == id)
    }

    /// Replace the whole array after a fetch. Outstanding tickets are
    /// forgotten, so late toggle responses for the old array are ignored.
    pub fn replace(&mut self, listings: Vec<Listing>) {
        self.listings = listings;
        self.latest.clear();
    }

    /// Set one flag on one listing, leaving everything else untouched.
    /// Returns `false` when the id is not loaded.
    pub fn set_flag(&mut self, id: &str, flag: Flag, value: bool) -> bool {
        match self.listings.iter_mut().find(|l| l.id == id) {
            Some(listing) => {
                listing.set_flag(flag, value);
                true
            }
            None => false,
        }
    }

    /// Drop a listing from the displayed array, keeping the order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<Listing> {
        let index = self.listings.iter().position(|l| l.id == id)?;
        Some(self.listings.remove(index))
    }

    /// Register a new toggle request for `(id, flag)`. Any earlier request
    /// for the same pair stops being authoritative.
    pub fn begin_toggle(&mut self, id: &str, flag: Flag) -> Option<ToggleTicket> {
        let previous = self.get(id)?.flag(flag);
        self.next_seq += 1;
        self.latest.insert((id.to_string(), flag), self.next_seq);
        Some(ToggleTicket {
            id: id.to_string(),
            flag,
            seq: self.next_seq,
            previous,
        })
    }

    /// Whether `ticket` is still the newest request for its pair.
    pub fn is_current(&self, ticket: &ToggleTicket) -> bool {
        self.latest.get(&(ticket.id.clone(), ticket.flag)) == Some(&ticket.seq)
    }

    /// Settle a request: apply `value` if the ticket is still current.
    /// Returns whether local state was touched.
    pub fn finish_toggle(&mut self, ticket: &ToggleTicket, value: bool) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.latest.remove(&(ticket.id.clone(), ticket.flag));
        self.set_flag(&ticket.id, ticket.flag, value)
    }

    pub fn pending_toggles(&self) -> usize {
        self.latest.len()
    }
}
