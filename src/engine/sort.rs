use crate::models::Listing;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Field a listing screen can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Price,
    Area,
    Bedrooms,
    /// Default screen order, not offered in the sort picker.
    ScrapedAt,
}

impl SortField {
    /// Fields a user can pick.
    pub const SELECTABLE: [SortField; 3] = [SortField::Price, SortField::Area, SortField::Bedrooms];

    /// Backend field name used in `ordering` and `/sort/{field}`.
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Price => "price",
            SortField::Area => "area",
            SortField::Bedrooms => "bedrooms",
            SortField::ScrapedAt => "scraped_at",
        }
    }

    fn compare(self, a: &Listing, b: &Listing) -> Ordering {
        match self {
            SortField::Price => a.price.total_cmp(&b.price),
            SortField::Area => a.area.total_cmp(&b.area),
            SortField::Bedrooms => a.bedrooms.cmp(&b.bedrooms),
            // None sorts as the oldest timestamp.
            SortField::ScrapedAt => a.scraped_at.cmp(&b.scraped_at),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "price" => Ok(SortField::Price),
            "area" => Ok(SortField::Area),
            "bedrooms" | "rooms" => Ok(SortField::Bedrooms),
            "scraped_at" | "newest" => Ok(SortField::ScrapedAt),
            other => Err(format!("unknown sort field '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Value for the flat endpoint's `order` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// Selected sort field and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::ascending(SortField::Price)
    }
}

impl SortSpec {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }

    /// Order used by screens where the user has not picked a sort.
    pub fn newest_first() -> Self {
        Self::descending(SortField::ScrapedAt)
    }

    /// Apply a click on a sort control: the current field flips direction,
    /// any other field starts ascending.
    pub fn select(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.flipped();
        } else {
            *self = Self::ascending(field);
        }
    }

    pub fn reversed(self) -> Self {
        Self {
            field: self.field,
            direction: self.direction.flipped(),
        }
    }

    pub fn compare(&self, a: &Listing, b: &Listing) -> Ordering {
        let ordering = self.field.compare(a, b);
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    /// Render as a DRF-style `ordering` parameter (`price`, `-scraped_at`).
    pub fn to_ordering(&self) -> String {
        match self.direction {
            SortDirection::Ascending => self.field.as_str().to_string(),
            SortDirection::Descending => format!("-{}", self.field.as_str()),
        }
    }

    pub fn from_ordering(ordering: &str) -> Result<Self, String> {
        match ordering.trim().strip_prefix('-') {
            Some(field) => Ok(Self::descending(field.parse()?)),
            None => Ok(Self::ascending(ordering.parse()?)),
        }
    }
}

/// Order listings in place. Equal keys keep their relative order.
pub fn sort_listings(listings: &mut [&Listing], sort: &SortSpec) {
    listings.sort_by(|a, b| sort.compare(a, b));
}

/// Owned-input convenience used when a screen keeps its own copy.
pub fn sorted(listings: &[Listing], sort: &SortSpec) -> Vec<Listing> {
    let mut owned = listings.to_vec();
    owned.sort_by(|a, b| sort.compare(a, b));
    owned
}
