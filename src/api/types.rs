use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::engine::SortSpec;
use crate::models::{Flag, Listing};

/// Page envelope returned by `/api/houses/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: usize,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Body of the flat `/sort/{field}` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SortedHouses {
    pub houses: Vec<Listing>,
}

/// Query for a server-paginated listing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingQuery {
    pub page: usize,
    pub ordering: Option<SortSpec>,
    /// Forwarded as `search`; the backend filters across every page.
    pub search: Option<String>,
    pub page_size: Option<usize>,
}

impl ListingQuery {
    pub fn page(page: usize) -> Self {
        Self {
            page: page.max(1),
            ..Self::default()
        }
    }

    pub fn with_ordering(mut self, ordering: SortSpec) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = (!search.trim().is_empty()).then(|| search.trim().to_string());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Query-string pairs in a stable order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.max(1).to_string())];
        if let Some(ordering) = &self.ordering {
            pairs.push(("ordering", ordering.to_ordering()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("page_size", size.to_string()));
        }
        pairs
    }
}

/// Toggle endpoints answer with either the flipped field or the whole listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ToggleResponse {
    Listing(Box<Listing>),
    Fields(HashMap<String, bool>),
}

impl ToggleResponse {
    pub fn value_for(&self, flag: Flag) -> Option<bool> {
        match self {
            ToggleResponse::Listing(listing) => Some(listing.flag(flag)),
            ToggleResponse::Fields(fields) => fields.get(flag.field_name()).copied(),
        }
    }
}

pub const STATUS_RUNNING: &str = "running";

/// State of the last (or current) full scraper run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub houses_found: Option<u64>,
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        self.status == STATUS_RUNNING
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status.as_str(), "failed" | "error")
    }
}

/// Per-site scraper summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScraperInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub houses_found: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScraperStatus {
    #[serde(default)]
    pub main_run: RunStatus,
    #[serde(default)]
    pub scrapers: BTreeMap<String, ScraperInfo>,
}

impl ScraperStatus {
    pub fn is_running(&self) -> bool {
        self.main_run.is_running()
    }
}

/// Body for `POST /api/run-scrapers/`. Empty means the backend default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrapers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all: Option<bool>,
}

impl RunRequest {
    pub fn all() -> Self {
        Self {
            scrapers: None,
            all: Some(true),
        }
    }

    pub fn only(scrapers: Vec<String>) -> Self {
        Self {
            scrapers: Some(scrapers),
            all: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scrapers.is_none() && self.all.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    pub status: String,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccessToken {
    pub access: String,
}
