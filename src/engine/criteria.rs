use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Bedroom buckets offered by the filter UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BedroomCategory {
    Studio,
    One,
    Two,
    ThreePlus,
}

impl BedroomCategory {
    pub fn matches(self, bedrooms: u32) -> bool {
        match self {
            BedroomCategory::Studio => bedrooms == 0,
            BedroomCategory::One => bedrooms == 1,
            BedroomCategory::Two => bedrooms == 2,
            BedroomCategory::ThreePlus => bedrooms >= 3,
        }
    }
}

impl fmt::Display for BedroomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BedroomCategory::Studio => "studio",
            BedroomCategory::One => "1",
            BedroomCategory::Two => "2",
            BedroomCategory::ThreePlus => "3+",
        };
        f.write_str(label)
    }
}

impl FromStr for BedroomCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "studio" | "0" | "t0" => Ok(BedroomCategory::Studio),
            "1" | "t1" => Ok(BedroomCategory::One),
            "2" | "t2" => Ok(BedroomCategory::Two),
            "3+" | "3" | "t3+" | "t3" => Ok(BedroomCategory::ThreePlus),
            other => Err(format!(
                "unknown bedroom category '{other}' (expected studio, 1, 2 or 3+)"
            )),
        }
    }
}

/// Active filter state for a listing screen.
///
/// Lives only as long as the screen; nothing here is persisted. The default
/// value has every criterion switched off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Inclusive upper bound on price. `None` means no ceiling.
    pub price_ceiling: Option<f64>,
    /// Empty means every bedroom count passes.
    pub bedrooms: BTreeSet<BedroomCategory>,
    /// Exact, case-sensitive source names. Empty means every source passes.
    pub sources: BTreeSet<String>,
    pub favorites_only: bool,
    pub contacted_only: bool,
    pub discarded_only: bool,
    /// Case-insensitive substring query.
    pub search: String,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price_ceiling(mut self, ceiling: f64) -> Self {
        self.price_ceiling = Some(ceiling);
        self
    }

    pub fn with_bedrooms(mut self, categories: impl IntoIterator<Item = BedroomCategory>) -> Self {
        self.bedrooms.extend(categories);
        self
    }

    pub fn with_sources<S: Into<String>>(mut self, sources: impl IntoIterator<Item = S>) -> Self {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    pub fn favorites_only(mut self) -> Self {
        self.favorites_only = true;
        self
    }

    pub fn contacted_only(mut self) -> Self {
        self.contacted_only = true;
        self
    }

    pub fn discarded_only(mut self) -> Self {
        self.discarded_only = true;
        self
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search = query.into();
        self
    }

    /// Trimmed search query, or `None` when search is inactive.
    pub fn search_query(&self) -> Option<&str> {
        let trimmed = self.search.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn has_flag_filter(&self) -> bool {
        self.favorites_only || self.contacted_only || self.discarded_only
    }

    /// True when no criterion is active, i.e. filtering is the identity.
    pub fn is_empty(&self) -> bool {
        self.price_ceiling.is_none()
            && self.bedrooms.is_empty()
            && self.sources.is_empty()
            && !self.has_flag_filter()
            && self.search_query().is_none()
    }

    /// Reset every criterion to its inactive value.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        assert!(FilterCriteria::default().is_empty());
        assert!(FilterCriteria::new().with_search("   ").is_empty());
    }

    #[test]
    fn any_active_criterion_is_not_empty() {
        assert!(!FilterCriteria::new().with_price_ceiling(1000.0).is_empty());
        assert!(!FilterCriteria::new().contacted_only().is_empty());
        assert!(!FilterCriteria::new().with_sources(["ERA"]).is_empty());
        assert!(!FilterCriteria::new().with_bedrooms([BedroomCategory::Two]).is_empty());
        assert!(!FilterCriteria::new().with_search("Chiado").is_empty());
    }

    #[test]
    fn clear_resets_everything() {
        let mut criteria = FilterCriteria::new().favorites_only().with_search("Alfama");
        criteria.clear();
        assert!(criteria.is_empty());
    }

    #[test]
    fn categories_match_counts() {
        assert!(BedroomCategory::Studio.matches(0));
        assert!(!BedroomCategory::Studio.matches(1));
        assert!(BedroomCategory::ThreePlus.matches(3));
        assert!(BedroomCategory::ThreePlus.matches(6));
        assert!(!BedroomCategory::Two.matches(3));
    }

    #[test]
    fn categories_parse_from_labels() {
        assert_eq!("Studio".parse::<BedroomCategory>().unwrap(), BedroomCategory::Studio);
        assert_eq!("3+".parse::<BedroomCategory>().unwrap(), BedroomCategory::ThreePlus);
        assert_eq!("T2".parse::<BedroomCategory>().unwrap(), BedroomCategory::Two);
        assert!("penthouse".parse::<BedroomCategory>().is_err());
    }
}
