pub mod numeric;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// One level of the Portuguese location hierarchy (parish, county, district).
///
/// The backend sends either a bare name or a nested object carrying `name`;
/// both collapse into this type on ingestion.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct LocationLevel(pub String);

impl LocationLevel {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for LocationLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Name(String),
            Nested { name: String },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Name(name) | Wire::Nested { name } => LocationLevel(name),
        })
    }
}

/// Core listing data model, as served by the scraping backend.
///
/// Numeric fields are canonical once deserialized: `price` and `area` are
/// plain numbers and `bedrooms` is a count where `0` means studio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::text")]
    pub name: String,
    #[serde(default, alias = "location", deserialize_with = "de::text")]
    pub zone: String,
    #[serde(default, deserialize_with = "de::optional_text")]
    pub description: Option<String>,
    #[serde(default)]
    pub parish: Option<LocationLevel>,
    #[serde(default)]
    pub county: Option<LocationLevel>,
    #[serde(default)]
    pub district: Option<LocationLevel>,
    #[serde(default, deserialize_with = "de::optional_text")]
    pub floor: Option<String>,
    #[serde(default, deserialize_with = "de::decimal")]
    pub price: f64,
    #[serde(default, deserialize_with = "de::bedrooms")]
    pub bedrooms: u32,
    #[serde(default, deserialize_with = "de::decimal")]
    pub area: f64,
    #[serde(default, deserialize_with = "de::text")]
    pub source: String,
    #[serde(default, deserialize_with = "de::photos")]
    pub photos: Vec<String>,
    #[serde(default, deserialize_with = "de::optional_text")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "de::flag")]
    pub is_favorite: bool,
    #[serde(default, deserialize_with = "de::flag")]
    pub is_contacted: bool,
    #[serde(default, deserialize_with = "de::flag")]
    pub is_discarded: bool,
    #[serde(default, deserialize_with = "de::timestamp")]
    pub scraped_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn is_studio(&self) -> bool {
        self.bedrooms == 0
    }

    /// Current value of one of the user-toggleable flags.
    pub fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::Favorite => self.is_favorite,
            Flag::Contacted => self.is_contacted,
            Flag::Discarded => self.is_discarded,
        }
    }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::Favorite => self.is_favorite = value,
            Flag::Contacted => self.is_contacted = value,
            Flag::Discarded => self.is_discarded = value,
        }
    }

    /// Populated location hierarchy names, most specific first.
    pub fn location_names(&self) -> impl Iterator<Item = &str> {
        [&self.parish, &self.county, &self.district]
            .into_iter()
            .filter_map(|level| level.as_ref().map(LocationLevel::name))
    }

    /// First photo, used as the card thumbnail.
    pub fn cover_photo(&self) -> Option<&str> {
        self.photos.first().map(String::as_str)
    }
}

/// The three per-listing booleans a user can flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    Favorite,
    Contacted,
    Discarded,
}

impl Flag {
    pub const ALL: [Flag; 3] = [Flag::Favorite, Flag::Contacted, Flag::Discarded];

    /// Name of the listing field carrying this flag.
    pub fn field_name(self) -> &'static str {
        match self {
            Flag::Favorite => "is_favorite",
            Flag::Contacted => "is_contacted",
            Flag::Discarded => "is_discarded",
        }
    }

    /// Backend action segment, e.g. `toggle_favorite`.
    pub fn action(self) -> &'static str {
        match self {
            Flag::Favorite => "toggle_favorite",
            Flag::Contacted => "toggle_contacted",
            Flag::Discarded => "toggle_discarded",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flag::Favorite => "favorite",
            Flag::Contacted => "contacted",
            Flag::Discarded => "discarded",
        };
        f.write_str(name)
    }
}

impl FromStr for Flag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "favorite" | "favourite" | "fav" => Ok(Flag::Favorite),
            "contacted" => Ok(Flag::Contacted),
            "discarded" | "discard" => Ok(Flag::Discarded),
            other => Err(format!("unknown flag '{other}'")),
        }
    }
}

/// Deserializers that normalize inconsistent scraped encodings.
mod de {
    use super::numeric;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(f64),
        Text(String),
        Other(serde_json::Value),
    }

    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Id {
            Int(i64),
            Text(String),
        }

        Ok(match Id::deserialize(deserializer)? {
            Id::Int(n) => n.to_string(),
            Id::Text(s) => s,
        })
    }

    pub fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(match Loose::deserialize(deserializer)? {
            Loose::Number(n) => numeric::decimal_from_f64(n),
            Loose::Text(s) => numeric::parse_decimal(&s),
            Loose::Other(_) => 0.0,
        })
    }

    pub fn bedrooms<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        Ok(match Loose::deserialize(deserializer)? {
            Loose::Number(n) => numeric::bedrooms_from_f64(n),
            Loose::Text(s) => numeric::parse_bedrooms(&s),
            Loose::Other(_) => 0,
        })
    }

    pub fn photos<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// Text field; null or a non-scalar becomes empty.
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(optional_text(deserializer)?.unwrap_or_default())
    }

    /// Optional text that may arrive as a number (`"floor": 3`).
    pub fn optional_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(match Loose::deserialize(deserializer)? {
            Loose::Number(n) => Some(n.to_string()),
            Loose::Text(s) => Some(s),
            Loose::Other(_) => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Bool(bool),
            Other(serde_json::Value),
        }

        Ok(matches!(Wire::deserialize(deserializer)?, Wire::Bool(true)))
    }

    /// RFC 3339, or a naive timestamp read as UTC. Anything else is `None`.
    pub fn timestamp<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(match Loose::deserialize(deserializer)? {
            Loose::Text(s) => parse_timestamp(s.trim()),
            Loose::Number(_) | Loose::Other(_) => None,
        })
    }

    fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .into_iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }
}
