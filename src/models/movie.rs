use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

/// Identifier shared by the movie, credit, rating and keyword collections.
///
/// Catalog imports store it either as a string or as an integer; both forms
/// deserialize to the same canonical string so joins line up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl MovieId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Integer form, when the identifier is numeric
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    /// Blob name of the poster image for this movie
    pub fn poster_blob(&self) -> String {
        format!("posters/{}.jpg", self.0)
    }
}

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MovieId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<i64> for MovieId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for MovieId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Int(id) => Ok(MovieId::from(id)),
            RawId::Float(id) if id.fract() == 0.0 => Ok(MovieId::from(id as i64)),
            RawId::Float(id) => Err(serde::de::Error::custom(format!(
                "movie id must be integral, got {}",
                id
            ))),
            RawId::Text(id) if id.trim().is_empty() => {
                Err(serde::de::Error::custom("movie id must not be empty"))
            }
            RawId::Text(id) => Ok(MovieId::new(id)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// A catalog entry from `movies_metadata`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub runtime: Option<f64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<f64>,
}

impl Movie {
    /// Release year as the first four characters of the release date
    pub fn release_year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .and_then(|date| date.get(..4))
    }
}

/// One user's rating of one movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user_id: i64,
    pub movie_id: MovieId,
    pub rating: f64,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Keyword {
    pub id: i64,
    pub name: String,
}

/// Keyword tags in any of the stored shapes: `{id, name}` objects, plain
/// names, or a single serialized string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum KeywordTags {
    Tagged(Vec<Keyword>),
    Names(Vec<String>),
    Text(String),
}

impl Default for KeywordTags {
    fn default() -> Self {
        KeywordTags::Tagged(Vec::new())
    }
}

impl KeywordTags {
    /// Text a keyword search is matched against
    pub fn searchable(&self) -> Vec<&str> {
        match self {
            KeywordTags::Tagged(keywords) => keywords.iter().map(|k| k.name.as_str()).collect(),
            KeywordTags::Names(names) => names.iter().map(String::as_str).collect(),
            KeywordTags::Text(text) => vec![text.as_str()],
        }
    }
}

/// Keyword tags attached to a movie, searched when no title matches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieKeywords {
    pub id: MovieId,
    #[serde(default)]
    pub keywords: KeywordTags,
}

/// Fields the movie list can be sorted on, always descending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Popularity,
    VoteAverage,
    VoteCount,
    ReleaseDate,
    Runtime,
    Title,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "popularity" => Some(Self::Popularity),
            "vote_average" | "rating" => Some(Self::VoteAverage),
            "vote_count" => Some(Self::VoteCount),
            "release_date" => Some(Self::ReleaseDate),
            "runtime" => Some(Self::Runtime),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    /// Document field name
    pub fn field(&self) -> &'static str {
        match self {
            Self::Popularity => "popularity",
            Self::VoteAverage => "vote_average",
            Self::VoteCount => "vote_count",
            Self::ReleaseDate => "release_date",
            Self::Runtime => "runtime",
            Self::Title => "title",
        }
    }
}
