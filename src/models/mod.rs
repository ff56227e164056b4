use serde::{Deserialize, Serialize};

pub mod credit;
pub mod movie;
pub mod user;

pub use credit::{profile_blob, CastMember, Credit, CrewMember};
pub use movie::{Genre, Keyword, KeywordTags, Movie, MovieId, MovieKeywords, Rating, SortField};
pub use user::{AddOutcome, MoviePreference, UserDetails, Watchlist, LIKE};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreView {
    pub id: i64,
    pub name: String,
    pub liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastView {
    pub id: i64,
    pub name: String,
    pub character: Option<String>,
    pub profile_url: String,
    pub liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewView {
    pub id: i64,
    pub name: String,
    pub job: Option<String>,
    pub department: Option<String>,
    pub profile_url: String,
}

/// A movie as returned to the client, enriched for the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieView {
    pub id: MovieId,
    pub title: String,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub original_language: Option<String>,
    pub runtime: Option<f64>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<f64>,
    pub genres: Vec<GenreView>,
    pub poster_url: String,
    pub is_watchlisted: bool,
    /// Absent in skinny mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<Vec<CastView>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crew: Option<Vec<CrewView>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetailView {
    #[serde(flatten)]
    pub movie: MovieView,
    pub average_rating: f64,
    pub watched: bool,
    pub preference: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MovieDetailResponse {
    pub movie: MovieDetailView,
    pub ratings: Vec<Rating>,
}

/// One page of movies
#[derive(Debug, Serialize, Deserialize)]
pub struct MoviePage {
    pub page: u64,
    pub total_pages: u64,
    pub total_movies: u64,
    pub movies: Vec<MovieView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserPreferenceResponse {
    pub liked: Vec<MovieView>,
    pub watched: Vec<MovieView>,
    pub watchlist: Vec<MovieView>,
    pub liked_actor_ids: Vec<i64>,
    pub liked_genre_ids: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> MovieView {
        MovieView {
            id: MovieId::from(862),
            title: "Toy Story".into(),
            release_date: Some("1995-10-30".into()),
            overview: None,
            tagline: None,
            original_language: Some("en".into()),
            runtime: Some(81.0),
            popularity: None,
            vote_average: None,
            vote_count: None,
            genres: vec![],
            poster_url: "https://example/posters/862.jpg".into(),
            is_watchlisted: false,
            cast: None,
            crew: None,
        }
    }

    #[test]
    fn test_skinny_view_omits_credits() {
        let json = serde_json::to_value(view()).unwrap();
        assert!(json.get("cast").is_none());
        assert!(json.get("crew").is_none());
        assert_eq!(json["id"], "862");
    }

    #[test]
    fn test_detail_view_flattens_movie() {
        let detail = MovieDetailView {
            movie: view(),
            average_rating: 4.0,
            watched: true,
            preference: Some("like".into()),
        };
        let json = serde_json::to_value(detail).unwrap();
        assert_eq!(json["title"], "Toy Story");
        assert_eq!(json["average_rating"], 4.0);
        assert_eq!(json["watched"], true);
    }
}
