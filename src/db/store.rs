use crate::{
    error::AppResult,
    models::{
        AddOutcome, Credit, Movie, MovieId, MovieKeywords, MoviePreference, Rating, SortField,
        UserDetails, Watchlist,
    },
};

/// Which movies a listing query selects
#[derive(Debug, Clone, PartialEq)]
pub enum MovieSelector {
    All,
    /// Case-insensitive substring match on the title
    TitleContains(String),
    Ids(Vec<MovieId>),
}

/// Integer sets kept on a user's details document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikedSet {
    Actors,
    Genres,
}

impl LikedSet {
    /// Document field holding the set
    pub fn field(&self) -> &'static str {
        match self {
            LikedSet::Actors => "actor_ids",
            LikedSet::Genres => "genre_ids",
        }
    }
}

/// Data access for the catalog and the per-user documents.
///
/// Implementations must keep at most one watchlist and one details document
/// per user, and must match a numeric movie id regardless of whether it was
/// stored as a string or an integer.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns one window of the selected movies and the total selected count
    async fn find_movies(
        &self,
        selector: &MovieSelector,
        sort: Option<SortField>,
        skip: u64,
        limit: u64,
    ) -> AppResult<(Vec<Movie>, u64)>;

    async fn get_movie(&self, id: &MovieId) -> AppResult<Option<Movie>>;

    /// Fetches movies by id, in no particular order; unknown ids are skipped
    async fn get_movies(&self, ids: &[MovieId]) -> AppResult<Vec<Movie>>;

    async fn get_credit(&self, id: &MovieId) -> AppResult<Option<Credit>>;

    async fn get_credits(&self, ids: &[MovieId]) -> AppResult<Vec<Credit>>;

    async fn ratings_for(&self, id: &MovieId) -> AppResult<Vec<Rating>>;

    /// Ids of movies with a keyword tag matching `keyword` case-insensitively
    async fn keyword_movie_ids(&self, keyword: &str) -> AppResult<Vec<MovieId>>;

    async fn movie_keywords(&self, id: &MovieId) -> AppResult<Option<MovieKeywords>>;

    /// Nearest movies to `embedding`, best match first
    async fn vector_search(&self, embedding: &[f32], limit: usize) -> AppResult<Vec<MovieId>>;

    async fn get_watchlist(&self, user_id: &str) -> AppResult<Option<Watchlist>>;

    async fn add_to_watchlist(&self, user_id: &str, movie_id: &MovieId) -> AppResult<AddOutcome>;

    /// Returns whether the movie was present
    async fn remove_from_watchlist(&self, user_id: &str, movie_id: &MovieId) -> AppResult<bool>;

    async fn get_user_details(&self, user_id: &str) -> AppResult<Option<UserDetails>>;

    async fn add_liked_id(&self, user_id: &str, set: LikedSet, id: i64) -> AppResult<AddOutcome>;

    async fn remove_liked_id(&self, user_id: &str, set: LikedSet, id: i64) -> AppResult<bool>;

    /// Adds a preference entry unless one for the same movie exists
    async fn add_liked_movie(
        &self,
        user_id: &str,
        entry: MoviePreference,
    ) -> AppResult<AddOutcome>;

    async fn remove_liked_movie(&self, user_id: &str, movie_id: &MovieId) -> AppResult<bool>;
}
