use std::collections::BTreeMap;

use crate::{
    db::CatalogStore,
    error::{AppError, AppResult},
    models::{AddOutcome, GenreView, Movie, MovieId, MoviePage},
    services::{enrichment::Enricher, pagination::Pagination},
};

pub const EMPTY_WATCHLIST: &str = "No movies in your watchlist";

/// Optional narrowing of the caller's watchlist
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchlistFilter {
    search: Option<String>,
    genre: Option<String>,
    year: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

impl WatchlistFilter {
    /// `year` must be four digits when given
    pub fn new(search: Option<&str>, genre: Option<&str>, year: Option<&str>) -> AppResult<Self> {
        let year = non_empty(year);
        if let Some(year) = &year {
            if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
                return Err(AppError::InvalidInput(
                    "year must be a four-digit year".to_string(),
                ));
            }
        }
        Ok(Self {
            search: non_empty(search),
            genre: non_empty(genre),
            year,
        })
    }

    pub fn matches(&self, movie: &Movie) -> bool {
        if let Some(search) = &self.search {
            if !movie.title.to_lowercase().contains(search) {
                return false;
            }
        }
        if let Some(genre) = &self.genre {
            if !movie
                .genres
                .iter()
                .any(|g| g.name.to_lowercase().contains(genre))
            {
                return false;
            }
        }
        if let Some(year) = &self.year {
            if movie.release_year() != Some(year.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Watchlisted movies that still exist in the catalog, in watchlist order
async fn watchlisted_movies(store: &dyn CatalogStore, enricher: &Enricher<'_>) -> AppResult<Vec<Movie>> {
    let ids = &enricher.personalization().watchlist;
    if ids.is_empty() {
        return Err(AppError::NotFound(EMPTY_WATCHLIST.to_string()));
    }

    let mut movies = store.get_movies(ids).await?;
    movies.sort_by_key(|movie| ids.iter().position(|id| id == &movie.id));
    Ok(movies)
}

/// Filters the watchlist, then pages through the matches
pub async fn watchlist_page(
    store: &dyn CatalogStore,
    enricher: &Enricher<'_>,
    filter: &WatchlistFilter,
    pagination: Pagination,
) -> AppResult<MoviePage> {
    let movies = watchlisted_movies(store, enricher).await?;
    let matching: Vec<Movie> = movies.into_iter().filter(|m| filter.matches(m)).collect();

    let total = matching.len() as u64;
    let window = pagination.slice(&matching).to_vec();
    let views = enricher.movies(store, window, true).await?;
    Ok(pagination.into_page(total, views))
}

/// Distinct genres across the watchlist, sorted by name
pub async fn watchlist_genres(
    store: &dyn CatalogStore,
    enricher: &Enricher<'_>,
) -> AppResult<Vec<GenreView>> {
    let movies = watchlisted_movies(store, enricher).await?;

    let mut by_name = BTreeMap::new();
    for genre in movies.iter().flat_map(|m| m.genres.iter()) {
        by_name.entry(genre.name.clone()).or_insert_with(|| genre.clone());
    }
    let genres: Vec<_> = by_name.into_values().collect();
    Ok(enricher.genres(&genres))
}

pub async fn add_to_watchlist(
    store: &dyn CatalogStore,
    user_id: &str,
    movie_id: &MovieId,
) -> AppResult<&'static str> {
    if store.get_movie(movie_id).await?.is_none() {
        return Err(AppError::NotFound("Movie not found".to_string()));
    }

    match store.add_to_watchlist(user_id, movie_id).await? {
        AddOutcome::AlreadyPresent => {
            Err(AppError::Conflict("Movie already in Watchlist".to_string()))
        }
        outcome => {
            tracing::info!(user_id, movie_id = %movie_id, ?outcome, "Watchlist updated");
            Ok("Watchlist updated")
        }
    }
}

pub async fn remove_from_watchlist(
    store: &dyn CatalogStore,
    user_id: &str,
    movie_id: &MovieId,
) -> AppResult<&'static str> {
    if store.remove_from_watchlist(user_id, movie_id).await? {
        tracing::info!(user_id, movie_id = %movie_id, "Removed from watchlist");
        Ok("Movie removed from Watchlist")
    } else {
        Ok("Movie was not in Watchlist or already removed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemorySeed, MemoryStore};
    use crate::models::Genre;
    use crate::services::enrichment::{tests::PlainSigner, Personalization};

    fn genre(id: i64, name: &str) -> Genre {
        Genre {
            id,
            name: name.into(),
        }
    }

    fn movie(id: i64, title: &str, date: &str, genres: Vec<Genre>) -> Movie {
        Movie {
            id: MovieId::from(id),
            title: title.into(),
            release_date: Some(date.into()),
            genres,
            ..Default::default()
        }
    }

    fn catalog() -> Vec<Movie> {
        vec![
            movie(862, "Toy Story", "1995-10-30", vec![genre(16, "Animation"), genre(35, "Comedy")]),
            movie(949, "Heat", "1995-12-15", vec![genre(28, "Action"), genre(80, "Crime")]),
            movie(603, "The Matrix", "1999-03-30", vec![genre(28, "Action")]),
            movie(680, "Pulp Fiction", "1994-09-10", vec![genre(80, "Crime")]),
        ]
    }

    async fn seeded(watchlist: &[i64]) -> (MemoryStore, Personalization) {
        let store = MemoryStore::from_seed(MemorySeed {
            movies: catalog(),
            ..Default::default()
        });
        for id in watchlist {
            store.add_to_watchlist("u1", &MovieId::from(*id)).await.unwrap();
        }
        let personalization = Personalization::load(&store, "u1").await.unwrap();
        (store, personalization)
    }

    #[test]
    fn test_year_filter_matches_prefix() {
        let filter = WatchlistFilter::new(None, None, Some("1995")).unwrap();
        let kept: Vec<_> = catalog()
            .into_iter()
            .filter(|m| filter.matches(m))
            .map(|m| m.title)
            .collect();
        assert_eq!(kept, vec!["Toy Story", "Heat"]);
    }

    #[test]
    fn test_year_must_be_four_digits() {
        assert!(WatchlistFilter::new(None, None, Some("95")).is_err());
        assert!(WatchlistFilter::new(None, None, Some("19x5")).is_err());
        assert!(WatchlistFilter::new(None, None, Some(" ")).is_ok());
    }

    #[test]
    fn test_filters_combine() {
        let filter = WatchlistFilter::new(Some("the"), Some("ACTION"), None).unwrap();
        let kept: Vec<_> = catalog()
            .into_iter()
            .filter(|m| filter.matches(m))
            .map(|m| m.title)
            .collect();
        assert_eq!(kept, vec!["The Matrix"]);
    }

    #[tokio::test]
    async fn test_page_keeps_watchlist_order_and_filters_first() {
        let (store, personalization) = seeded(&[680, 603, 949, 862]).await;
        let enricher = Enricher::new(&PlainSigner, &personalization);
        let filter = WatchlistFilter::new(None, Some("crime"), None).unwrap();

        let page = watchlist_page(&store, &enricher, &filter, Pagination { page: 1, limit: 1 })
            .await
            .unwrap();
        assert_eq!(page.total_movies, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.movies[0].title, "Pulp Fiction");
        assert!(page.movies[0].is_watchlisted);
        assert!(page.movies[0].cast.is_none());
    }

    #[tokio::test]
    async fn test_empty_watchlist_is_not_found() {
        let (store, personalization) = seeded(&[]).await;
        let enricher = Enricher::new(&PlainSigner, &personalization);

        let result = watchlist_page(&store, &enricher, &WatchlistFilter::default(), Pagination::default()).await;
        assert!(matches!(result, Err(AppError::NotFound(msg)) if msg == EMPTY_WATCHLIST));
    }

    #[tokio::test]
    async fn test_genres_are_distinct_and_sorted() {
        let (store, personalization) = seeded(&[949, 603, 680]).await;
        let enricher = Enricher::new(&PlainSigner, &personalization);

        let genres = watchlist_genres(&store, &enricher).await.unwrap();
        let names: Vec<_> = genres.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Action", "Crime"]);
    }

    #[tokio::test]
    async fn test_add_duplicate_conflicts_and_keeps_set() {
        let (store, _) = seeded(&[862]).await;

        let result = add_to_watchlist(&store, "u1", &MovieId::from(862)).await;
        assert!(matches!(result, Err(AppError::Conflict(msg)) if msg == "Movie already in Watchlist"));

        let watchlist = store.get_watchlist("u1").await.unwrap().unwrap();
        assert_eq!(watchlist.movie_ids, vec![MovieId::from(862)]);
    }

    #[tokio::test]
    async fn test_add_unknown_movie_not_found() {
        let (store, _) = seeded(&[]).await;
        let result = add_to_watchlist(&store, "u1", &MovieId::from(1)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let (store, _) = seeded(&[862]).await;

        let message = remove_from_watchlist(&store, "u1", &MovieId::from(949)).await.unwrap();
        assert_eq!(message, "Movie was not in Watchlist or already removed");
        let message = remove_from_watchlist(&store, "u1", &MovieId::from(862)).await.unwrap();
        assert_eq!(message, "Movie removed from Watchlist");
    }
}
