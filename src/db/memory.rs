use std::cmp::Ordering;
use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::store::{CatalogStore, LikedSet, MovieSelector};
use crate::{
    error::{AppError, AppResult},
    models::{
        AddOutcome, Credit, Movie, MovieId, MovieKeywords, MoviePreference, Rating, SortField,
        UserDetails, Watchlist,
    },
};

#[derive(Debug, Clone, Deserialize)]
pub struct MovieEmbedding {
    pub id: MovieId,
    pub embedding: Vec<f32>,
}

/// Catalog contents loaded into a `MemoryStore`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemorySeed {
    #[serde(default)]
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub credits: Vec<Credit>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub keywords: Vec<MovieKeywords>,
    #[serde(default)]
    pub embeddings: Vec<MovieEmbedding>,
}

impl MemorySeed {
    /// Reads a seed from a JSON file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Default)]
struct MemoryData {
    /// Insertion order is the default listing order
    movies: Vec<Movie>,
    credits: HashMap<MovieId, Credit>,
    ratings: Vec<Rating>,
    keywords: HashMap<MovieId, MovieKeywords>,
    embeddings: HashMap<MovieId, Vec<f32>>,
    watchlists: HashMap<String, Watchlist>,
    user_details: HashMap<String, UserDetails>,
}

/// `CatalogStore` kept entirely in process memory.
///
/// Used for local development (`STORAGE=memory`) and for tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryData>,
}

fn contains_pattern(text: &str) -> AppResult<Regex> {
    RegexBuilder::new(&regex::escape(text))
        .case_insensitive(true)
        .build()
        .map_err(|e| AppError::InvalidInput(format!("Invalid search text: {}", e)))
}

/// Descending order, missing values last
fn compare_desc(a: &Movie, b: &Movie, field: SortField) -> Ordering {
    fn desc<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    match field {
        SortField::Popularity => desc(a.popularity, b.popularity),
        SortField::VoteAverage => desc(a.vote_average, b.vote_average),
        SortField::VoteCount => desc(a.vote_count, b.vote_count),
        SortField::Runtime => desc(a.runtime, b.runtime),
        SortField::ReleaseDate => desc(a.release_date.as_deref(), b.release_date.as_deref()),
        SortField::Title => desc(Some(a.title.as_str()), Some(b.title.as_str())),
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: MemorySeed) -> Self {
        let data = MemoryData {
            movies: seed.movies,
            credits: seed.credits.into_iter().map(|c| (c.id.clone(), c)).collect(),
            ratings: seed.ratings,
            keywords: seed.keywords.into_iter().map(|k| (k.id.clone(), k)).collect(),
            embeddings: seed
                .embeddings
                .into_iter()
                .map(|e| (e.id, e.embedding))
                .collect(),
            ..Default::default()
        };
        Self {
            inner: RwLock::new(data),
        }
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn find_movies(
        &self,
        selector: &MovieSelector,
        sort: Option<SortField>,
        skip: u64,
        limit: u64,
    ) -> AppResult<(Vec<Movie>, u64)> {
        let data = self.inner.read().await;

        let mut selected: Vec<&Movie> = match selector {
            MovieSelector::All => data.movies.iter().collect(),
            MovieSelector::TitleContains(text) => {
                let pattern = contains_pattern(text)?;
                data.movies
                    .iter()
                    .filter(|m| pattern.is_match(&m.title))
                    .collect()
            }
            MovieSelector::Ids(ids) => data.movies.iter().filter(|m| ids.contains(&m.id)).collect(),
        };

        if let Some(field) = sort {
            selected.sort_by(|a, b| compare_desc(a, b, field));
        }

        let total = selected.len() as u64;
        let window: Vec<Movie> = selected
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((window, total))
    }

    async fn get_movie(&self, id: &MovieId) -> AppResult<Option<Movie>> {
        let data = self.inner.read().await;
        Ok(data.movies.iter().find(|m| &m.id == id).cloned())
    }

    async fn get_movies(&self, ids: &[MovieId]) -> AppResult<Vec<Movie>> {
        let data = self.inner.read().await;
        Ok(data
            .movies
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn get_credit(&self, id: &MovieId) -> AppResult<Option<Credit>> {
        Ok(self.inner.read().await.credits.get(id).cloned())
    }

    async fn get_credits(&self, ids: &[MovieId]) -> AppResult<Vec<Credit>> {
        let data = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| data.credits.get(id)).cloned().collect())
    }

    async fn ratings_for(&self, id: &MovieId) -> AppResult<Vec<Rating>> {
        let data = self.inner.read().await;
        Ok(data
            .ratings
            .iter()
            .filter(|r| &r.movie_id == id)
            .cloned()
            .collect())
    }

    async fn keyword_movie_ids(&self, keyword: &str) -> AppResult<Vec<MovieId>> {
        let pattern = contains_pattern(keyword)?;
        let data = self.inner.read().await;
        let mut ids: Vec<MovieId> = data
            .keywords
            .values()
            .filter(|doc| {
                doc.keywords
                    .searchable()
                    .into_iter()
                    .any(|text| pattern.is_match(text))
            })
            .map(|doc| doc.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn movie_keywords(&self, id: &MovieId) -> AppResult<Option<MovieKeywords>> {
        Ok(self.inner.read().await.keywords.get(id).cloned())
    }

    async fn vector_search(&self, embedding: &[f32], limit: usize) -> AppResult<Vec<MovieId>> {
        let data = self.inner.read().await;
        let mut scored: Vec<(f32, &MovieId)> = data
            .embeddings
            .iter()
            .map(|(id, vector)| (cosine_similarity(embedding, vector), id))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, id)| id.clone())
            .collect())
    }

    async fn get_watchlist(&self, user_id: &str) -> AppResult<Option<Watchlist>> {
        Ok(self.inner.read().await.watchlists.get(user_id).cloned())
    }

    async fn add_to_watchlist(&self, user_id: &str, movie_id: &MovieId) -> AppResult<AddOutcome> {
        let mut guard = self.inner.write().await;
        let data = &mut *guard;
        match data.watchlists.get_mut(user_id) {
            Some(watchlist) if watchlist.contains(movie_id) => Ok(AddOutcome::AlreadyPresent),
            Some(watchlist) => {
                watchlist.movie_ids.push(movie_id.clone());
                Ok(AddOutcome::Added)
            }
            None => {
                data.watchlists.insert(
                    user_id.to_string(),
                    Watchlist {
                        user_id: user_id.to_string(),
                        movie_ids: vec![movie_id.clone()],
                    },
                );
                Ok(AddOutcome::Created)
            }
        }
    }

    async fn remove_from_watchlist(&self, user_id: &str, movie_id: &MovieId) -> AppResult<bool> {
        let mut guard = self.inner.write().await;
        let data = &mut *guard;
        let Some(watchlist) = data.watchlists.get_mut(user_id) else {
            return Ok(false);
        };
        let before = watchlist.movie_ids.len();
        watchlist.movie_ids.retain(|id| id != movie_id);
        Ok(watchlist.movie_ids.len() != before)
    }

    async fn get_user_details(&self, user_id: &str) -> AppResult<Option<UserDetails>> {
        Ok(self.inner.read().await.user_details.get(user_id).cloned())
    }

    async fn add_liked_id(&self, user_id: &str, set: LikedSet, id: i64) -> AppResult<AddOutcome> {
        let mut guard = self.inner.write().await;
        let data = &mut *guard;
        let created = !data.user_details.contains_key(user_id);
        let details = data
            .user_details
            .entry(user_id.to_string())
            .or_insert_with(|| UserDetails {
                user_id: user_id.to_string(),
                ..Default::default()
            });

        let ids = match set {
            LikedSet::Actors => &mut details.actor_ids,
            LikedSet::Genres => &mut details.genre_ids,
        };
        if ids.contains(&id) {
            return Ok(AddOutcome::AlreadyPresent);
        }
        ids.push(id);
        Ok(if created {
            AddOutcome::Created
        } else {
            AddOutcome::Added
        })
    }

    async fn remove_liked_id(&self, user_id: &str, set: LikedSet, id: i64) -> AppResult<bool> {
        let mut guard = self.inner.write().await;
        let data = &mut *guard;
        let Some(details) = data.user_details.get_mut(user_id) else {
            return Ok(false);
        };
        let ids = match set {
            LikedSet::Actors => &mut details.actor_ids,
            LikedSet::Genres => &mut details.genre_ids,
        };
        let before = ids.len();
        ids.retain(|existing| *existing != id);
        Ok(ids.len() != before)
    }

    async fn add_liked_movie(
        &self,
        user_id: &str,
        entry: MoviePreference,
    ) -> AppResult<AddOutcome> {
        let mut guard = self.inner.write().await;
        let data = &mut *guard;
        match data.user_details.get_mut(user_id) {
            Some(details) if details.preference_for(&entry.movie_id).is_some() => {
                Ok(AddOutcome::AlreadyPresent)
            }
            Some(details) => {
                details.movie_ids.push(entry);
                Ok(AddOutcome::Added)
            }
            None => {
                data.user_details.insert(
                    user_id.to_string(),
                    UserDetails {
                        user_id: user_id.to_string(),
                        movie_ids: vec![entry],
                        ..Default::default()
                    },
                );
                Ok(AddOutcome::Created)
            }
        }
    }

    async fn remove_liked_movie(&self, user_id: &str, movie_id: &MovieId) -> AppResult<bool> {
        let mut guard = self.inner.write().await;
        let data = &mut *guard;
        let Some(details) = data.user_details.get_mut(user_id) else {
            return Ok(false);
        };
        let before = details.movie_ids.len();
        details.movie_ids.retain(|entry| &entry.movie_id != movie_id);
        Ok(details.movie_ids.len() != before)
    }
}
