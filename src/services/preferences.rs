use crate::{
    db::{CatalogStore, LikedSet},
    error::{AppError, AppResult},
    models::{AddOutcome, MovieId, MoviePreference, UserDetails, UserPreferenceResponse},
    services::enrichment::Enricher,
};

/// Movie ids split out of a user's preference entries, in stored order
#[derive(Debug, Default, PartialEq)]
pub struct PreferencePartition {
    pub liked: Vec<MovieId>,
    /// Every movie with any preference label
    pub watched: Vec<MovieId>,
}

impl PreferencePartition {
    pub fn from_entries(entries: &[MoviePreference]) -> Self {
        let mut partition = Self::default();
        for entry in entries {
            if entry.is_like() {
                partition.liked.push(entry.movie_id.clone());
            }
            partition.watched.push(entry.movie_id.clone());
        }
        partition
    }
}

pub async fn user_preferences(
    store: &dyn CatalogStore,
    enricher: &Enricher<'_>,
    user_id: &str,
) -> AppResult<UserPreferenceResponse> {
    let details = store.get_user_details(user_id).await?.unwrap_or_default();
    let partition = PreferencePartition::from_entries(&details.movie_ids);

    let liked = enricher.fetch_movies(store, &partition.liked, false).await?;
    let watched = enricher.fetch_movies(store, &partition.watched, false).await?;
    let watchlist = enricher
        .fetch_movies(store, &enricher.personalization().watchlist, false)
        .await?;

    tracing::debug!(
        user_id,
        liked = liked.len(),
        watched = watched.len(),
        watchlist = watchlist.len(),
        "Aggregated user preferences"
    );

    let UserDetails {
        actor_ids,
        genre_ids,
        ..
    } = details;
    Ok(UserPreferenceResponse {
        liked,
        watched,
        watchlist,
        liked_actor_ids: actor_ids,
        liked_genre_ids: genre_ids,
    })
}

fn liked_label(set: LikedSet) -> &'static str {
    match set {
        LikedSet::Actors => "Actor",
        LikedSet::Genres => "Genre",
    }
}

pub async fn add_liked_id(
    store: &dyn CatalogStore,
    user_id: &str,
    set: LikedSet,
    id: i64,
) -> AppResult<String> {
    let label = liked_label(set);
    match store.add_liked_id(user_id, set, id).await? {
        AddOutcome::AlreadyPresent => Err(AppError::Conflict(format!("{} already liked", label))),
        _ => {
            tracing::info!(user_id, id, set = set.field(), "Liked id added");
            Ok(format!("{} added to liked list", label))
        }
    }
}

pub async fn remove_liked_id(
    store: &dyn CatalogStore,
    user_id: &str,
    set: LikedSet,
    id: i64,
) -> AppResult<String> {
    let label = liked_label(set);
    if store.remove_liked_id(user_id, set, id).await? {
        tracing::info!(user_id, id, set = set.field(), "Liked id removed");
        Ok(format!("{} removed from liked list", label))
    } else {
        Ok(format!("{} was not in liked list or already removed", label))
    }
}

pub async fn add_liked_movie(
    store: &dyn CatalogStore,
    user_id: &str,
    entry: MoviePreference,
) -> AppResult<&'static str> {
    let movie_id = entry.movie_id.clone();
    match store.add_liked_movie(user_id, entry).await? {
        AddOutcome::AlreadyPresent => Err(AppError::Conflict("Movie already liked".to_string())),
        _ => {
            tracing::info!(user_id, movie_id = %movie_id, "Movie preference added");
            Ok("Movie added to liked list")
        }
    }
}

pub async fn remove_liked_movie(
    store: &dyn CatalogStore,
    user_id: &str,
    movie_id: &MovieId,
) -> AppResult<&'static str> {
    if store.remove_liked_movie(user_id, movie_id).await? {
        tracing::info!(user_id, movie_id = %movie_id, "Movie preference removed");
        Ok("Movie removed from liked list")
    } else {
        Ok("Movie was not in liked list or already removed")
    }
}
