use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    db::LikedSet,
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{MessageResponse, MovieId, MoviePreference, UserPreferenceResponse, LIKE},
    routes::{required_int, required_movie_id, AppState},
    services::preferences,
};

#[derive(Debug, Deserialize)]
pub struct ActorBody {
    actor_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct GenreBody {
    genre_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct MovieBody {
    movie_id: Option<MovieId>,
    preference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdParams {
    actor_id: Option<String>,
    genre_id: Option<String>,
    movie_id: Option<String>,
}

/// POST /user/add_liked_actor
pub async fn add_liked_actor(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<ActorBody>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(body) = payload?;
    let actor_id = required_int("actor_id", body.actor_id.as_ref())?;

    let message =
        preferences::add_liked_id(state.store.as_ref(), &user.user_id, LikedSet::Actors, actor_id)
            .await?;
    Ok(Json(MessageResponse::new(message)))
}

/// POST /user/add_liked_genre
pub async fn add_liked_genre(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<GenreBody>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(body) = payload?;
    let genre_id = required_int("genre_id", body.genre_id.as_ref())?;

    let message =
        preferences::add_liked_id(state.store.as_ref(), &user.user_id, LikedSet::Genres, genre_id)
            .await?;
    Ok(Json(MessageResponse::new(message)))
}

/// POST /user/add_liked_movie
pub async fn add_liked_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<MovieBody>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let Json(body) = payload?;
    let movie_id = body
        .movie_id
        .ok_or_else(|| AppError::InvalidInput("movie_id is required".to_string()))?;
    let preference = body
        .preference
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| LIKE.to_string());

    let message = preferences::add_liked_movie(
        state.store.as_ref(),
        &user.user_id,
        MoviePreference {
            movie_id,
            preference,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new(message))))
}

fn query_int(name: &str, raw: Option<&str>) -> AppResult<i64> {
    let value = raw.map(|s| Value::String(s.to_string()));
    required_int(name, value.as_ref())
}

/// DELETE /user/remove_liked_actor
pub async fn remove_liked_actor(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    params: Result<Query<IdParams>, QueryRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Query(params) = params?;
    let actor_id = query_int("actor_id", params.actor_id.as_deref())?;

    let message =
        preferences::remove_liked_id(state.store.as_ref(), &user.user_id, LikedSet::Actors, actor_id)
            .await?;
    Ok(Json(MessageResponse::new(message)))
}

/// DELETE /user/remove_liked_genre
pub async fn remove_liked_genre(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    params: Result<Query<IdParams>, QueryRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Query(params) = params?;
    let genre_id = query_int("genre_id", params.genre_id.as_deref())?;

    let message =
        preferences::remove_liked_id(state.store.as_ref(), &user.user_id, LikedSet::Genres, genre_id)
            .await?;
    Ok(Json(MessageResponse::new(message)))
}

/// DELETE /user/remove_liked_movie
pub async fn remove_liked_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    params: Result<Query<IdParams>, QueryRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Query(params) = params?;
    let movie_id = required_movie_id(params.movie_id.as_deref())?;

    let message =
        preferences::remove_liked_movie(state.store.as_ref(), &user.user_id, &movie_id).await?;
    Ok(Json(MessageResponse::new(message)))
}

/// GET /user/user_preference
pub async fn user_preference(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<UserPreferenceResponse>> {
    let personalization = state.personalization(&user.user_id).await?;
    let enricher = state.enricher(&personalization);
    let response =
        preferences::user_preferences(state.store.as_ref(), &enricher, &user.user_id).await?;
    Ok(Json(response))
}
