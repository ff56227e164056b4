use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{GenreView, MessageResponse, MovieId, MoviePage},
    routes::{required_movie_id, AppState},
    services::{
        watchlist::{self, WatchlistFilter},
        Pagination,
    },
};

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    movie_id: Option<MovieId>,
}

/// POST /watchlist/create
pub async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    let movie_id = request
        .movie_id
        .ok_or_else(|| AppError::InvalidInput("movie_id is required".to_string()))?;

    let message = watchlist::add_to_watchlist(state.store.as_ref(), &user.user_id, &movie_id).await?;
    Ok(Json(MessageResponse::new(message)))
}

#[derive(Debug, Deserialize)]
pub struct GetParams {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
    year: Option<String>,
    genre: Option<String>,
}

/// GET /watchlist/get
pub async fn get(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    params: Result<Query<GetParams>, QueryRejection>,
) -> AppResult<Json<MoviePage>> {
    let Query(params) = params?;
    let pagination = Pagination::from_params(params.page.as_deref(), params.limit.as_deref())?;
    let filter = WatchlistFilter::new(
        params.search.as_deref(),
        params.genre.as_deref(),
        params.year.as_deref(),
    )?;

    let personalization = state.personalization(&user.user_id).await?;
    let enricher = state.enricher(&personalization);
    let page = watchlist::watchlist_page(state.store.as_ref(), &enricher, &filter, pagination).await?;

    tracing::info!(
        user_id = %user.user_id,
        total = page.total_movies,
        "Fetched watchlist"
    );
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct RemoveParams {
    movie_id: Option<String>,
}

/// DELETE /watchlist/remove
pub async fn remove(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    params: Result<Query<RemoveParams>, QueryRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Query(params) = params?;
    let movie_id = required_movie_id(params.movie_id.as_deref())?;

    let message =
        watchlist::remove_from_watchlist(state.store.as_ref(), &user.user_id, &movie_id).await?;
    Ok(Json(MessageResponse::new(message)))
}

/// GET /watchlist/get_genre_list
pub async fn genre_list(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<Vec<GenreView>>> {
    let personalization = state.personalization(&user.user_id).await?;
    let enricher = state.enricher(&personalization);
    let genres = watchlist::watchlist_genres(state.store.as_ref(), &enricher).await?;
    Ok(Json(genres))
}
