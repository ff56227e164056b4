use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{CastView, CrewView, KeywordTags, MovieDetailResponse, MovieId, MoviePage, MovieView, SortField},
    routes::{required_movie_id, AppState},
    services::{
        catalog::{self, ListQuery},
        Pagination, Personalization,
    },
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    keyword: Option<String>,
    page: Option<String>,
    limit: Option<String>,
    sort_by: Option<String>,
    skinny: Option<String>,
}

fn truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

impl ListParams {
    fn into_query(self) -> AppResult<ListQuery> {
        let sort_by = match self.sort_by.as_deref().map(str::trim) {
            Some(field) if !field.is_empty() => Some(SortField::parse(field).ok_or_else(|| {
                AppError::InvalidInput(format!("Unsupported sort_by field: {}", field))
            })?),
            _ => None,
        };
        Ok(ListQuery {
            pagination: Pagination::from_params(self.page.as_deref(), self.limit.as_deref())?,
            skinny: truthy(self.skinny.as_deref()),
            keyword: self.keyword,
            sort_by,
        })
    }
}

/// GET /movies/list
pub async fn list(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> AppResult<Json<MoviePage>> {
    let Query(params) = params?;
    let query = params.into_query()?;

    let personalization = state.personalization(&user.user_id).await?;
    let enricher = state.enricher(&personalization);
    let page = catalog::list_movies(state.store.as_ref(), &enricher, &query).await?;

    tracing::info!(
        user_id = %user.user_id,
        page = page.page,
        total = page.total_movies,
        "Listed movies"
    );
    Ok(Json(page))
}

/// GET /movies/movie/:id
pub async fn detail(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MovieDetailResponse>> {
    let id = MovieId::new(id);
    let personalization = state.personalization(&user.user_id).await?;
    let enricher = state.enricher(&personalization);

    let detail = catalog::movie_detail(state.store.as_ref(), &enricher, &id).await?;
    Ok(Json(detail))
}

/// GET /movies/poster/:id
pub async fn poster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let id = MovieId::new(id);
    if state.store.get_movie(&id).await?.is_none() {
        return Err(AppError::NotFound("Poster not found".to_string()));
    }
    let url = state.signer.signed_url(&id.poster_blob())?;
    Ok(Redirect::temporary(&url))
}

#[derive(Debug, Deserialize)]
pub struct SignedUrlRequest {
    filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignedUrlResponse {
    signed_url: String,
}

/// POST /movies/get-signed-url
pub async fn signed_url(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignedUrlRequest>, JsonRejection>,
) -> AppResult<Json<SignedUrlResponse>> {
    let Json(request) = payload?;
    let filename = request
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("filename is required".to_string()))?;

    Ok(Json(SignedUrlResponse {
        signed_url: state.signer.signed_url(&filename)?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MovieIdBody {
    movie_id: Option<MovieId>,
}

#[derive(Debug, Serialize)]
pub struct KeywordsResponse {
    movie_id: MovieId,
    keywords: KeywordTags,
}

/// POST /movies/keywords
pub async fn keywords(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MovieIdBody>, JsonRejection>,
) -> AppResult<Json<KeywordsResponse>> {
    let Json(body) = payload?;
    let movie_id = body
        .movie_id
        .ok_or_else(|| AppError::InvalidInput("movie_id is required".to_string()))?;

    let doc = state
        .store
        .movie_keywords(&movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Keywords not found".to_string()))?;

    Ok(Json(KeywordsResponse {
        movie_id,
        keywords: doc.keywords,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MovieIdParams {
    movie_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CastResponse {
    movie_id: MovieId,
    cast: Vec<CastView>,
}

#[derive(Debug, Serialize)]
pub struct CrewResponse {
    movie_id: MovieId,
    crew: Vec<CrewView>,
}

/// GET /movies/cast_details
pub async fn cast_details(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    params: Result<Query<MovieIdParams>, QueryRejection>,
) -> AppResult<Json<CastResponse>> {
    let Query(params) = params?;
    let movie_id = required_movie_id(params.movie_id.as_deref())?;

    let personalization = state.personalization(&user.user_id).await?;
    let enricher = state.enricher(&personalization);
    let cast = catalog::cast_details(state.store.as_ref(), &enricher, &movie_id).await?;
    Ok(Json(CastResponse { movie_id, cast }))
}

/// GET /movies/crewdetails
pub async fn crew_details(
    State(state): State<Arc<AppState>>,
    params: Result<Query<MovieIdParams>, QueryRejection>,
) -> AppResult<Json<CrewResponse>> {
    let Query(params) = params?;
    let movie_id = required_movie_id(params.movie_id.as_deref())?;

    let personalization = Personalization::default();
    let enricher = state.enricher(&personalization);
    let crew = catalog::crew_details(state.store.as_ref(), &enricher, &movie_id).await?;
    Ok(Json(CrewResponse { movie_id, crew }))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    query: String,
    limit: Option<usize>,
}

/// POST /movies/search
pub async fn search(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> AppResult<Json<Vec<MovieView>>> {
    let Json(request) = payload?;

    let personalization = state.personalization(&user.user_id).await?;
    let enricher = state.enricher(&personalization);
    let movies = catalog::semantic_search(
        state.store.as_ref(),
        state.embedder.as_ref(),
        &enricher,
        &request.query,
        request.limit,
    )
    .await?;
    Ok(Json(movies))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skinny_flag_values() {
        assert!(truthy(Some("true")));
        assert!(truthy(Some("1")));
        assert!(truthy(Some("TRUE")));
        assert!(!truthy(Some("false")));
        assert!(!truthy(None));
    }

    #[test]
    fn test_unknown_sort_field_rejected() {
        let params = ListParams {
            keyword: None,
            page: None,
            limit: None,
            sort_by: Some("budget".into()),
            skinny: None,
        };
        assert!(matches!(params.into_query(), Err(AppError::InvalidInput(_))));
    }
}
