use crate::{
    db::{CatalogStore, MovieSelector},
    error::{AppError, AppResult},
    models::{CastView, CrewView, MovieDetailResponse, MovieId, MoviePage, MovieView, SortField},
    services::{
        embedding::EmbeddingProvider,
        enrichment::Enricher,
        pagination::Pagination,
    },
};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Movie listing request after parameter validation
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub keyword: Option<String>,
    pub sort_by: Option<SortField>,
    pub skinny: bool,
    pub pagination: Pagination,
}

/// Lists movies: title search first, keyword tags when no title matches,
/// otherwise the whole catalog
pub async fn list_movies(
    store: &dyn CatalogStore,
    enricher: &Enricher<'_>,
    query: &ListQuery,
) -> AppResult<MoviePage> {
    let pagination = query.pagination;
    let (skip, limit) = (pagination.offset(), pagination.limit);

    let (movies, total) = match query.keyword.as_deref().map(str::trim) {
        Some(keyword) if !keyword.is_empty() => {
            let by_title = MovieSelector::TitleContains(keyword.to_string());
            let (movies, total) = store.find_movies(&by_title, query.sort_by, skip, limit).await?;
            if total > 0 {
                (movies, total)
            } else {
                let ids = store.keyword_movie_ids(keyword).await?;
                tracing::debug!(keyword, matches = ids.len(), "No title match, using keyword tags");
                store
                    .find_movies(&MovieSelector::Ids(ids), query.sort_by, skip, limit)
                    .await?
            }
        }
        _ => {
            store
                .find_movies(&MovieSelector::All, query.sort_by, skip, limit)
                .await?
        }
    };

    let views = enricher.movies(store, movies, query.skinny).await?;
    Ok(pagination.into_page(total, views))
}

pub async fn movie_detail(
    store: &dyn CatalogStore,
    enricher: &Enricher<'_>,
    id: &MovieId,
) -> AppResult<MovieDetailResponse> {
    let movie = store
        .get_movie(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found".to_string()))?;

    let credit = store.get_credit(id).await?;
    let ratings = store.ratings_for(id).await?;

    let detail = enricher.detail(movie, credit.as_ref(), &ratings)?;
    Ok(MovieDetailResponse {
        movie: detail,
        ratings,
    })
}

pub async fn cast_details(
    store: &dyn CatalogStore,
    enricher: &Enricher<'_>,
    id: &MovieId,
) -> AppResult<Vec<CastView>> {
    let credit = store
        .get_credit(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Credits not found".to_string()))?;
    enricher.cast(&credit.cast)
}

pub async fn crew_details(
    store: &dyn CatalogStore,
    enricher: &Enricher<'_>,
    id: &MovieId,
) -> AppResult<Vec<CrewView>> {
    let credit = store
        .get_credit(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Credits not found".to_string()))?;
    enricher.crew(&credit.crew)
}

/// Embeds `query` and returns the nearest movies, best match first
pub async fn semantic_search(
    store: &dyn CatalogStore,
    embedder: &dyn EmbeddingProvider,
    enricher: &Enricher<'_>,
    query: &str,
    limit: Option<usize>,
) -> AppResult<Vec<MovieView>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("query is required".to_string()));
    }
    let limit = match limit {
        Some(0) => return Err(AppError::InvalidInput("limit must be a positive integer".to_string())),
        Some(n) => n.min(MAX_SEARCH_LIMIT),
        None => DEFAULT_SEARCH_LIMIT,
    };

    let embedding = embedder.embed(query).await?;
    let ids = store.vector_search(&embedding, limit).await?;
    tracing::info!(hits = ids.len(), "Semantic search completed");

    enricher.fetch_movies(store, &ids, false).await
}
