use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::CatalogStore,
    error::{AppError, AppResult},
    middleware::{make_span, request_id_middleware, require_auth},
    models::MovieId,
    services::{BlobSigner, EmbeddingProvider, Enricher, Personalization, TokenVerifier},
};

pub mod movies;
pub mod users;
pub mod watchlist;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub signer: Arc<dyn BlobSigner>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl AppState {
    pub async fn personalization(&self, user_id: &str) -> AppResult<Personalization> {
        Personalization::load(self.store.as_ref(), user_id).await
    }

    pub fn enricher<'a>(&'a self, personalization: &'a Personalization) -> Enricher<'a> {
        Enricher::new(self.signer.as_ref(), personalization)
    }
}

/// Parses a required movie id from a query-string value
pub(crate) fn required_movie_id(raw: Option<&str>) -> AppResult<MovieId> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(MovieId::from)
        .ok_or_else(|| AppError::InvalidInput("movie_id is required".to_string()))
}

/// Accepts an integer or a numeric string
pub(crate) fn required_int(name: &str, value: Option<&Value>) -> AppResult<i64> {
    let parsed = match value {
        None | Some(Value::Null) => {
            return Err(AppError::InvalidInput(format!("{} is required", name)))
        }
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(AppError::InvalidInput(format!("{} is required", name)))
        }
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    };
    parsed.ok_or_else(|| AppError::InvalidInput(format!("{} must be an integer", name)))
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/movies/list", get(movies::list))
        .route("/movies/movie/:id", get(movies::detail))
        .route("/movies/get-signed-url", post(movies::signed_url))
        .route("/movies/cast_details", get(movies::cast_details))
        .route("/movies/crewdetails", get(movies::crew_details))
        .route("/movies/search", post(movies::search))
        .route("/watchlist/create", post(watchlist::create))
        .route("/watchlist/get", get(watchlist::get))
        .route("/watchlist/remove", delete(watchlist::remove))
        .route("/watchlist/get_genre_list", get(watchlist::genre_list))
        .route("/user/add_liked_actor", post(users::add_liked_actor))
        .route("/user/add_liked_genre", post(users::add_liked_genre))
        .route("/user/add_liked_movie", post(users::add_liked_movie))
        .route("/user/remove_liked_actor", delete(users::remove_liked_actor))
        .route("/user/remove_liked_genre", delete(users::remove_liked_genre))
        .route("/user/remove_liked_movie", delete(users::remove_liked_movie))
        .route("/user/user_preference", get(users::user_preference))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health_check))
        .route("/ping", get(ping))
        .route("/movies/poster/:id", get(movies::poster))
        .route("/movies/keywords", post(movies::keywords))
        .merge(protected)
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::{enrichment::tests::PlainSigner, Claims};
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    struct RejectAll;

    #[async_trait::async_trait]
    impl TokenVerifier for RejectAll {
        async fn verify(&self, _token: &str) -> AppResult<Claims> {
            Err(AppError::Unauthorized("Invalid token".to_string()))
        }
    }

    struct NoEmbeddings;

    #[async_trait::async_trait]
    impl EmbeddingProvider for NoEmbeddings {
        async fn embed(&self, _text: &str) -> AppResult<Vec<f32>> {
            Ok(Vec::new())
        }
    }

    fn app() -> Router {
        create_router(Arc::new(AppState {
            store: Arc::new(MemoryStore::new()),
            signer: Arc::new(PlainSigner),
            verifier: Arc::new(RejectAll),
            embedder: Arc::new(NoEmbeddings),
        }))
    }

    #[tokio::test]
    async fn test_public_routes_skip_auth() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let request = Request::builder()
            .uri("/watchlist/get")
            .header("authorization", "Bearer anything")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_required_int_accepts_numeric_strings() {
        assert_eq!(required_int("actor_id", Some(&json!(31))).unwrap(), 31);
        assert_eq!(required_int("actor_id", Some(&json!(" 31 "))).unwrap(), 31);
    }

    #[test]
    fn test_required_int_rejects_missing_and_garbage() {
        assert!(matches!(
            required_int("genre_id", None),
            Err(AppError::InvalidInput(msg)) if msg == "genre_id is required"
        ));
        assert!(matches!(
            required_int("genre_id", Some(&json!("drama"))),
            Err(AppError::InvalidInput(msg)) if msg == "genre_id must be an integer"
        ));
        assert!(required_int("genre_id", Some(&json!(1.5))).is_err());
    }

    #[test]
    fn test_required_movie_id() {
        assert_eq!(required_movie_id(Some(" 862 ")).unwrap(), MovieId::from(862));
        assert!(required_movie_id(Some("")).is_err());
    }
}
