use reqwest::Client as HttpClient;
use serde::Serialize;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
};

/// Turns free text into the vector space of the catalog's movie embeddings
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a str,
}

/// Client for a text-embeddings-inference style `/embed` endpoint, which
/// answers with one vector per input
#[derive(Clone)]
pub struct HttpEmbeddingProvider {
    http_client: HttpClient,
    api_url: String,
    cache: Cache,
    cache_ttl: u64,
}

impl HttpEmbeddingProvider {
    pub fn new(cache: Cache, api_url: String, cache_ttl: u64) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            cache,
            cache_ttl,
        }
    }

    async fn request_embedding(&self, text: &str) -> AppResult<Vec<f32>> {
        let response = self
            .http_client
            .post(&self.api_url)
            .json(&EmbedRequest { inputs: text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "Embedding service returned {}",
                response.status()
            )));
        }

        let mut vectors: Vec<Vec<f32>> = response.json().await?;
        if vectors.is_empty() {
            return Err(AppError::ExternalApi(
                "Embedding service returned no vectors".to_string(),
            ));
        }
        Ok(vectors.swap_remove(0))
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        cached!(
            self.cache,
            CacheKey::QueryEmbedding(text.to_string()),
            self.cache_ttl,
            self.request_embedding(text)
        )
    }
}
