use jsonwebtoken::{
    decode, decode_header,
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
};

pub const INVALID_TOKEN: &str = "Invalid token";

/// Verified token payload. `sub` is the caller's user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Checks a bearer token and returns its claims.
///
/// Every rejection is reported as `AppError::Unauthorized`; failing to
/// reach the issuer is an upstream error instead.
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> AppResult<Claims>;
}

fn rejected(reason: impl std::fmt::Display) -> AppError {
    tracing::warn!(reason = %reason, "Token verification failed");
    AppError::Unauthorized(INVALID_TOKEN.to_string())
}

/// Verifies RS256 tokens against the issuer's published key set
#[derive(Clone)]
pub struct JwksVerifier {
    http_client: HttpClient,
    jwks_url: String,
    issuer: String,
    audience: Option<String>,
    cache: Cache,
    cache_ttl: u64,
}

impl JwksVerifier {
    pub fn new(
        cache: Cache,
        jwks_url: String,
        issuer: String,
        audience: Option<String>,
        cache_ttl: u64,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            jwks_url,
            issuer,
            audience,
            cache,
            cache_ttl,
        }
    }

    async fn fetch_key_set(&self) -> AppResult<JwkSet> {
        tracing::info!(url = %self.jwks_url, "Fetching JWKS");
        let response = self.http_client.get(&self.jwks_url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn key_set(&self) -> AppResult<JwkSet> {
        cached!(
            self.cache,
            CacheKey::Jwks(self.jwks_url.clone()),
            self.cache_ttl,
            self.fetch_key_set()
        )
    }

    /// Finds the key for `kid`, refetching once in case the issuer rotated keys
    async fn find_key(&self, kid: &str) -> AppResult<Jwk> {
        if let Some(jwk) = self.key_set().await?.find(kid) {
            return Ok(jwk.clone());
        }

        let fresh = self.fetch_key_set().await?;
        let jwk = fresh
            .find(kid)
            .cloned()
            .ok_or_else(|| rejected(format!("no key with kid {}", kid)))?;
        self.cache
            .set_in_background(&CacheKey::Jwks(self.jwks_url.clone()), &fresh, self.cache_ttl);
        Ok(jwk)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience.as_str()]),
            None => validation.validate_aud = false,
        }
        validation
    }
}

#[async_trait::async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> AppResult<Claims> {
        let header = decode_header(token).map_err(rejected)?;
        let kid = header.kid.ok_or_else(|| rejected("token header has no kid"))?;

        let jwk = self.find_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(rejected)?;

        let data = decode::<Claims>(token, &key, &self.validation()).map_err(rejected)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_keep_extra_fields() {
        let claims: Claims = serde_json::from_str(
            r#"{"sub": "user_2abc", "iss": "https://issuer.example.com", "sid": "sess_1"}"#,
        )
        .unwrap();
        assert_eq!(claims.sub, "user_2abc");
        assert_eq!(claims.extra["sid"], "sess_1");
    }

    #[test]
    fn test_rejected_maps_to_invalid_token() {
        match rejected("bad signature") {
            AppError::Unauthorized(msg) => assert_eq!(msg, INVALID_TOKEN),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_token_rejected_before_key_lookup() {
        let client = crate::db::create_redis_client("redis://localhost:6379").unwrap();
        let (cache, _handle) = Cache::new(client);
        let verifier = JwksVerifier::new(
            cache,
            "http://127.0.0.1:9/jwks.json".into(),
            "https://issuer.example.com".into(),
            None,
            60,
        );

        let result = verifier.verify("not-a-jwt").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_validation_without_audience_skips_aud_check() {
        let client = crate::db::create_redis_client("redis://localhost:6379").unwrap();
        let (cache, _handle) = Cache::new(client);
        let verifier = JwksVerifier::new(
            cache,
            "http://127.0.0.1:9/jwks.json".into(),
            "https://issuer.example.com".into(),
            None,
            60,
        );
        assert!(!verifier.validation().validate_aud);
    }
}
