use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    error::{AppError, AppResult},
    routes::AppState,
    services::Claims,
};

/// The authenticated caller, inserted into request extensions by `require_auth`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub claims: Claims,
}

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let invalid_format =
        || AppError::Unauthorized("Invalid Authorization header format".to_string());
    let value = value.to_str().map_err(|_| invalid_format())?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(invalid_format()),
    }
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token = bearer_token(request.headers())?;
    let claims = state.verifier.verify(token).await?;

    tracing::Span::current().record("user_id", claims.sub.as_str());
    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub.clone(),
        claims,
    });

    Ok(next.run(request).await)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn message(result: AppResult<&str>) -> String {
        match result {
            Err(AppError::Unauthorized(msg)) => msg,
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token(&headers("bearer  tok")).unwrap(), "tok");
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(message(bearer_token(&HeaderMap::new())), "Missing Authorization header");
    }

    #[test]
    fn test_malformed_header() {
        for value in ["Token abc", "Bearer", "Bearer a b", "abc"] {
            assert_eq!(
                message(bearer_token(&headers(value))),
                "Invalid Authorization header format"
            );
        }
    }
}
