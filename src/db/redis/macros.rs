/// Read-through caching over a [`Cache`](crate::db::Cache).
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$block`, queues the result for writing with `$ttl` seconds to live and
/// returns it. A failed cache read is logged and treated as a miss; errors
/// from `$block` propagate with `?`, so use it as the tail expression of a
/// function returning `AppResult`.
///
/// ```rust,ignore
/// async fn key_set(&self) -> AppResult<JwkSet> {
///     cached!(self.cache, CacheKey::Jwks(self.jwks_url.clone()), 3600, self.fetch_key_set())
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await {
            Ok(Some(hit)) => {
                tracing::debug!(key = %key, "Cache hit");
                Ok(hit)
            }
            lookup => {
                if let Err(e) = lookup {
                    tracing::warn!(error = %e, key = %key, "Cache read failed, computing value");
                }
                let value = $block.await?;
                $cache.set_in_background(&key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
