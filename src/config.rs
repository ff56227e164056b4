use serde::Deserialize;

/// Which `CatalogStore` backend to run against
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongo,
    Memory,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_storage")]
    pub storage: StorageBackend,

    /// MongoDB connection string
    #[serde(default = "default_mongo_uri")]
    pub mongo_uri: String,

    #[serde(default = "default_mongo_database")]
    pub mongo_database: String,

    /// JSON seed file loaded into the in-memory store
    #[serde(default)]
    pub seed_path: Option<String>,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Azure storage account connection string (AccountName/AccountKey pairs)
    pub azure_storage_connection_string: String,

    #[serde(default = "default_blob_container")]
    pub blob_container: String,

    #[serde(default = "default_signed_url_ttl_minutes")]
    pub signed_url_ttl_minutes: i64,

    /// Token issuer, also the base of the default JWKS location
    pub auth_issuer: String,

    #[serde(default)]
    pub auth_audience: Option<String>,

    #[serde(default)]
    pub auth_jwks_url: Option<String>,

    #[serde(default = "default_jwks_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,

    /// Text-embedding endpoint used by semantic search
    #[serde(default = "default_embedding_api_url")]
    pub embedding_api_url: String,

    #[serde(default = "default_embedding_cache_ttl_secs")]
    pub embedding_cache_ttl_secs: u64,

    /// Name of the Atlas vector index over `movies_metadata.embedding`
    #[serde(default = "default_vector_index")]
    pub vector_index: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_storage() -> StorageBackend {
    StorageBackend::Mongo
}

fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_mongo_database() -> String {
    "movies".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_blob_container() -> String {
    "images".to_string()
}

fn default_signed_url_ttl_minutes() -> i64 {
    15
}

fn default_jwks_cache_ttl_secs() -> u64 {
    3600
}

fn default_embedding_api_url() -> String {
    "http://localhost:8080/embed".to_string()
}

fn default_embedding_cache_ttl_secs() -> u64 {
    86400
}

fn default_vector_index() -> String {
    "vector_index".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// JWKS document location, derived from the issuer unless overridden
    pub fn jwks_url(&self) -> String {
        match &self.auth_jwks_url {
            Some(url) => url.clone(),
            None => format!(
                "{}/.well-known/jwks.json",
                self.auth_issuer.trim_end_matches('/')
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = from_pairs(&[
            ("AZURE_STORAGE_CONNECTION_STRING", "AccountName=a;AccountKey=a2V5"),
            ("AUTH_ISSUER", "https://issuer.example.com"),
        ]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.storage, StorageBackend::Mongo);
        assert_eq!(config.blob_container, "images");
        assert_eq!(config.signed_url_ttl_minutes, 15);
        assert!(config.auth_audience.is_none());
    }

    #[test]
    fn test_jwks_url_derived_from_issuer() {
        let config = from_pairs(&[
            ("AZURE_STORAGE_CONNECTION_STRING", "AccountName=a;AccountKey=a2V5"),
            ("AUTH_ISSUER", "https://issuer.example.com/"),
        ]);
        assert_eq!(
            config.jwks_url(),
            "https://issuer.example.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_memory_storage_parsed() {
        let config = from_pairs(&[
            ("AZURE_STORAGE_CONNECTION_STRING", "AccountName=a;AccountKey=a2V5"),
            ("AUTH_ISSUER", "https://issuer.example.com"),
            ("STORAGE", "memory"),
            ("SEED_PATH", "seed.json"),
        ]);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.seed_path.as_deref(), Some("seed.json"));
    }
}
