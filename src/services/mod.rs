pub mod auth;
pub mod catalog;
pub mod embedding;
pub mod enrichment;
pub mod pagination;
pub mod preferences;
pub mod signing;
pub mod watchlist;

pub use auth::{Claims, JwksVerifier, TokenVerifier};
pub use embedding::{EmbeddingProvider, HttpEmbeddingProvider};
pub use enrichment::{Enricher, Personalization};
pub use pagination::Pagination;
pub use signing::{AzureSasSigner, BlobSigner};
