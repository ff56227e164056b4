pub mod memory;
pub mod mongo;
pub mod redis;
pub mod store;

pub use memory::{MemorySeed, MemoryStore};
pub use mongo::MongoStore;
pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use store::{CatalogStore, LikedSet, MovieSelector};
