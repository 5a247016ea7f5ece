//! Cache
//!
//! Este módulo contiene el session cache y su cliente Redis.

pub mod cache_config;
pub mod redis_client;
pub mod session_cache;

pub use cache_config::CacheConfig;
pub use redis_client::RedisClient;
pub use session_cache::{MemorySessionCache, RedisSessionCache, SessionCache};
