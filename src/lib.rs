pub mod blocking_cache;
pub mod cache_soc;
pub mod error;
