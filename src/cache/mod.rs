pub mod store;
pub mod sweeper;

pub use store::{CacheKey, CacheStats, ResultCache, DEFAULT_TTL};
pub use sweeper::{spawn_sweeper, SweeperHandle};
