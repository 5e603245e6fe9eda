pub mod mock_scores;
pub mod normalize;
pub mod parser;
pub mod rate_limiter;
pub mod ratings_api;
pub mod resolver;
pub mod search;
pub mod transport;

pub use rate_limiter::RateLimiter;
pub use ratings_api::{OmdbClient, RatingsApi};
pub use resolver::RatingResolver;
pub use search::SearchResolver;
pub use transport::{is_allowed_target, ProxyTransport, ScrapeTransport};
