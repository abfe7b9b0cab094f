pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{RateLimitConfig, RateLimitMiddleware, RateLimitStore};
pub use request_id::{CorrelationId, RequestId, RequestIdExt};
