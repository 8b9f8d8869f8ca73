//! 限流
//!
//! 基于路由预设和会员等级的固定窗口限流

pub mod classifier;
pub mod identifier;
pub mod limiter;
pub mod middleware;
pub mod tier;
pub mod types;

pub use classifier::EndpointClassifier;
pub use identifier::client_identifier;
pub use limiter::{Clock, RateLimiter};
pub use middleware::{RateLimitMiddleware, rate_limit_middleware};
pub use tier::{AuthenticatedUser, UserTier};
pub use types::{RateLimitResult, RateLimitRule, RateLimitStatus, RoutePreset};
