//! 用户等级限流

use crate::rate_limit::types::RateLimitRule;
use serde::{Deserialize, Serialize};

/// 会员等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Elite,
}

impl UserTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
            Self::Elite => "elite",
        }
    }

    /// 按名称查找等级，未知名称回落到 Bronze
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "silver" => Self::Silver,
            "gold" => Self::Gold,
            "platinum" => Self::Platinum,
            "elite" => Self::Elite,
            _ => Self::Bronze,
        }
    }

    pub fn rule(&self) -> RateLimitRule {
        let max_requests = match self {
            Self::Bronze => 50,
            Self::Silver => 100,
            Self::Gold => 200,
            Self::Platinum => 500,
            Self::Elite => 1000,
        };
        RateLimitRule::preset(max_requests, 60)
    }
}

/// 上游认证层注入的请求扩展
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub tier: UserTier,
}

impl AuthenticatedUser {
    pub fn new(user_id: impl Into<String>, tier: UserTier) -> Self {
        Self {
            user_id: user_id.into(),
            tier,
        }
    }
}
