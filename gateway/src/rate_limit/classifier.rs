//! 接口分类器
//!
//! 根据请求路径选择限流预设

use crate::rate_limit::types::RoutePreset;
use once_cell::sync::Lazy;
use regex::Regex;

/// 接口分类器
#[derive(Debug, Clone, Default)]
pub struct EndpointClassifier;

/// 认证接口路径正则表达式
static AUTH_PATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/api/auth(/|$)").unwrap());

/// 下单接口路径正则表达式
static BOOKING_PATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/api/bookings?(/|$)").unwrap());

/// 支付接口路径正则表达式
static PAYMENT_PATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/api/payments?(/|$)").unwrap());

impl EndpointClassifier {
    pub fn new() -> Self {
        Self
    }

    /// 对请求路径进行分类
    ///
    /// # 分类规则
    /// 1. Auth: `/api/auth/*`
    /// 2. Booking: `/api/booking*`
    /// 3. Payment: `/api/payment*`
    /// 4. 其他均为 Api
    pub fn classify(&self, path: &str) -> RoutePreset {
        if AUTH_PATH_REGEX.is_match(path) {
            return RoutePreset::Auth;
        }
        if BOOKING_PATH_REGEX.is_match(path) {
            return RoutePreset::Booking;
        }
        if PAYMENT_PATH_REGEX.is_match(path) {
            return RoutePreset::Payment;
        }
        RoutePreset::Api
    }
}
