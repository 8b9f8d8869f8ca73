//! 限流中间件
//!
//! 集成用户等级、接口分类和限流检查

use crate::rate_limit::classifier::EndpointClassifier;
use crate::rate_limit::identifier::client_identifier;
use crate::rate_limit::limiter::RateLimiter;
use crate::rate_limit::tier::AuthenticatedUser;
use crate::rate_limit::types::{RateLimitExceededBody, RateLimitResult};
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// 不参与限流的路径
const EXEMPT_PATHS: &[&str] = &["/api/health", "/metrics"];

/// 限流中间件状态
#[derive(Clone)]
pub struct RateLimitMiddleware {
    /// 限流器
    pub rate_limiter: Arc<RateLimiter>,
    /// 接口分类器
    pub classifier: EndpointClassifier,
    /// 是否启用限流
    pub enabled: bool,
}

impl RateLimitMiddleware {
    pub fn new(rate_limiter: Arc<RateLimiter>, enabled: bool) -> Self {
        Self {
            rate_limiter,
            classifier: EndpointClassifier::new(),
            enabled,
        }
    }

    /// 处理限流检查，`None` 表示该请求不受限流约束
    // `Request` 不是 `Sync`，因此先同步读取所需数据，返回的 future 不持有 `&Request`
    pub fn check_rate_limit(
        &self,
        req: &Request,
    ) -> impl Future<Output = Option<RateLimitResult>> + Send + use<'_> {
        let path = req.uri().path().to_owned();
        let exempt = !self.enabled || EXEMPT_PATHS.contains(&path.as_str());
        let user = if exempt {
            None
        } else {
            req.extensions().get::<AuthenticatedUser>().cloned()
        };
        let identifier = if exempt || user.is_some() {
            None
        } else {
            Some(client_identifier(req.headers()))
        };

        async move {
            if exempt {
                return None;
            }

            // 已认证用户按等级限流
            if let Some(user) = user {
                return Some(
                    self.rate_limiter
                        .check_user(user.tier, &user.user_id, &path)
                        .await,
                );
            }

            let rule = self.classifier.classify(&path).rule();
            let identifier = identifier.unwrap_or_default();
            Some(self.rate_limiter.check(&identifier, &path, &rule).await)
        }
    }
}

/// 为响应添加限流相关头
pub fn add_rate_limit_headers(response: &mut Response, result: &RateLimitResult) {
    let headers = response.headers_mut();

    headers.insert("X-RateLimit-Limit", HeaderValue::from(result.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(result.remaining));

    // 未知重置时间时不输出
    if result.reset > 0 {
        headers.insert("X-RateLimit-Reset", HeaderValue::from(result.reset));
    }

    if let Some(retry_after) = result.retry_after {
        headers.insert("Retry-After", HeaderValue::from(retry_after));
    }
}

/// 429 响应
pub fn rejection_response(result: &RateLimitResult) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitExceededBody::new(result)),
    )
        .into_response();

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(result.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(result.reset));
    headers.insert(
        "Retry-After",
        HeaderValue::from(result.retry_after.unwrap_or(result.window_secs)),
    );

    response
}

/// Axum 中间件函数
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimitMiddleware>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(result) = state.check_rate_limit(&request).await else {
        return next.run(request).await;
    };

    if !result.allowed {
        return rejection_response(&result);
    }

    let mut response = next.run(request).await;
    add_rate_limit_headers(&mut response, &result);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::tier::UserTier;
    use crate::rate_limit::types::RateLimitRule;
    use axum::{Router, body::Body, http::Request as HttpRequest, middleware, routing::get};
    use lux_ports::{MockCachePort, NoopCache};
    use tower::ServiceExt;

    async fn handler() -> &'static str {
        "OK"
    }

    fn app(state: RateLimitMiddleware) -> Router {
        let state = Arc::new(state);
        Router::new()
            .route("/api/health", get(handler))
            .route("/api/fleet", get(handler))
            .route("/api/payment", get(handler))
            .layer(middleware::from_fn_with_state(state, rate_limit_middleware))
    }

    fn saturated_cache() -> MockCachePort {
        let mut mock = MockCachePort::new();
        mock.expect_is_configured().return_const(true);
        mock.expect_get_int().returning(|_| Ok(Some(1_000_000)));
        mock.expect_incr_and_expire().never();
        mock
    }

    #[test]
    fn test_add_headers_skips_zero_reset() {
        let rule = RateLimitRule::new(5, 60).unwrap();
        let mut response = Response::new(Body::empty());
        add_rate_limit_headers(&mut response, &RateLimitResult::pass_through(&rule));

        assert_eq!(response.headers()["X-RateLimit-Limit"], "5");
        assert_eq!(response.headers()["X-RateLimit-Remaining"], "5");
        assert!(response.headers().get("X-RateLimit-Reset").is_none());
        assert!(response.headers().get("Retry-After").is_none());
    }

    #[tokio::test]
    async fn test_health_is_exempt() {
        let limiter = Arc::new(RateLimiter::new(Arc::new(saturated_cache())));
        let response = app(RateLimitMiddleware::new(limiter, true))
            .oneshot(HttpRequest::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("X-RateLimit-Limit").is_none());
    }

    #[tokio::test]
    async fn test_saturated_route_is_rejected() {
        let limiter = Arc::new(RateLimiter::new(Arc::new(saturated_cache())));
        let response = app(RateLimitMiddleware::new(limiter, true))
            .oneshot(HttpRequest::get("/api/payment").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["X-RateLimit-Limit"], "3");
        assert_eq!(response.headers()["X-RateLimit-Remaining"], "0");
        assert_eq!(response.headers()["Retry-After"], "60");
    }

    #[tokio::test]
    async fn test_disabled_passes_everything() {
        let limiter = Arc::new(RateLimiter::new(Arc::new(saturated_cache())));
        let response = app(RateLimitMiddleware::new(limiter, false))
            .oneshot(HttpRequest::get("/api/payment").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_authenticated_user_uses_tier_quota() {
        let limiter = Arc::new(RateLimiter::new(Arc::new(NoopCache)));
        let state = RateLimitMiddleware::new(limiter, true);

        let mut request = HttpRequest::get("/api/fleet").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(AuthenticatedUser::new("u-1", UserTier::Gold));

        let result = state.check_rate_limit(&request).await.unwrap();
        assert_eq!(result.limit, 200);
    }
}
