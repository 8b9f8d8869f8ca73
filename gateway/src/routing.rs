//! 路由

use crate::middleware::request_logging;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use lux_common::HealthReport;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// 构建完整路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_report).head(liveness))
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /api/health：完整依赖检查
async fn health_report(State(state): State<AppState>) -> Response {
    let aggregator = state.aggregator.clone();

    match tokio::spawn(async move { aggregator.run().await }).await {
        Ok(report) => {
            let status = if report.status().is_serving() {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            (status, Json(report)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Health check endpoint failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthReport::fallback(state.version())),
            )
                .into_response()
        }
    }
}

/// HEAD /api/health：仅存活检查，供负载均衡使用
async fn liveness(State(state): State<AppState>) -> Response {
    let result = state.liveness.check();
    let status = if result.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let mut response = status.into_response();
    let headers = response.headers_mut();
    headers.insert("X-Health-Status", HeaderValue::from_static(result.status.as_str()));
    if let Ok(value) = HeaderValue::from_str(&result.timestamp.to_rfc3339()) {
        headers.insert("X-Health-Timestamp", value);
    }
    response
}

/// GET /metrics：Prometheus 文本格式
async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
