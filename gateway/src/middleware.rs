//! 中间件

use crate::rate_limit::client_identifier;
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use lux_common::RequestId;
use tokio::time::Instant;
use tracing::{error, info};

/// 请求 ID 头
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// 请求日志中间件
///
/// 沿用上游传入的合法 `X-Request-Id`，否则生成新的，并写回响应头
pub async fn request_logging(mut request: Request, next: Next) -> Response {
    let start = Instant::now();

    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| RequestId::from_string(v).ok())
        .unwrap_or_default();
    request.extensions_mut().insert(request_id);

    let method = request.method().clone();
    let uri = request.uri().clone();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let client_ip = client_identifier(request.headers());

    let mut response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        error!(
            %request_id,
            %method,
            %uri,
            user_agent = %user_agent,
            client_ip = %client_ip,
            status,
            duration_ms,
            "API Request failed"
        );
    } else {
        info!(
            %request_id,
            %method,
            %uri,
            user_agent = %user_agent,
            client_ip = %client_ip,
            status,
            duration_ms,
            "API Request completed"
        );
    }

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }

    response
}
