//! 客户端标识提取

use axum::http::HeaderMap;

/// 无法识别来源时使用的标识
pub const UNKNOWN_CLIENT: &str = "unknown";

/// 从代理头中提取客户端标识
///
/// 优先级：`X-Forwarded-For` 第一项、`X-Real-IP`、`CF-Connecting-IP`
pub fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        let first = forwarded.split(',').next().map(str::trim).unwrap_or("");
        return if first.is_empty() {
            UNKNOWN_CLIENT.to_string()
        } else {
            first.to_string()
        };
    }

    header_str(headers, "x-real-ip")
        .or_else(|| header_str(headers, "cf-connecting-ip"))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let h = headers(&[
            ("x-forwarded-for", " 203.0.113.7 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_identifier(&h), "203.0.113.7");
    }

    #[test]
    fn test_empty_forwarded_entry_is_unknown() {
        let h = headers(&[
            ("x-forwarded-for", " , 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_identifier(&h), "unknown");
    }

    #[test]
    fn test_real_ip_then_cloudflare() {
        let h = headers(&[("x-real-ip", "198.51.100.2"), ("cf-connecting-ip", "192.0.2.1")]);
        assert_eq!(client_identifier(&h), "198.51.100.2");

        let h = headers(&[("cf-connecting-ip", "192.0.2.1")]);
        assert_eq!(client_identifier(&h), "192.0.2.1");
    }

    #[test]
    fn test_no_headers() {
        assert_eq!(client_identifier(&HeaderMap::new()), "unknown");
    }
}
