use std::net::SocketAddr;

use axum::http::HeaderMap;

use crate::error::AppError;

pub const API_KEY_HEADER: &str = "x-api-key";
const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Plain equality against the configured shared secret.
pub(crate) fn check_api_key(expected: &str, presented: Option<&str>) -> Result<(), AppError> {
    match presented {
        None => Err(AppError::Unauthorized),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(AppError::Forbidden),
    }
}

/// Client identity for the IP gate: first `x-forwarded-for` hop when the
/// proxy is trusted, then `x-real-ip`, then the socket peer.
pub(crate) fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if trust_forwarded_for {
        if let Some(ip) = header(FORWARDED_FOR).or_else(|| header(REAL_IP)) {
            return ip;
        }
    }
    peer.map(|p| p.ip().to_string())
        .unwrap_or_else(|| "unknown".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_key_absent_mismatched_and_matching() {
        assert!(matches!(
            check_api_key("supersecret123", None),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            check_api_key("supersecret123", Some("guess")),
            Err(AppError::Forbidden)
        ));
        assert!(check_api_key("supersecret123", Some("supersecret123")).is_ok());
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR,
            HeaderValue::from_static(" 203.0.113.9 , 10.0.0.1"),
        );
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer), true), "203.0.113.9");
        assert_eq!(client_ip(&headers, Some(peer), false), "127.0.0.1");
    }

    #[test]
    fn falls_back_to_real_ip_then_peer_then_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert(REAL_IP, HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers, None, true), "198.51.100.2");

        let empty = HeaderMap::new();
        let peer: SocketAddr = "[::1]:8080".parse().unwrap();
        assert_eq!(client_ip(&empty, Some(peer), true), "::1");
        assert_eq!(client_ip(&empty, None, true), "unknown");
    }
}
