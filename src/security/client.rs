//! Client identification for rate-limit keys.
//!
//! Forwarded headers are only honored when the deployment sits behind a proxy
//! that sets them; otherwise any client could pick its own key.

use axum::http::HeaderMap;
use std::net::IpAddr;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Used when no address can be determined at all.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy)]
pub struct ClientResolver {
    trust_forwarded_for: bool,
}

impl ClientResolver {
    pub fn new(trust_forwarded_for: bool) -> Self {
        Self { trust_forwarded_for }
    }

    /// Identify the caller: left-most `X-Forwarded-For` entry, then
    /// `X-Real-IP`, then the socket peer.
    pub fn identify(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> String {
        if self.trust_forwarded_for {
            let forwarded = headers
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = forwarded {
                return ip.to_string();
            }

            let real_ip = headers
                .get(X_REAL_IP)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = real_ip {
                return ip.to_string();
            }
        }

        peer.map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let resolver = ClientResolver::new(true);
        let h = headers(&[("x-forwarded-for", "203.0.113.9, 10.0.0.2"), ("x-real-ip", "10.0.0.3")]);
        assert_eq!(resolver.identify(&h, None), "203.0.113.9");
    }

    #[test]
    fn test_untrusted_headers_fall_back_to_peer() {
        let resolver = ClientResolver::new(false);
        let h = headers(&[("x-forwarded-for", "203.0.113.9")]);
        let peer: IpAddr = "192.0.2.7".parse().unwrap();
        assert_eq!(resolver.identify(&h, Some(peer)), "192.0.2.7");
        assert_eq!(resolver.identify(&h, None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_real_ip_used_without_forwarded_for() {
        let resolver = ClientResolver::new(true);
        let h = headers(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(resolver.identify(&h, None), "198.51.100.4");
    }
}
