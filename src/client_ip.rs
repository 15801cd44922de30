//! Client address resolution for like deduplication.
//!
//! Behind a reverse proxy the peer address is the proxy itself, so the
//! `X-Forwarded-For` and `X-Real-IP` headers are consulted first when
//! `server.trust_forwarded_headers` is enabled.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use std::{convert::Infallible, net::IpAddr, net::SocketAddr, str::FromStr};

use crate::AppState;

pub const UNKNOWN_CLIENT: &str = "unknown";

/// The resolved client address as a string, `"unknown"` when nothing usable
/// was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let ip = resolve_client_ip(
            &parts.headers,
            peer,
            state.config.server.trust_forwarded_headers,
        );
        Ok(ClientIp(ip))
    }
}

pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_forwarded: bool) -> String {
    if trust_forwarded
        && let Some(ip) =
            extract_from_x_forwarded_for(headers).or_else(|| extract_single_header(headers, "x-real-ip"))
    {
        return ip.to_string();
    }

    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn extract_from_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded_for = headers.get("x-forwarded-for")?.to_str().ok()?;
    forwarded_for.split(',').next().and_then(parse_ip_value)
}

fn extract_single_header(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_ip_value)
}

fn parse_ip_value(raw: &str) -> Option<IpAddr> {
    let value = raw.trim().trim_matches('"');

    // "[2001:db8::1]:443"
    if let Some(stripped) = value.strip_prefix('[')
        && let Some((host, suffix)) = stripped.split_once(']')
        && (suffix.is_empty() || suffix.starts_with(':'))
    {
        return IpAddr::from_str(host).ok();
    }

    IpAddr::from_str(value).ok().or_else(|| {
        // "1.2.3.4:8080", but not a bare IPv6 address
        value.rsplit_once(':').and_then(|(host, port)| {
            if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
                IpAddr::from_str(host).ok()
            } else {
                None
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn forwarded_for_uses_first_entry() {
        let headers = headers(&[
            ("x-forwarded-for", "203.0.113.1, 198.51.100.22"),
            ("x-real-ip", "198.51.100.99"),
        ]);
        assert_eq!(resolve_client_ip(&headers, None, true), "203.0.113.1");
    }

    #[test]
    fn real_ip_used_when_forwarded_for_missing() {
        let headers = headers(&[("x-real-ip", "198.51.100.99:4431")]);
        assert_eq!(resolve_client_ip(&headers, None, true), "198.51.100.99");
    }

    #[test]
    fn untrusted_headers_fall_back_to_peer() {
        let headers = headers(&[("x-forwarded-for", "203.0.113.1")]);
        let peer = Some("10.0.0.5".parse().unwrap());
        assert_eq!(resolve_client_ip(&headers, peer, false), "10.0.0.5");
    }

    #[test]
    fn ipv6_with_port() {
        let headers = headers(&[("x-forwarded-for", "[2001:db8::20]:8443")]);
        assert_eq!(resolve_client_ip(&headers, None, true), "2001:db8::20");
    }

    #[test]
    fn nothing_usable_is_unknown() {
        let headers = headers(&[("x-forwarded-for", "not-an-ip")]);
        assert_eq!(resolve_client_ip(&headers, None, true), UNKNOWN_CLIENT);
    }
}
