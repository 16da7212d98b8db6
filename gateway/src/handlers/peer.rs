//! Transport-derived session keys.

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Network origin of a request.
///
/// The socket peer IP, unless `trust_forwarded` is set, in which case the
/// first `X-Forwarded-For` hop and then `X-Real-IP` take precedence.
pub fn transport_key(headers: &HeaderMap, peer: SocketAddr, trust_forwarded: bool) -> String {
    if trust_forwarded && let Some(origin) = forwarded_origin(headers) {
        return origin.to_string();
    }
    peer.ip().to_string()
}

fn forwarded_origin(headers: &HeaderMap) -> Option<&str> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    forwarded.or_else(real_ip)
}
