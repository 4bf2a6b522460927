//! Client identification for rate limiting.
//!
//! The key is the TCP peer address. Behind reverse proxies that append to
//! `X-Forwarded-For`, set `TRUST_FORWARDED_FOR=true` and `TRUSTED_PROXY_HOPS`
//! to the number of proxies; the client is then the entry that many places
//! from the right. Anything further left was supplied by the client and is
//! ignored. Requests with no usable address share one bucket.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::state::AppState;

/// Bucket used when no address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort identity of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientIdentity {
    pub ip: Option<IpAddr>,
}

impl ClientIdentity {
    pub fn from_ip(ip: IpAddr) -> Self {
        Self { ip: Some(ip) }
    }

    /// The rate-limit key.
    pub fn key(&self) -> String {
        self.ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }

    /// Resolve the identity from request headers and the peer address.
    pub fn resolve(
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        trust_forwarded_for: bool,
        trusted_proxy_hops: usize,
    ) -> Self {
        if trust_forwarded_for {
            if let Some(ip) = forwarded_client(headers, trusted_proxy_hops) {
                return Self::from_ip(ip);
            }
        }
        Self {
            ip: peer.map(|addr| addr.ip()),
        }
    }
}

/// The address appended by the outermost trusted proxy, `hops` entries from
/// the right. Multiple header lines are read in order as one list.
fn forwarded_client(headers: &HeaderMap, hops: usize) -> Option<IpAddr> {
    if hops == 0 {
        return None;
    }
    let mut entries = Vec::new();
    for value in headers.get_all("x-forwarded-for") {
        entries.extend(value.to_str().ok()?.split(',').map(str::trim));
    }
    let index = entries.len().checked_sub(hops)?;
    entries[index].parse().ok()
}

impl FromRequestParts<AppState> for ClientIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::resolve(
            &parts.headers,
            peer,
            state.config.trust_forwarded_for,
            state.config.trusted_proxy_hops,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.7:51234".parse().unwrap())
    }

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn uses_peer_address_by_default() {
        let id = ClientIdentity::resolve(&forwarded("203.0.113.9"), peer(), false, 1);
        assert_eq!(id.key(), "10.0.0.7");
    }

    #[test]
    fn forged_leftmost_hop_is_ignored() {
        let id = ClientIdentity::resolve(
            &forwarded("198.51.100.99, 203.0.113.9"),
            peer(),
            true,
            1,
        );
        assert_eq!(id.key(), "203.0.113.9");
    }

    #[test]
    fn single_entry_is_the_client_with_one_proxy() {
        let id = ClientIdentity::resolve(&forwarded("203.0.113.9"), peer(), true, 1);
        assert_eq!(id.key(), "203.0.113.9");
    }

    #[test]
    fn counts_trusted_hops_from_the_right() {
        let id = ClientIdentity::resolve(
            &forwarded("198.51.100.99, 203.0.113.9, 10.0.0.1"),
            peer(),
            true,
            2,
        );
        assert_eq!(id.key(), "203.0.113.9");
    }

    #[test]
    fn joins_repeated_header_lines() {
        let mut headers = forwarded("198.51.100.99");
        headers.append("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        let id = ClientIdentity::resolve(&headers, peer(), true, 1);
        assert_eq!(id.key(), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_peer_with_fewer_entries_than_hops() {
        let id = ClientIdentity::resolve(&forwarded("203.0.113.9"), peer(), true, 2);
        assert_eq!(id.key(), "10.0.0.7");
    }

    #[test]
    fn falls_back_to_peer_on_garbage_header() {
        let id = ClientIdentity::resolve(&forwarded("not-an-ip"), peer(), true, 1);
        assert_eq!(id.key(), "10.0.0.7");
    }

    #[test]
    fn unknown_without_any_address() {
        let id = ClientIdentity::resolve(&HeaderMap::new(), None, true, 1);
        assert_eq!(id.key(), UNKNOWN_CLIENT);
    }
}
