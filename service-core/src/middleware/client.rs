//! Caller metadata supplied by the transport rather than the request body.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Resolve the caller address: first `x-forwarded-for` hop, else the socket peer.
pub fn client_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| s.parse::<std::net::IpAddr>().is_ok())
        .map(|s| s.to_string());

    forwarded.or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// User agent, source address and bearer credential of the current request.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub source_addr: Option<String>,
    pub bearer: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Ok(ClientMeta {
            user_agent,
            source_addr: client_addr(&parts.headers, peer),
            bearer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        let peer = Some("127.0.0.1:9000".parse().unwrap());
        assert_eq!(client_addr(&headers, peer), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn garbage_forwarded_for_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "not-an-ip".parse().unwrap());
        let peer = Some("192.0.2.10:443".parse().unwrap());
        assert_eq!(client_addr(&headers, peer), Some("192.0.2.10".to_string()));
    }

    #[test]
    fn no_source_at_all() {
        assert_eq!(client_addr(&HeaderMap::new(), None), None);
    }
}
