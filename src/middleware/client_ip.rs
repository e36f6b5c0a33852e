// src/middleware/client_ip.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const REAL_IP_HEADER: &str = "x-real-ip";
const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort client address behind the reverse proxy; used as the rate
/// limiter key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        if let Some(first) = header(FORWARDED_FOR_HEADER)
            .and_then(|list| list.split(',').next().map(|ip| ip.trim().to_string()))
            .filter(|ip| !ip.is_empty())
        {
            return ClientIp(first);
        }

        if let Some(real_ip) = header(REAL_IP_HEADER)
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
        {
            return ClientIp(real_ip);
        }

        ClientIp(UNKNOWN_CLIENT.to_string())
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp::from_headers(&parts.headers))
    }
}
