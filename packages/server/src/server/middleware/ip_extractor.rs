use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};

/// Extension key for storing extracted IP address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl ClientIp {
    /// Text form stored in the audit tables
    pub fn to_audit_string(self) -> String {
        self.0.to_string()
    }
}

/// Middleware to extract client IP address from request
///
/// Priority:
/// 1. X-Forwarded-For header (for requests through proxies)
/// 2. X-Real-IP header (for Nginx)
/// 3. ConnectInfo socket address (direct connection, absent in tests)
pub async fn extract_client_ip(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let ip = header_ip(headers.get("x-forwarded-for"), true)
        .or_else(|| header_ip(headers.get("x-real-ip"), false))
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip()));

    if let Some(ip) = ip {
        request.extensions_mut().insert(ClientIp(ip));
    }

    next.run(request).await
}

fn header_ip(value: Option<&axum::http::HeaderValue>, first_of_list: bool) -> Option<IpAddr> {
    let raw = value?.to_str().ok()?;
    let candidate = if first_of_list {
        raw.split(',').next()?
    } else {
        raw
    };
    candidate.trim().parse().ok()
}
