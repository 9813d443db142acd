use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Log target for access lines, so they can be filtered with
/// `RUST_LOG=ogma_prime::access=info`.
pub const ACCESS_LOG_TARGET: &str = "ogma_prime::access";

/// One finished request as it appears in the access log.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessRecord {
    pub method: String,
    pub address: String,
    pub status: u16,
    pub elapsed: Duration,
    pub path: String,
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {:?} {}",
            self.method, self.address, self.status, self.elapsed, self.path
        )
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Client address: `X-Real-IP`, then `X-Forwarded-For`, then the socket
/// peer, then `-`.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    header_value(headers, "x-real-ip")
        .or_else(|| header_value(headers, "x-forwarded-for"))
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.to_string()))
        .unwrap_or_else(|| "-".to_string())
}

/// Status logged for a request whose client went away before a response
/// was produced.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Request details waiting for their access line. Writes the line on drop if
/// `finish` was never reached, so an abandoned request is still logged once.
struct InFlight {
    method: String,
    address: String,
    path: String,
    start: Instant,
    logged: bool,
}

impl InFlight {
    fn emit(&mut self, status: u16) {
        if self.logged {
            return;
        }
        self.logged = true;
        let record = AccessRecord {
            method: std::mem::take(&mut self.method),
            address: std::mem::take(&mut self.address),
            status,
            elapsed: self.start.elapsed(),
            path: std::mem::take(&mut self.path),
        };
        log::info!(target: ACCESS_LOG_TARGET, "{}", record);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.emit(CLIENT_CLOSED_REQUEST);
    }
}

/// Middleware writing exactly one access line per request. The response is
/// passed through untouched.
pub async fn log_request(request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let mut in_flight = InFlight {
        method: request.method().to_string(),
        address: client_address(request.headers(), peer),
        path: request.uri().path().to_string(),
        start: Instant::now(),
        logged: false,
    };

    let response = next.run(request).await;

    in_flight.emit(response.status().as_u16());
    response
}
