//! Configuration for the analysis server.
//!
//! Engine tunables live in [`coach_engine::config`]; this module only adds
//! what the HTTP boundary needs.

use std::net::SocketAddr;

/// Get the address the HTTP server binds to.
///
/// Priority:
/// 1. `COACH_BIND_ADDR` env variable if set (falls back to default if the
///    value is not a valid socket address)
/// 2. `127.0.0.1:3001` as fallback
pub fn get_bind_addr() -> SocketAddr {
    std::env::var("COACH_BIND_ADDR")
        .ok()
        .and_then(|addr| addr.parse().ok())
        .unwrap_or_else(default_bind_addr)
}

/// `127.0.0.1:3001`, the port the web frontend expects.
fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3001))
}
