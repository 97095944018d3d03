//! Textual rendering of a received request.

use std::fmt::Write as _;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::extract::Request;

/// Render `request` as its request line, one `name: value` line per header,
/// and the peer address when the connection info is known.
pub fn dump_request(request: &Request) -> String {
    let mut out = format!(
        "{} {} {:?}",
        request.method(),
        request.uri(),
        request.version()
    );
    for (name, value) in request.headers() {
        let _ = write!(out, "\n{name}: {}", String::from_utf8_lossy(value.as_bytes()));
    }
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        let _ = write!(out, "\nRemoteAddr: {addr}");
    }
    out
}
