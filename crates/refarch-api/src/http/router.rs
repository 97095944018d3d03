//! Routers for the two listeners.
//!
//! Every path is served by the same handler, so the routers consist of a
//! fallback plus the request trace layer.

use axum::Router;
use tower_http::trace::TraceLayer;

use refarch_types::config::ServerVariant;

use crate::http::handlers::echo;

/// Router for the plaintext listener.
pub fn build_http_router(variant: ServerVariant) -> Router {
    let router = match variant {
        ServerVariant::Echo => Router::new().fallback(echo::echo_http),
        ServerVariant::FaultInjecting => Router::new().fallback(echo::fault_injecting_http),
    };
    router.layer(TraceLayer::new_for_http())
}

/// Router for the TLS listener.
pub fn build_https_router() -> Router {
    Router::new()
        .fallback(echo::echo_https)
        .layer(TraceLayer::new_for_http())
}
