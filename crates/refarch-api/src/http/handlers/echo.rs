//! Echo and fault-injection handlers.

use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use refarch_core::fault::decide_for_request;
use refarch_types::fault::{ERROR_RATE_HEADER, FaultDecision};

use crate::http::dump::dump_request;

/// Body returned when a fault is injected.
pub const SERVER_ERROR_BODY: &str = "Server error!";

/// Plaintext listener without fault injection.
pub async fn echo_http(request: Request) -> Response {
    text(StatusCode::OK, echo_body("http", &request))
}

/// TLS listener; headers never change the outcome.
pub async fn echo_https(request: Request) -> Response {
    text(StatusCode::OK, echo_body("https", &request))
}

/// Plaintext listener honouring `x-error-rate`.
pub async fn fault_injecting_http(request: Request) -> Response {
    let header = request
        .headers()
        .get(ERROR_RATE_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    match decide_for_request(header.as_deref()) {
        FaultDecision::Echo => echo_http(request).await,
        FaultDecision::Inject => {
            tracing::debug!("injecting fault for {}", request.uri());
            text(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_BODY.to_string())
        }
        // Malformed rates are reported in a 200 body, not as a client error.
        FaultDecision::Invalid(err) => text(StatusCode::OK, err.to_string()),
    }
}

fn echo_body(scheme: &str, request: &Request) -> String {
    format!(
        "This is an example {scheme} server.\n\n{}\n",
        dump_request(request)
    )
}

fn text(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))],
        body,
    )
        .into_response()
}
