//! Fault-injection decision for the plaintext test server.
//!
//! Each request is judged only from its own `x-error-rate` header and a
//! fresh uniform draw; there are no counters or other shared state.

use rand::Rng;
use refarch_types::fault::{DRAW_UPPER_BOUND, ErrorRate, FaultDecision};

/// Decide what to do with a request carrying `header` (the raw
/// `x-error-rate` value, if any), drawing from `rng`.
///
/// An absent or empty header always echoes. A malformed or out-of-range
/// value yields [`FaultDecision::Invalid`] and consumes no randomness.
pub fn decide<R: Rng + ?Sized>(header: Option<&str>, rng: &mut R) -> FaultDecision {
    let Some(raw) = header.filter(|value| !value.is_empty()) else {
        return FaultDecision::Echo;
    };
    match raw.parse::<ErrorRate>() {
        Err(err) => FaultDecision::Invalid(err),
        Ok(rate) => {
            let draw = rng.gen_range(0..DRAW_UPPER_BOUND);
            tracing::trace!(rate = rate.percent(), draw, "fault draw");
            if rate.should_fail(draw) {
                FaultDecision::Inject
            } else {
                FaultDecision::Echo
            }
        }
    }
}

/// [`decide`] using the calling thread's generator.
pub fn decide_for_request(header: Option<&str>) -> FaultDecision {
    decide(header, &mut rand::thread_rng())
}
