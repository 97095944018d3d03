//! Fault-injection types for the plaintext test server.
//!
//! A request may carry `x-error-rate: <0..=100>`; the server then answers
//! with a 500 for roughly that percentage of requests.

use std::str::FromStr;

use crate::error::ErrorRateError;

/// Request header carrying the target error-rate percentage.
pub const ERROR_RATE_HEADER: &str = "x-error-rate";

/// Upper bound (exclusive) of the uniform draw a rate is compared against.
pub const DRAW_UPPER_BOUND: u8 = 100;

/// A validated error-rate percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ErrorRate(u8);

impl ErrorRate {
    pub const NEVER: ErrorRate = ErrorRate(0);
    pub const ALWAYS: ErrorRate = ErrorRate(100);

    pub fn new(percent: i64) -> Result<Self, ErrorRateError> {
        if !(0..=100).contains(&percent) {
            return Err(ErrorRateError::OutOfRange(percent));
        }
        Ok(Self(percent as u8))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Whether a draw from `[0, 100)` falls inside the failure band.
    ///
    /// Rate 0 never fails and rate 100 always fails.
    pub fn should_fail(self, draw: u8) -> bool {
        draw < self.0
    }
}

impl FromStr for ErrorRate {
    type Err = ErrorRateError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value: i64 = raw.parse().map_err(|e: std::num::ParseIntError| {
            ErrorRateError::Parse {
                raw: raw.to_string(),
                reason: e.to_string(),
            }
        })?;
        ErrorRate::new(value)
    }
}

/// What the plaintext handler should do with one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultDecision {
    /// Reply 200 with the request dump.
    Echo,
    /// Reply 500 with the fixed error body.
    Inject,
    /// Reply 200 with a description of the malformed header.
    Invalid(ErrorRateError),
}
