//! Command runner trait.
//!
//! The walker never spawns processes directly; it hands each
//! [`Invocation`] to a [`CommandRunner`]. `refarch-infra` provides the tokio
//! implementation, tests provide recording fakes.

use refarch_types::error::CommandError;
use refarch_types::process::SubprocessResult;
use refarch_types::walk::Invocation;

/// Runs one external command to completion.
///
/// Implementations return `Err(CommandError::Failed { .. })` when the
/// command exits non-zero, so a successful return always means the command
/// succeeded.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        invocation: &Invocation,
    ) -> impl std::future::Future<Output = Result<SubprocessResult, CommandError>> + Send;
}
