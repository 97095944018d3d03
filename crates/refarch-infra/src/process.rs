//! Tokio subprocess runner.
//!
//! Implements [`CommandRunner`] by spawning the invocation's program with
//! `tokio::process` in the invocation's working directory. Stdin is closed;
//! stdout and stderr are piped and handed to the core [`StreamHandler`]
//! (stream mode), or share a single pipe that is collected in write order
//! (buffer mode).
//!
//! There is no timeout: a hung command blocks the job.

use std::io::Read;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use refarch_core::runner::CommandRunner;
use refarch_core::sink::{LineSink, TracingSink};
use refarch_core::stream::StreamHandler;
use refarch_types::error::CommandError;
use refarch_types::process::{ExitOutcome, SubprocessResult};
use refarch_types::walk::{CaptureMode, Invocation};
use tokio::process::Command;

/// Runs invocations as real child processes.
#[derive(Clone)]
pub struct TokioCommandRunner {
    handler: StreamHandler,
}

impl TokioCommandRunner {
    pub fn new(sink: Arc<dyn LineSink>) -> Self {
        Self {
            handler: StreamHandler::new(sink),
        }
    }

    /// Runner whose output goes to `tracing`.
    pub fn with_tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    async fn run_streaming(&self, invocation: &Invocation) -> Result<SubprocessResult, CommandError> {
        let mut child = command(invocation)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(invocation, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| missing_pipe(invocation, "stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| missing_pipe(invocation, "stderr"))?;

        self.handler
            .stream(invocation, stdout, stderr, async {
                child.wait().await.map(exit_outcome)
            })
            .await
    }

    async fn run_buffered(&self, invocation: &Invocation) -> Result<SubprocessResult, CommandError> {
        let (mut reader, writer) = std::io::pipe().map_err(|e| io_error(invocation, e))?;
        let writer_err = writer.try_clone().map_err(|e| io_error(invocation, e))?;

        let mut cmd = command(invocation);
        cmd.stdout(writer).stderr(writer_err);
        let mut child = cmd.spawn().map_err(|e| spawn_error(invocation, e))?;
        // The command still holds both write ends; the reader only sees EOF
        // once they are closed.
        drop(cmd);

        let collect = tokio::task::spawn_blocking(move || {
            let mut output = Vec::new();
            reader.read_to_end(&mut output).map(|_| output)
        });

        let status = child.wait().await.map_err(|e| io_error(invocation, e))?;
        let output = collect
            .await
            .map_err(|e| io_error(invocation, e))?
            .map_err(|e| io_error(invocation, e))?;

        self.handler.buffered(invocation, exit_outcome(status), output)
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<SubprocessResult, CommandError> {
        match invocation.capture {
            CaptureMode::Stream => self.run_streaming(invocation).await,
            CaptureMode::Buffer => self.run_buffered(invocation).await,
        }
    }
}

fn command(invocation: &Invocation) -> Command {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null());
    cmd
}

fn exit_outcome(status: ExitStatus) -> ExitOutcome {
    ExitOutcome {
        success: status.success(),
        code: status.code(),
    }
}

fn spawn_error(invocation: &Invocation, err: std::io::Error) -> CommandError {
    CommandError::Spawn {
        program: invocation.program.clone(),
        reason: err.to_string(),
    }
}

fn io_error(invocation: &Invocation, err: impl std::fmt::Display) -> CommandError {
    CommandError::Io {
        program: invocation.program.clone(),
        reason: err.to_string(),
    }
}

fn missing_pipe(invocation: &Invocation, stream: &str) -> CommandError {
    CommandError::Io {
        program: invocation.program.clone(),
        reason: format!("{stream} was not captured"),
    }
}
