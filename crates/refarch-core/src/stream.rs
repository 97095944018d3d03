//! Subprocess stream handling.
//!
//! [`StreamHandler`] turns a started process (its stdout/stderr readers and a
//! wait future) into a single verdict:
//!
//! 1. A reader task drains stdout line-by-line into the [`LineSink`].
//! 2. The calling task buffers stderr to EOF, then waits for exit.
//! 3. The reader task is joined before the result is built, so every line
//!    the process wrote is forwarded, in order, before the verdict.
//!
//! Only the exit status decides success. A stdout read error is logged and
//! ends the drain but never fails the command by itself.

use std::future::Future;
use std::sync::Arc;

use refarch_types::error::CommandError;
use refarch_types::process::{ExitOutcome, SubprocessResult};
use refarch_types::walk::Invocation;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::sink::LineSink;

/// Drives one process's output streams to completion.
#[derive(Clone)]
pub struct StreamHandler {
    sink: Arc<dyn LineSink>,
}

impl StreamHandler {
    pub fn new(sink: Arc<dyn LineSink>) -> Self {
        Self { sink }
    }

    /// Stream mode: forward stdout live, buffer stderr, then wait.
    pub async fn stream<O, E, W>(
        &self,
        invocation: &Invocation,
        stdout: O,
        mut stderr: E,
        wait: W,
    ) -> Result<SubprocessResult, CommandError>
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin,
        W: Future<Output = std::io::Result<ExitOutcome>>,
    {
        let reader = tokio::spawn(drain_lines(stdout, Arc::clone(&self.sink)));

        let mut stderr_buf = Vec::new();
        if let Err(err) = stderr.read_to_end(&mut stderr_buf).await {
            tracing::warn!("reading stderr from current command context: {err}");
        }

        let exit = wait.await.map_err(|e| CommandError::Io {
            program: invocation.program.clone(),
            reason: e.to_string(),
        })?;

        let stdout_lines = match reader.await {
            Ok(lines) => lines,
            Err(err) => {
                tracing::warn!("stdout reader for '{}' did not finish: {err}", invocation.program);
                Vec::new()
            }
        };

        self.verdict(
            invocation,
            SubprocessResult {
                exit,
                stdout_lines,
                stderr: stderr_buf,
            },
            None,
        )
    }

    /// Buffer mode: stdout and stderr were read through one pipe, so
    /// `output` holds both in the order the process wrote them.
    ///
    /// Nothing reaches the sink on success. On failure the whole output is
    /// the diagnostic.
    pub fn buffered(
        &self,
        invocation: &Invocation,
        exit: ExitOutcome,
        output: Vec<u8>,
    ) -> Result<SubprocessResult, CommandError> {
        let text = String::from_utf8_lossy(&output).into_owned();
        let stdout_lines = text.lines().map(str::to_string).collect();
        self.verdict(
            invocation,
            SubprocessResult {
                exit,
                stdout_lines,
                stderr: Vec::new(),
            },
            Some(text),
        )
    }

    fn verdict(
        &self,
        invocation: &Invocation,
        result: SubprocessResult,
        diagnostic: Option<String>,
    ) -> Result<SubprocessResult, CommandError> {
        if result.success() {
            return Ok(result);
        }
        let diagnostic = diagnostic.unwrap_or_else(|| result.stderr_text());
        tracing::debug!(
            command = %invocation.command_line(),
            dir = %invocation.working_dir.display(),
            "command failed with {}",
            result.exit
        );
        self.sink.diagnostic(&diagnostic);
        Err(CommandError::Failed {
            message: invocation.failure_message.clone(),
            exit_code: result.exit.code,
            diagnostic,
        })
    }
}

/// Read `reader` line by line until EOF or a read error, forwarding each
/// line to `sink`. Trailing `\n` / `\r\n` are stripped; invalid UTF-8 is
/// replaced rather than treated as an error.
pub async fn drain_lines<R>(reader: R, sink: Arc<dyn LineSink>) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                sink.line(&line);
                lines.push(line);
            }
            Err(err) => {
                tracing::warn!("reading stdout from current command context: {err}");
                break;
            }
        }
    }
    lines
}
