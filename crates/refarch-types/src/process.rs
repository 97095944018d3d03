//! Subprocess outcome types.

/// Exit status of a finished process, independent of the platform's
/// `ExitStatus` so core logic can be driven from tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub success: bool,
    /// Exit code, or `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub fn from_code(code: i32) -> Self {
        Self {
            success: code == 0,
            code: Some(code),
        }
    }
}

impl std::fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Outcome of one external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubprocessResult {
    pub exit: ExitOutcome,
    /// Stdout lines in the order the process wrote them. In buffer mode
    /// these are the combined stdout and stderr lines.
    pub stdout_lines: Vec<String>,
    /// Stderr, buffered in full. Empty in buffer mode.
    pub stderr: Vec<u8>,
}

impl SubprocessResult {
    pub fn success(&self) -> bool {
        self.exit.success
    }

    /// Stderr decoded lossily for diagnostics.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}
