//! Directory walk and job types.
//!
//! A walk visits [`DirectoryEntry`] nodes; entries whose base name matches the
//! configured marker become [`MarkerFile`]s, and each marker yields exactly one
//! [`Job`] made of ordered [`Invocation`]s run in the marker's directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Entries and markers
// ---------------------------------------------------------------------------

/// A filesystem node visited during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    pub base_name: String,
}

impl DirectoryEntry {
    /// Build an entry from a path, deriving the base name from its last component.
    pub fn new(path: impl Into<PathBuf>, is_dir: bool) -> Self {
        let path = path.into();
        let base_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            is_dir,
            base_name,
        }
    }

    /// Returns the entry as a marker file when it is a non-directory whose
    /// base name is exactly `marker_name`.
    pub fn as_marker(&self, marker_name: &str) -> Option<MarkerFile> {
        if self.is_dir || self.base_name != marker_name {
            return None;
        }
        Some(MarkerFile {
            path: self.path.clone(),
        })
    }
}

/// A file whose presence designates its containing directory as a job target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerFile {
    pub path: PathBuf,
}

impl MarkerFile {
    /// The directory holding the marker; jobs run with this as working directory.
    pub fn containing_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// The marker's base name, as passed to `-f`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Invocations and jobs
// ---------------------------------------------------------------------------

/// How a command's output is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Stdout is forwarded line-by-line as it arrives; stderr is buffered
    /// for diagnostics.
    Stream,
    /// Stdout and stderr share one pipe and are buffered together, in write
    /// order; on failure the combined output is the diagnostic.
    Buffer,
}

/// One external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub capture: CaptureMode,
    /// High-level message reported when the command exits non-zero.
    pub failure_message: String,
}

impl Invocation {
    /// Render the command line for logs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// A unit of work bound to one marker file.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub marker: MarkerFile,
    pub invocations: Vec<Invocation>,
}

// ---------------------------------------------------------------------------
// Walk lifecycle and reports
// ---------------------------------------------------------------------------

/// Lifecycle of a batch walk.
///
/// `Idle -> Walking -> (Invoking -> Walking)* -> Done | Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkState {
    Idle,
    Walking,
    Invoking,
    Done,
    Aborted,
}

impl WalkState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WalkState::Done | WalkState::Aborted)
    }
}

impl std::fmt::Display for WalkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WalkState::Idle => "idle",
            WalkState::Walking => "walking",
            WalkState::Invoking => "invoking",
            WalkState::Done => "done",
            WalkState::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

/// Record of one successfully completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub marker: PathBuf,
    pub working_dir: PathBuf,
    /// Command lines in the order they ran.
    pub commands: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Summary of a walk that reached `Done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkReport {
    pub root: PathBuf,
    pub jobs: Vec<JobReport>,
}
