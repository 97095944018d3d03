use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while running a single external command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("i/o error while running '{program}': {reason}")]
    Io { program: String, reason: String },

    /// The command ran to completion but reported failure.
    ///
    /// `diagnostic` carries the buffered stderr (or combined output in
    /// buffered capture mode). It is reported through the line sink when the
    /// command fails, so it is not part of the message.
    #[error("{message}")]
    Failed {
        message: String,
        exit_code: Option<i32>,
        diagnostic: String,
    },
}

/// Errors that abort a batch walk.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("cannot read '{}': {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("job for '{}' failed", marker.display())]
    Job {
        marker: PathBuf,
        #[source]
        source: CommandError,
    },
}

/// Errors from parsing the `x-error-rate` request header.
///
/// The display strings are part of the test server's response contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorRateError {
    #[error("Error parsing error rate {raw}: {reason}")]
    Parse { raw: String, reason: String },

    #[error("Invalid error rate: {0}")]
    OutOfRange(i64),
}

impl WalkError {
    /// The marker whose job aborted the walk, if the walk failed on a job.
    pub fn marker(&self) -> Option<&PathBuf> {
        match self {
            WalkError::Job { marker, .. } => Some(marker),
            WalkError::Read { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_display_is_the_message_only() {
        let err = CommandError::Failed {
            message: "error running valet workflow".to_string(),
            exit_code: Some(1),
            diagnostic: "kubectl: not found".to_string(),
        };
        assert_eq!(err.to_string(), "error running valet workflow");
    }

    #[test]
    fn test_error_rate_error_display() {
        let err = ErrorRateError::Parse {
            raw: "abc".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error parsing error rate abc: invalid digit found in string"
        );
        assert_eq!(ErrorRateError::OutOfRange(150).to_string(), "Invalid error rate: 150");
    }

    #[test]
    fn test_walk_error_job_names_marker() {
        let err = WalkError::Job {
            marker: PathBuf::from("a/b/workflow.yaml"),
            source: CommandError::Spawn {
                program: "valet".to_string(),
                reason: "No such file or directory".to_string(),
            },
        };
        assert_eq!(err.to_string(), "job for 'a/b/workflow.yaml' failed");
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("valet"));
        assert_eq!(err.marker(), Some(&PathBuf::from("a/b/workflow.yaml")));
    }

    #[test]
    fn test_walk_error_read_has_no_marker() {
        let err = WalkError::Read {
            path: PathBuf::from("/root/locked"),
            reason: "permission denied".to_string(),
        };
        assert!(err.marker().is_none());
        assert_eq!(err.to_string(), "cannot read '/root/locked': permission denied");
    }
}
