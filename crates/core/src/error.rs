//! Error types for directory resolution, tool lookup and scanner execution.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Result type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Everything that can go wrong between receiving tool arguments and
/// collecting a scanner's output.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Missing or malformed input.
    #[error("{0}")]
    InvalidArgument(String),

    /// The target path could not be statted.
    #[error("target path {path:?} not accessible: {source}")]
    NotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target path exists but is not a directory.
    #[error("target path {0:?} is not a directory")]
    NotADirectory(PathBuf),

    /// No tool is registered under the requested name.
    #[error("tool {0:?} not registered")]
    UnknownTool(String),

    /// The scanner exceeded its deadline and was killed.
    #[error("{program} timed out after {}", human(.timeout))]
    Timeout {
        program: String,
        timeout: Duration,
        output: Vec<u8>,
    },

    /// The scanner exited with a non-zero status.
    #[error("{program} failed: {status}\n{}", String::from_utf8_lossy(.output))]
    ToolFailed {
        program: String,
        status: ExitStatus,
        output: Vec<u8>,
    },

    /// The executable could not be started (usually not on `PATH`).
    #[error("failed to launch {program}: {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading the scanner's pipes or waiting on it failed.
    #[error("i/o error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The parent cancellation token fired while the scanner was running.
    #[error("{program} cancelled")]
    Cancelled { program: String, output: Vec<u8> },
}

fn human(duration: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*duration)
}

impl ScanError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Output captured before the failure, if the process got far enough
    /// to produce any.
    pub fn output(&self) -> Option<&[u8]> {
        match self {
            Self::Timeout { output, .. }
            | Self::ToolFailed { output, .. }
            | Self::Cancelled { output, .. } => Some(output),
            _ => None,
        }
    }
}
