//! Error types for deputy.

use std::time::Duration;

use thiserror::Error;

/// Main error type returned by a supervised run.
#[derive(Error, Debug)]
pub enum DeputyError {
    /// The process outlived its deadline and was killed.
    #[error("process timed out after {timeout:?}{}", output_suffix(.output))]
    Timeout {
        timeout: Duration,
        output: Option<String>,
    },

    /// The process ran to completion and reported failure.
    #[error("{}{}", describe_exit(.code), output_suffix(.output))]
    ExitFailure {
        code: Option<i32>,
        output: Option<String>,
    },

    /// The process could not be started at all.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A piped stream was not available after spawn.
    #[error("{0} pipe unavailable")]
    MissingPipe(&'static str),

    /// Waiting on or killing the child failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A drain task ended abnormally, usually a panicking line handler.
    #[error("{stream} drain task failed: {message}")]
    Drain {
        stream: &'static str,
        message: String,
    },
}

impl DeputyError {
    /// Whether the process was killed for exceeding its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DeputyError::Timeout { .. })
    }

    /// Exit code of a failed process, if it exited on its own with one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            DeputyError::ExitFailure { code, .. } => *code,
            _ => None,
        }
    }

    /// Output captured for the error, if capture was configured.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            DeputyError::Timeout { output, .. } | DeputyError::ExitFailure { output, .. } => {
                output.as_deref()
            }
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "process terminated by signal".to_string(),
    }
}

fn output_suffix(output: &Option<String>) -> String {
    match output.as_deref() {
        Some(text) if !text.is_empty() => format!(": {}", text),
        _ => String::new(),
    }
}

/// Convenience Result type for deputy operations.
pub type Result<T> = std::result::Result<T, DeputyError>;
