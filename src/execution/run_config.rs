//! Per-run configuration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::process::Process;
use super::supervisor;
use crate::capture::LineHandler;
use crate::Result;

/// Which output stream, if any, is attached to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorSource {
    /// Errors carry no output.
    #[default]
    #[serde(rename = "none")]
    None,
    /// Errors carry the captured stdout.
    #[serde(rename = "stdout")]
    FromStdout,
    /// Errors carry the captured stderr.
    #[serde(rename = "stderr")]
    FromStderr,
}

impl FromStr for ErrorSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(ErrorSource::None),
            "stdout" => Ok(ErrorSource::FromStdout),
            "stderr" => Ok(ErrorSource::FromStderr),
            other => Err(format!("unknown error source: {}", other)),
        }
    }
}

/// How a process is supervised.
///
/// A `RunConfig` is never modified by a run, so one value can drive any
/// number of runs, concurrently or not.
#[derive(Clone, Default)]
pub struct RunConfig {
    /// Wall-clock limit. `Duration::ZERO` disables it.
    pub timeout: Duration,
    /// Stream whose content is attached to failures.
    pub errors: ErrorSource,
    /// Called once per stdout line.
    pub stdout_log: Option<LineHandler>,
    /// Called once per stderr line.
    pub stderr_log: Option<LineHandler>,
}

impl RunConfig {
    /// Create a config with no timeout, capture or line handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the stream attached to failures.
    pub fn errors(mut self, errors: ErrorSource) -> Self {
        self.errors = errors;
        self
    }

    /// Register a stdout line handler.
    ///
    /// Handlers run on the drain task and must not block for long.
    pub fn stdout_log<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.stdout_log = Some(Arc::new(handler));
        self
    }

    /// Register a stderr line handler.
    pub fn stderr_log<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.stderr_log = Some(Arc::new(handler));
        self
    }

    /// Run `process` to completion under this configuration.
    pub async fn run(&self, process: impl Into<Process>) -> Result<()> {
        supervisor::run(self, process.into()).await
    }

    /// Blocking variant of [`RunConfig::run`].
    ///
    /// Drives the run on a private current-thread runtime, so it must not be
    /// called from within an async context.
    pub fn run_blocking(&self, process: impl Into<Process>) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run(process))
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("timeout", &self.timeout)
            .field("errors", &self.errors)
            .field("stdout_log", &self.stdout_log.is_some())
            .field("stderr_log", &self.stderr_log.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunConfig::new();
        assert_eq!(config.timeout, Duration::ZERO);
        assert_eq!(config.errors, ErrorSource::None);
        assert!(config.stdout_log.is_none());
        assert!(config.stderr_log.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let config = RunConfig::new()
            .timeout(Duration::from_millis(250))
            .errors(ErrorSource::FromStderr)
            .stdout_log(|_| {})
            .stderr_log(|_| {});

        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.errors, ErrorSource::FromStderr);
        assert!(config.stdout_log.is_some());
        assert!(config.stderr_log.is_some());
    }

    #[test]
    fn test_error_source_from_str() {
        assert_eq!("stdout".parse::<ErrorSource>(), Ok(ErrorSource::FromStdout));
        assert_eq!("STDERR".parse::<ErrorSource>(), Ok(ErrorSource::FromStderr));
        assert_eq!("none".parse::<ErrorSource>(), Ok(ErrorSource::None));
        assert!("both".parse::<ErrorSource>().is_err());
    }

    #[test]
    fn test_error_source_serde() {
        let json = serde_json::to_string(&ErrorSource::FromStdout).unwrap();
        assert_eq!(json, "\"stdout\"");
        let parsed: ErrorSource = serde_json::from_str("\"stderr\"").unwrap();
        assert_eq!(parsed, ErrorSource::FromStderr);
    }

    #[test]
    fn test_debug_output() {
        let config = RunConfig::new().stdout_log(|_| {});
        let text = format!("{:?}", config);
        assert!(text.contains("stdout_log: true"));
        assert!(text.contains("stderr_log: false"));
    }
}
