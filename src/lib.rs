//! # deputy
//!
//! Supervised execution of child processes.
//!
//! This crate runs an already-configured process, drains its stdout and
//! stderr concurrently, optionally enforces a wall-clock timeout, and turns
//! failure into a single descriptive error. Output can be streamed line by
//! line to callbacks, copied to caller sinks, and captured for inclusion in
//! the error message, in any combination.
//!
//! ## Features
//!
//! - **Concurrent draining**: one task per stream, so a chatty stderr never
//!   blocks a process writing to stdout
//! - **Timeouts**: the process is killed once its deadline passes
//! - **Descriptive errors**: failures can carry the captured output
//! - **Async first**: built on tokio, with a blocking entry point
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use deputy::{ErrorSource, RunConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     deputy::logging::try_init().ok();
//!
//!     let mut cmd = tokio::process::Command::new("make");
//!     cmd.arg("test");
//!
//!     let result = RunConfig::new()
//!         .timeout(Duration::from_secs(30))
//!         .errors(ErrorSource::FromStderr)
//!         .stdout_log(|line| println!("{}", line))
//!         .run(cmd)
//!         .await;
//!
//!     match result {
//!         Ok(()) => println!("done"),
//!         Err(e) if e.is_timeout() => eprintln!("too slow: {}", e),
//!         Err(e) => eprintln!("failed: {}", e),
//!     }
//! }
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;

// Re-export commonly used types
pub use capture::{LineHandler, LineSplitter, Tee};
pub use error::{DeputyError, Result};
pub use execution::{ErrorSource, Process, RunConfig};
