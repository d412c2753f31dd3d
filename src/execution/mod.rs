//! Supervised process execution.
//!
//! This module provides the run-and-supervise entry points:
//! - Concurrent draining of stdout and stderr
//! - Optional wall-clock timeout with kill
//! - Failure errors carrying captured output
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use deputy::execution::{ErrorSource, RunConfig};
//!
//! # async fn example() -> deputy::Result<()> {
//! let mut cmd = tokio::process::Command::new("cargo");
//! cmd.arg("build");
//!
//! RunConfig::new()
//!     .timeout(Duration::from_secs(60))
//!     .errors(ErrorSource::FromStderr)
//!     .stdout_log(|line| println!("build: {}", line))
//!     .run(cmd)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod process;
mod run_config;
mod state;
mod supervisor;

pub use process::Process;
pub use run_config::{ErrorSource, RunConfig};
pub use supervisor::{run, DRAIN_GRACE};
