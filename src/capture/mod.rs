//! Output stream capture.
//!
//! This module provides the pieces that consume a child's output:
//! - Incremental line splitting for per-line callbacks
//! - A tee that copies one stream to a sink, a capture buffer and a
//!   line splitter at the same time
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use deputy::capture::{LineHandler, LineSplitter};
//!
//! let handler: LineHandler = Arc::new(|line: &str| println!("> {}", line));
//! let mut splitter = LineSplitter::new(handler);
//! splitter.feed(b"first\nsec");
//! splitter.feed(b"ond\n");
//! splitter.finish();
//! ```

mod lines;
mod tee;

pub use lines::{LineHandler, LineSplitter};
pub use tee::{CaptureBuffer, Sink, Tee};
