//! Fan-out of one process output stream.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use super::lines::{LineHandler, LineSplitter};

/// Caller-supplied destination for a raw output stream.
pub type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Default buffer size for reading process output.
const READ_BUFFER_SIZE: usize = 4096;

/// Bytes retained from one stream.
///
/// Clones share the same storage, so the supervisor can read what a drain
/// task captured even when that task never reaches end of stream.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // A panicking line handler never holds this lock.
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn extend(&self, chunk: &[u8]) {
        self.lock().extend_from_slice(chunk);
    }

    /// Number of bytes captured so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Move the captured bytes out, leaving the buffer empty.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.lock())
    }
}

/// Multiplexes one output stream to a sink, a capture buffer and a line
/// splitter, each of them optional.
pub struct Tee {
    stream: &'static str,
    sink: Option<Sink>,
    buffer: Option<CaptureBuffer>,
    lines: Option<LineSplitter>,
}

impl Tee {
    /// Create a tee for the named stream with no destinations.
    pub fn new(stream: &'static str) -> Self {
        Self {
            stream,
            sink: None,
            buffer: None,
            lines: None,
        }
    }

    /// Retain all bytes for later inclusion in an error.
    pub fn capture(mut self, enabled: bool) -> Self {
        self.buffer = enabled.then(CaptureBuffer::new);
        self
    }

    /// Deliver the stream line by line to `handler`.
    pub fn lines(mut self, handler: Option<LineHandler>) -> Self {
        self.lines = handler.map(LineSplitter::new);
        self
    }

    /// Copy the raw stream to `sink`.
    pub fn sink(mut self, sink: Option<Sink>) -> Self {
        self.sink = sink;
        self
    }

    /// Shared handle to the capture buffer, when capture is enabled.
    pub fn captured(&self) -> Option<CaptureBuffer> {
        self.buffer.clone()
    }

    /// Whether any destination is attached.
    pub fn is_empty(&self) -> bool {
        self.sink.is_none() && self.buffer.is_none() && self.lines.is_none()
    }

    /// Hand one chunk to every destination.
    ///
    /// A failing sink is detached; the buffer and splitter keep receiving.
    pub async fn write(&mut self, chunk: &[u8]) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.write_all(chunk).await {
                warn!(stream = self.stream, error = %e, "output sink failed, detaching");
                self.sink = None;
            }
        }
        if let Some(buffer) = self.buffer.as_ref() {
            buffer.extend(chunk);
        }
        if let Some(lines) = self.lines.as_mut() {
            lines.feed(chunk);
        }
    }

    /// Read `reader` to the end, then flush every destination.
    ///
    /// Returns the captured bytes, or `None` when capture is disabled.
    pub async fn drain<R>(mut self, mut reader: R) -> Option<Vec<u8>>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    debug!(stream = self.stream, "drain: EOF");
                    break;
                }
                Ok(n) => {
                    trace!(stream = self.stream, "drain: read {} bytes", n);
                    self.write(&buf[..n]).await;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(stream = self.stream, error = %e, "drain: read failed");
                    break;
                }
            }
        }

        self.finish().await
    }

    async fn finish(mut self) -> Option<Vec<u8>> {
        if let Some(lines) = self.lines.as_mut() {
            lines.finish();
        }
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.flush().await {
                warn!(stream = self.stream, error = %e, "output sink flush failed");
            }
            if let Err(e) = sink.shutdown().await {
                debug!(stream = self.stream, error = %e, "output sink shutdown failed");
            }
        }
        self.buffer.map(|buffer| buffer.take())
    }
}

impl fmt::Debug for Tee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tee")
            .field("stream", &self.stream)
            .field("sink", &self.sink.is_some())
            .field("captured", &self.buffer.as_ref().map(CaptureBuffer::len))
            .field("lines", &self.lines.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    fn collector() -> (LineHandler, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let handler: LineHandler = Arc::new(move |line: &str| {
            sink.lock().unwrap().push(line.to_string());
        });
        (handler, lines)
    }

    /// Sink that rejects every write.
    struct BrokenSink;

    impl AsyncWrite for BrokenSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_capture_only() {
        let reader = tokio_test::io::Builder::new()
            .read(b"foo")
            .read(b"oo\n")
            .build();
        let captured = Tee::new("stdout").capture(true).drain(reader).await;
        assert_eq!(captured.as_deref(), Some(&b"foooo\n"[..]));
    }

    #[tokio::test]
    async fn test_no_capture_returns_none() {
        let (handler, lines) = collector();
        let reader = tokio_test::io::Builder::new().read(b"x\n").build();
        let captured = Tee::new("stdout")
            .lines(Some(handler))
            .drain(reader)
            .await;
        assert!(captured.is_none());
        assert_eq!(*lines.lock().unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_all_destinations_see_full_stream() {
        let (handler, lines) = collector();
        let (sink, mut sink_reader) = tokio::io::duplex(1024);
        let reader = tokio_test::io::Builder::new()
            .read(b"bar!\nba")
            .read(b"r2!\n")
            .build();

        let captured = Tee::new("stderr")
            .capture(true)
            .lines(Some(handler))
            .sink(Some(Box::new(sink)))
            .drain(reader)
            .await;

        let mut copied = Vec::new();
        sink_reader.read_to_end(&mut copied).await.unwrap();

        assert_eq!(captured.as_deref(), Some(&b"bar!\nbar2!\n"[..]));
        assert_eq!(copied, b"bar!\nbar2!\n");
        assert_eq!(*lines.lock().unwrap(), vec!["bar!", "bar2!"]);
    }

    #[tokio::test]
    async fn test_broken_sink_does_not_stop_capture() {
        let (handler, lines) = collector();
        let reader = tokio_test::io::Builder::new()
            .read(b"one\n")
            .read(b"two")
            .build();

        let captured = Tee::new("stdout")
            .capture(true)
            .lines(Some(handler))
            .sink(Some(Box::new(BrokenSink)))
            .drain(reader)
            .await;

        assert_eq!(captured.as_deref(), Some(&b"one\ntwo"[..]));
        assert_eq!(*lines.lock().unwrap(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_read_error_ends_drain() {
        let reader = tokio_test::io::Builder::new()
            .read(b"before")
            .read_error(io::Error::new(io::ErrorKind::Other, "boom"))
            .build();
        let captured = Tee::new("stdout").capture(true).drain(reader).await;
        assert_eq!(captured.as_deref(), Some(&b"before"[..]));
    }

    #[tokio::test]
    async fn test_capture_visible_before_eof() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let tee = Tee::new("stdout").capture(true);
        let buffer = tee.captured().unwrap();
        let task = tokio::spawn(tee.drain(reader));

        writer.write_all(b"partial").await.unwrap();
        for _ in 0..100 {
            if buffer.len() == 7 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(buffer.len(), 7);

        // Stream still open: abandon the drain and keep what was captured.
        task.abort();
        let _ = task.await;
        assert_eq!(buffer.take(), b"partial");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_captured_handle_only_when_enabled() {
        assert!(Tee::new("stdout").captured().is_none());
        assert!(Tee::new("stdout").capture(true).captured().is_some());
    }

    #[test]
    fn test_is_empty() {
        assert!(Tee::new("stdout").is_empty());
        assert!(!Tee::new("stdout").capture(true).is_empty());
        assert!(Tee::new("stdout").capture(false).lines(None).is_empty());
    }
}
