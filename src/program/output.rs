//! Output sink shared between a driver and the process-exit hooks.
//!
//! Writes either go straight to the underlying writer or accumulate until
//! the next [`Output::flush`]. Once a sink is marked exiting, buffering is
//! bypassed so terminal restoration cannot be lost in a pending buffer.
//! Write failures are absorbed and logged; the sink keeps accepting bytes
//! so a writer that recovers resumes normal output.

use std::io::{self, Write};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::warn;

// =============================================================================
// Sink
// =============================================================================

pub(crate) struct Sink {
    buf: Vec<u8>,
    writer: Box<dyn Write + Send>,
    buffered: bool,
    exiting: bool,
    failing: bool,
    /// Bytes that put the terminal back the way we found it.
    restore: Vec<u8>,
}

impl Sink {
    fn write_through(&mut self, bytes: &[u8]) {
        let result = self.writer.write_all(bytes).and_then(|_| self.writer.flush());
        match result {
            Ok(()) => self.failing = false,
            Err(e) => {
                if !self.failing {
                    warn!(error = %e, dropped = bytes.len(), "terminal write failed");
                }
                self.failing = true;
            }
        }
    }

    pub(crate) fn flush(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let data = std::mem::take(&mut self.buf);
        self.write_through(&data);
    }

    /// Flush, then write the restore sequence unbuffered.
    pub(crate) fn restore(&mut self) {
        self.exiting = true;
        self.flush();
        if !self.restore.is_empty() {
            let seq = self.restore.clone();
            self.write_through(&seq);
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// Cloneable handle to a driver's output sink.
#[derive(Clone)]
pub struct Output {
    inner: Arc<Mutex<Sink>>,
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sink = self.inner.lock();
        f.debug_struct("Output")
            .field("pending", &sink.buf.len())
            .field("buffered", &sink.buffered)
            .field("exiting", &sink.exiting)
            .finish()
    }
}

impl Output {
    pub fn new(writer: impl Write + Send + 'static, buffered: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Sink {
                buf: Vec::with_capacity(if buffered { 16 * 1024 } else { 0 }),
                writer: Box::new(writer),
                buffered,
                exiting: false,
                failing: false,
                restore: Vec::new(),
            })),
        }
    }

    /// Queue or write `bytes`.
    ///
    /// Returns true when this write started a new buffered batch, i.e. the
    /// caller should schedule a flush.
    pub fn write(&self, bytes: &[u8]) -> bool {
        if bytes.is_empty() {
            return false;
        }
        let mut sink = self.inner.lock();
        if sink.buffered && !sink.exiting {
            let was_empty = sink.buf.is_empty();
            sink.buf.extend_from_slice(bytes);
            return was_empty;
        }
        sink.write_through(bytes);
        false
    }

    pub fn flush(&self) {
        self.inner.lock().flush();
    }

    /// Bytes waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.inner.lock().buf.len()
    }

    /// From now on every write bypasses the buffer.
    pub fn set_exiting(&self) {
        let mut sink = self.inner.lock();
        sink.exiting = true;
        sink.flush();
    }

    pub fn is_exiting(&self) -> bool {
        self.inner.lock().exiting
    }

    /// Replace the sequence written when the process exits abnormally.
    pub fn set_restore(&self, seq: Vec<u8>) {
        self.inner.lock().restore = seq;
    }

    /// Flush and write the restore sequence.
    pub fn restore(&self) {
        self.inner.lock().restore();
    }

    pub(crate) fn downgrade(&self) -> Weak<Mutex<Sink>> {
        Arc::downgrade(&self.inner)
    }
}

// =============================================================================
// Capture
// =============================================================================

/// In-memory writer whose contents stay readable after being handed to an
/// [`Output`].
#[derive(Debug, Clone, Default)]
pub struct Capture {
    data: Arc<Mutex<Vec<u8>>>,
    fail: Arc<Mutex<bool>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything written so far.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.data.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.data.lock()).into_owned()
    }

    /// Make subsequent writes fail, as a closed pipe would.
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if *self.fail.lock() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "capture closed"));
        }
        self.data.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbuffered_writes_go_straight_through() {
        let cap = Capture::new();
        let out = Output::new(cap.clone(), false);
        assert!(!out.write(b"abc"));
        assert_eq!(cap.take(), "abc");
    }

    #[test]
    fn buffered_writes_wait_for_flush() {
        let cap = Capture::new();
        let out = Output::new(cap.clone(), true);
        assert!(out.write(b"a"));
        assert!(!out.write(b"b"));
        assert_eq!(cap.contents(), "");
        assert_eq!(out.pending(), 2);
        out.flush();
        assert_eq!(cap.take(), "ab");
    }

    #[test]
    fn exiting_bypasses_buffer() {
        let cap = Capture::new();
        let out = Output::new(cap.clone(), true);
        out.write(b"queued");
        out.set_exiting();
        assert_eq!(cap.take(), "queued");
        out.write(b"now");
        assert_eq!(cap.take(), "now");
    }

    #[test]
    fn write_failures_are_absorbed_and_recover() {
        let cap = Capture::new();
        let out = Output::new(cap.clone(), false);
        cap.set_failing(true);
        out.write(b"lost");
        cap.set_failing(false);
        out.write(b"kept");
        assert_eq!(cap.take(), "kept");
    }

    #[test]
    fn restore_flushes_then_writes_restore_sequence() {
        let cap = Capture::new();
        let out = Output::new(cap.clone(), true);
        out.set_restore(b"\x1b[?25h".to_vec());
        out.write(b"frame");
        out.restore();
        assert_eq!(cap.take(), "frame\x1b[?25h");
        assert!(out.is_exiting());
    }
}
