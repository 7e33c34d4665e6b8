//! The debugger-attached output sink.
//!
//! Every redirected channel writes here. It defaults to the process stderr,
//! the closest thing to a debugger console on platforms without a dedicated
//! one; [`set_debug_sink`] swaps in any other writer.
//!
//! ```
//! use chanlog::debug_sink::{set_debug_sink, CaptureSink};
//!
//! let capture = CaptureSink::new();
//! let previous = set_debug_sink(Box::new(capture.clone()));
//! // ... redirected output now lands in `capture` ...
//! set_debug_sink(previous);
//! ```

use std::io::{self, Write};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

type Sink = Box<dyn Write + Send>;

static DEBUG_SINK: LazyLock<Mutex<Sink>> = LazyLock::new(|| {
    let stderr: Sink = Box::new(io::stderr());
    Mutex::new(stderr)
});

/// Installs `sink` as the debug sink and returns the previous one.
pub fn set_debug_sink(sink: Box<dyn Write + Send>) -> Box<dyn Write + Send> {
    std::mem::replace(&mut *DEBUG_SINK.lock(), sink)
}

pub(crate) fn write_str(text: &str) -> io::Result<()> {
    let mut sink = DEBUG_SINK.lock();
    sink.write_all(text.as_bytes())?;
    sink.flush()
}

/// An in-memory sink; clones share the same buffer.
#[derive(Clone, Default)]
pub struct CaptureSink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CaptureSink {
    pub fn new() -> CaptureSink {
        CaptureSink::default()
    }

    /// Everything captured so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Returns and clears everything captured so far.
    pub fn drain(&self) -> String {
        let bytes = std::mem::take(&mut *self.buffer.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSink")
            .field("len", &self.buffer.lock().len())
            .finish()
    }
}
