//! Where a redirected channel's text ends up.

use std::fs::File;
use std::io::{LineWriter, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Error;

/// A log file shared by every target writing to it.
///
/// Complete lines reach the file as soon as they are emitted; a trailing
/// fragment waits for its newline or for the last clone to drop.
#[derive(Clone)]
pub struct LogFile {
    file: Arc<Mutex<LineWriter<File>>>,
}

impl LogFile {
    pub fn new(file: File) -> LogFile {
        LogFile {
            file: Arc::new(Mutex::new(LineWriter::new(file))),
        }
    }

    fn write_str(&self, text: &str) -> Result<(), Error> {
        self.file.lock().write_all(text.as_bytes()).map_err(Error::File)
    }

    /// Pushes any buffered fragment to the file.
    pub fn flush(&self) -> Result<(), Error> {
        self.file.lock().flush().map_err(Error::File)
    }
}

impl std::fmt::Debug for LogFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFile").finish_non_exhaustive()
    }
}

/// The destination of already-prefixed text.
#[derive(Debug, Clone)]
pub enum Target {
    /// Only the [debug sink](crate::debug_sink).
    Debug,
    /// Only the log file.
    File(LogFile),
    /// The debug sink, then the file.
    DebugAndFile(LogFile),
}

impl Target {
    /// Writes `text` to every destination; the first failure is returned
    /// after all destinations have been attempted.
    pub fn emit(&mut self, text: &str) -> Result<(), Error> {
        match self {
            Target::Debug => emit_debug(text),
            Target::File(file) => file.write_str(text),
            Target::DebugAndFile(file) => {
                let debug = emit_debug(text);
                let file = file.write_str(text);
                debug.and(file)
            }
        }
    }
}

fn emit_debug(text: &str) -> Result<(), Error> {
    crate::debug_sink::write_str(text).map_err(Error::DebugSink)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io;

    struct Unplugged;

    impl Write for Unplugged {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("debugger detached"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn composite_reaches_file_when_debug_sink_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composite.log");
        let file = LogFile::new(File::create(&path).unwrap());

        let previous = crate::debug_sink::set_debug_sink(Box::new(Unplugged));
        let result = Target::DebugAndFile(file.clone()).emit("still here\n");
        crate::debug_sink::set_debug_sink(previous);

        assert!(matches!(result, Err(Error::DebugSink(_))));
        file.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "still here\n");
    }
}
