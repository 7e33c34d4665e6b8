//! The three process-wide channels and the writer-swapping hook beneath them.
//!
//! A [`Stream`] forwards everything written to it into its installed
//! [`StreamBuf`]. Before each write it syncs its tie (another buffer that must
//! be up to date first), and it syncs its own buffer whenever a write carries a
//! newline or the caller flushes. Redirection is nothing more than installing
//! a different buffer and later restoring the previous one.

use std::io;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

/// The writer beneath a [`Stream`].
pub trait StreamBuf: Send {
    /// Accepts bytes; may hold them until the next [`StreamBuf::sync`].
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
    /// Pushes everything accepted so far to its destination.
    fn sync(&mut self) -> io::Result<()>;
}

pub type SharedBuf = Arc<Mutex<dyn StreamBuf>>;

/// Identifies one of the three channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Out,
    Log,
    Err,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Out, Channel::Log, Channel::Err];

    pub fn stream(self) -> &'static Stream {
        match self {
            Channel::Out => &OUT,
            Channel::Log => &LOG,
            Channel::Err => &ERR,
        }
    }

    /// The line label written after the timestamp.
    pub fn label(self) -> &'static str {
        match self {
            Channel::Out => " out | ",
            Channel::Log => " log | ",
            Channel::Err => "-ERR-| ",
        }
    }
}

/// The writer and tie a stream had installed at some point.
#[derive(Clone)]
pub struct Installed {
    pub buf: SharedBuf,
    pub tie: Option<SharedBuf>,
}

impl Installed {
    /// True when both refer to the very same buffers.
    pub fn same_as(&self, other: &Installed) -> bool {
        let tie = match (&self.tie, &other.tie) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        tie && Arc::ptr_eq(&self.buf, &other.buf)
    }
}

impl std::fmt::Debug for Installed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installed")
            .field("buf", &Arc::as_ptr(&self.buf).cast::<()>())
            .field("tie", &self.tie.as_ref().map(|tie| Arc::as_ptr(tie).cast::<()>()))
            .finish()
    }
}

struct Slot {
    installed: Installed,
    failed: bool,
}

/// One of the process-wide channels. See [`out`], [`log`] and [`err`].
///
/// Writing is done through `io::Write for &Stream`:
///
/// ```
/// use std::io::Write;
///
/// let _lock = chanlog::Lock::new();
/// writeln!(chanlog::err(), "disk {} is full", 2).ok();
/// ```
pub struct Stream {
    channel: Channel,
    slot: Mutex<Slot>,
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("channel", &self.channel)
            .field("failed", &self.is_failed())
            .finish()
    }
}

fn failed_error() -> io::Error {
    io::Error::other("chanlog stream is in a failed state")
}

impl Stream {
    fn new(channel: Channel, buf: SharedBuf, tie: Option<SharedBuf>) -> Stream {
        Stream {
            channel,
            slot: Mutex::new(Slot {
                installed: Installed { buf, tie },
                failed: false,
            }),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// The writer and tie currently installed.
    pub fn installed(&self) -> Installed {
        self.slot.lock().installed.clone()
    }

    /// Installs a new writer and tie, returning the previous pair.
    ///
    /// Clears the failed state.
    pub fn install(&self, buf: SharedBuf, tie: Option<SharedBuf>) -> Installed {
        let _serial = crate::mutex::serialize();
        let mut slot = self.slot.lock();
        slot.failed = false;
        std::mem::replace(&mut slot.installed, Installed { buf, tie })
    }

    /// Puts back a pair previously returned by [`Stream::install`].
    pub fn restore(&self, previous: Installed) {
        let _serial = crate::mutex::serialize();
        let mut slot = self.slot.lock();
        slot.failed = false;
        slot.installed = previous;
    }

    /// True once a write or flush has failed; writes are refused until
    /// [`Stream::clear_failure`].
    pub fn is_failed(&self) -> bool {
        self.slot.lock().failed
    }

    pub fn clear_failure(&self) {
        self.slot.lock().failed = false;
    }

    fn current(&self) -> io::Result<Installed> {
        let slot = self.slot.lock();
        if slot.failed {
            return Err(failed_error());
        }
        Ok(slot.installed.clone())
    }

    fn mark_failed<T>(&self, result: io::Result<T>) -> io::Result<T> {
        if result.is_err() {
            self.slot.lock().failed = true;
        }
        result
    }

    /// Writes `bytes`, syncing the tie first and the buffer afterwards when
    /// `bytes` contains a newline.
    pub fn write_bytes(&self, bytes: &[u8]) -> io::Result<()> {
        let _serial = crate::mutex::serialize();
        let Installed { buf, tie } = self.current()?;
        let result = (|| -> io::Result<()> {
            if let Some(tie) = tie {
                tie.lock().sync()?;
            }
            buf.lock().write(bytes)?;
            if bytes.contains(&b'\n') {
                buf.lock().sync()?;
            }
            Ok(())
        })();
        self.mark_failed(result)
    }

    /// Syncs the installed buffer. A failed stream is left untouched.
    pub fn flush(&self) -> io::Result<()> {
        let _serial = crate::mutex::serialize();
        let Installed { buf, .. } = self.current()?;
        let result = buf.lock().sync();
        self.mark_failed(result)
    }
}

impl io::Write for &Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_bytes(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Stream::flush(*self)
    }
}

struct StdoutBuf;

impl StreamBuf for StdoutBuf {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut io::stdout().lock(), bytes)
    }

    fn sync(&mut self) -> io::Result<()> {
        io::Write::flush(&mut io::stdout().lock())
    }
}

struct StderrBuf;

impl StreamBuf for StderrBuf {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut io::stderr().lock(), bytes)
    }

    fn sync(&mut self) -> io::Result<()> {
        io::Write::flush(&mut io::stderr().lock())
    }
}

// Syncs whatever `out` currently has installed.
struct OutTie;

impl StreamBuf for OutTie {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        OUT.write_bytes(bytes)
    }

    fn sync(&mut self) -> io::Result<()> {
        // A failure belongs to `out`, which records it.
        let _ = OUT.flush();
        Ok(())
    }
}

static OUT: LazyLock<Stream> =
    LazyLock::new(|| Stream::new(Channel::Out, Arc::new(Mutex::new(StdoutBuf)), None));
static LOG: LazyLock<Stream> =
    LazyLock::new(|| Stream::new(Channel::Log, Arc::new(Mutex::new(StderrBuf)), None));
// Tied to `out` so its pending text lands before an error.
static ERR: LazyLock<Stream> = LazyLock::new(|| {
    let tie: SharedBuf = Arc::new(Mutex::new(OutTie));
    Stream::new(Channel::Err, Arc::new(Mutex::new(StderrBuf)), Some(tie))
});

/// The primary output channel, process stdout by default.
pub fn out() -> &'static Stream {
    &OUT
}

/// The informational channel, process stderr by default.
pub fn log() -> &'static Stream {
    &LOG
}

/// The error channel, process stderr by default.
///
/// Before each write, whatever [`out()`] has pending is synced first.
pub fn err() -> &'static Stream {
    &ERR
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Recording {
        written: Vec<u8>,
        synced: Vec<u8>,
    }

    impl StreamBuf for Recording {
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.written.extend_from_slice(bytes);
            Ok(())
        }
        fn sync(&mut self) -> io::Result<()> {
            let written = std::mem::take(&mut self.written);
            self.synced.extend_from_slice(&written);
            Ok(())
        }
    }

    struct Broken;

    impl StreamBuf for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<()> {
            Ok(())
        }
        fn sync(&mut self) -> io::Result<()> {
            Err(io::Error::other("broken"))
        }
    }

    #[test]
    fn syncs_on_newline_and_tie_first() {
        let buf = Arc::new(Mutex::new(Recording::default()));
        let tie = Arc::new(Mutex::new(Recording::default()));
        let stream = Stream::new(Channel::Out, buf.clone(), Some(tie.clone()));
        tie.lock().written.extend_from_slice(b"tied");

        stream.write_bytes(b"par").unwrap();
        assert_eq!(tie.lock().synced, b"tied");
        assert_eq!(buf.lock().written, b"par");
        assert!(buf.lock().synced.is_empty());

        stream.write_bytes(b"tial\n").unwrap();
        assert_eq!(buf.lock().synced, b"partial\n");

        stream.write_bytes(b"rest").unwrap();
        stream.flush().unwrap();
        assert_eq!(buf.lock().synced, b"partial\nrest");
    }

    #[test]
    fn failure_sticks_until_cleared_or_reinstalled() {
        let stream = Stream::new(Channel::Err, Arc::new(Mutex::new(Broken)), None);
        assert!(stream.write_bytes(b"line\n").is_err());
        assert!(stream.is_failed());
        assert!(stream.write_bytes(b"x").is_err());

        stream.clear_failure();
        assert!(stream.write_bytes(b"x").is_ok());
        assert!(stream.flush().is_err());
        assert!(stream.is_failed());

        let previous = stream.install(Arc::new(Mutex::new(Recording::default())), None);
        assert!(!stream.is_failed());
        stream.restore(previous);
        assert!(!stream.is_failed());
    }

    #[test]
    fn install_returns_previous() {
        let first: SharedBuf = Arc::new(Mutex::new(Recording::default()));
        let second: SharedBuf = Arc::new(Mutex::new(Recording::default()));
        let stream = Stream::new(Channel::Log, first.clone(), None);
        let before = stream.installed();

        let previous = stream.install(second.clone(), Some(second.clone()));
        assert!(previous.same_as(&before));
        assert!(Arc::ptr_eq(&stream.installed().buf, &second));

        stream.restore(previous);
        assert!(stream.installed().same_as(&before));
    }
}
