//! Swapping a channel's writer for one that prefixes and forwards its text.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::flusher::Flusher;
use crate::prefix::Prefixer;
use crate::stream::{Channel, Installed, SharedBuf, Stream, StreamBuf};
use crate::target::Target;
use crate::timestamp::StampFormat;
use crate::Error;

struct Captured {
    stream: &'static Stream,
    previous: Installed,
}

/// Redirects one or more channels into a [`Target`] for as long as it lives.
///
/// Creating it installs its buffer as the writer and tie of every given
/// channel, remembering what was there. Dropping it emits anything still
/// pending and puts every channel back the way it found it. Moving it moves
/// that responsibility; it can't be cloned.
///
/// ```
/// use chanlog::debug_sink::{set_debug_sink, CaptureSink};
/// use chanlog::redirect::Redirect;
/// use chanlog::target::Target;
/// use chanlog::Channel;
/// use std::io::Write;
///
/// chanlog::set_timestamp(false);
/// let capture = CaptureSink::new();
/// let previous = set_debug_sink(Box::new(capture.clone()));
/// {
///     let _redirect = Redirect::new(&[Channel::Out], "[out] ", Target::Debug);
///     let _lock = chanlog::Lock::new();
///     writeln!(chanlog::out(), "hello").unwrap();
/// }
/// set_debug_sink(previous);
/// assert_eq!(capture.contents(), "[out] hello\n");
/// ```
pub struct Redirect {
    buf: Arc<Mutex<RedirectBuf>>,
    captured: Vec<Captured>,
}

impl Redirect {
    pub fn new(channels: &[Channel], label: impl Into<String>, target: Target) -> Redirect {
        let buf = Arc::new(Mutex::new(RedirectBuf {
            target,
            prefixer: Prefixer::new(label),
            flusher: Flusher::new(channels),
            pending: Vec::new(),
        }));
        let shared: SharedBuf = buf.clone();
        let captured = channels
            .iter()
            .map(|channel| {
                let stream = channel.stream();
                let previous = stream.install(shared.clone(), Some(shared.clone()));
                Captured { stream, previous }
            })
            .collect();
        Redirect { buf, captured }
    }

    /// Redirects a single channel using its standard label.
    pub fn channel(channel: Channel, target: Target) -> Redirect {
        Redirect::new(&[channel], channel.label(), target)
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.captured.iter().map(|captured| captured.stream.channel())
    }

    /// True when `installed` is this redirect's buffer.
    pub fn is_installed(&self, installed: &Installed) -> bool {
        let shared: SharedBuf = self.buf.clone();
        Arc::ptr_eq(&installed.buf, &shared)
    }
}

impl Drop for Redirect {
    fn drop(&mut self) {
        {
            let _serial = crate::mutex::serialize();
            if let Err(err) = self.buf.lock().emit(Emit::Teardown) {
                crate::error::report(&err);
            }
        }
        for captured in self.captured.drain(..).rev() {
            captured.stream.restore(captured.previous);
        }
    }
}

impl std::fmt::Debug for Redirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redirect")
            .field("channels", &self.channels().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Emit {
    Sync,
    // No lock check; an incomplete UTF-8 tail is emitted lossily.
    Teardown,
}

struct RedirectBuf {
    target: Target,
    prefixer: Prefixer,
    flusher: Flusher,
    pending: Vec<u8>,
}

impl RedirectBuf {
    fn emit(&mut self, mode: Emit) -> Result<(), Error> {
        let keep = match mode {
            Emit::Sync => incomplete_utf8_tail(&self.pending),
            Emit::Teardown => 0,
        };
        if self.pending.len() == keep {
            return Ok(());
        }
        if mode == Emit::Sync {
            crate::mutex::check_discipline();
        }
        self.flusher.flush_last_if_needed();

        let tail = self.pending.split_off(self.pending.len() - keep);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = tail;

        let prefixed = self.prefixer.add_prefix(&text, &StampFormat::current());
        self.target.emit(&prefixed)
    }
}

impl StreamBuf for RedirectBuf {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.flusher.flush_last_if_needed();
        self.pending.extend_from_slice(bytes);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.emit(Emit::Sync).map_err(|err| {
            crate::error::report(&err);
            io::Error::from(err)
        })
    }
}

/// Length of a truncated multi-byte character at the end of `bytes`.
///
/// Only the last three bytes matter; invalid bytes earlier on are left to the
/// lossy decode.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let width = match byte {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return 0,
        };
        return if back < width { back } else { 0 };
    }
    0
}
