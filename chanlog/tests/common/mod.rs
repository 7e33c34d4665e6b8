#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use chanlog::debug_sink::{set_debug_sink, CaptureSink};
use parking_lot::{Mutex, MutexGuard};

// The channels are process-wide; tests in one binary take turns.
static SERIAL: Mutex<()> = parking_lot::const_mutex(());

/// Exclusive access to the channels with the debug sink captured.
///
/// Settings are reset to plain, timestamp-free output; restored on drop.
pub struct Harness {
    pub debug: CaptureSink,
    previous: Option<Box<dyn Write + Send>>,
    _serial: MutexGuard<'static, ()>,
}

impl Harness {
    pub fn new() -> Harness {
        let serial = SERIAL.lock();
        chanlog::set_timestamp(false);
        chanlog::set_timestamp_date(false);
        chanlog::set_timestamp_fraction_digits(4);
        chanlog::set_assert_lock(true);
        let debug = CaptureSink::new();
        let previous = set_debug_sink(Box::new(debug.clone()));
        Harness {
            debug,
            previous: Some(previous),
            _serial: serial,
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            set_debug_sink(previous);
        }
        chanlog::set_timestamp(true);
        chanlog::set_assert_lock(true);
    }
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// Lines of `text` between the start and shutdown notices.
pub fn body_lines(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| !line.ends_with("chanlog: logger started"))
        .filter(|line| !line.ends_with("chanlog: logger shutting down"))
        .collect()
}
