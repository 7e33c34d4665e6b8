//! Redirect a process's `out`, `log` and `err` channels into a debug sink and
//! a timestamped log file.
//!
//! Code writes to [`out()`], [`log()`] and [`err()`] as it would to stdout and
//! stderr. While a [`Logger`] is alive every line written there is prefixed with
//! the time and the channel, `out` is copied to the [debug sink](debug_sink),
//! and `log` and `err` are copied to the debug sink and the log file:
//!
//! ```text
//! 09:56:52.2321 log | chanlog: logger started
//! 09:56:52.2325 log | Hello Log!
//! 09:56:52.2327-ERR-| This is an ERROR!
//! ```
//!
//! Writers are expected to hold a [`Lock`] so lines from different threads
//! don't interleave; in debug builds emitting without one panics unless
//! [`set_assert_lock(false)`](set_assert_lock) was called.
//!
//! ```no_run
//! let _logger = chanlog::Logger::with_path("example.log");
//! chanlog::logln!("Hello Log!");
//! chanlog::outln!("This doesn't go to the file");
//! chanlog::errln!("This is an ERROR!");
//! ```

extern crate self as chanlog;

mod config;
pub mod debug_sink;
mod error;
mod flusher;
mod logger;
mod mutex;
pub mod prefix;
pub mod redirect;
pub mod stream;
pub mod target;
mod timestamp;

pub use config::{
    assert_lock, default_log_path, set_assert_lock, set_default_log_path, set_timestamp,
    set_timestamp_date, set_timestamp_fraction_digits, timestamp, timestamp_date,
    timestamp_fraction_digits, Settings, CONFIG_ENV_VAR, FALLBACK_LOG_PATH,
};
pub use error::Error;
pub use logger::{decide_open_mode, Logger, OpenMode};
pub use mutex::{lock_count, Lock};
pub use stream::{err, log, out, Channel, Stream};
pub use timestamp::{ClockTime, StampFormat, MAX_FRACTION_DIGITS};

/// Logs the function's name (or the given text) on [`log()`] when it is
/// entered.
///
/// ```
/// #[chanlog::log_fn]
/// fn load_level() -> u32 {
///     3
/// }
///
/// #[chanlog::log_fn("saving game")]
/// fn save() {}
///
/// assert_eq!(load_level(), 3);
/// save();
/// ```
pub use chanlog_macros::log_fn;

#[doc(hidden)]
pub fn __log_fn_entry(text: &str) {
    use std::io::Write;
    let _lock = Lock::new();
    let _ = writeln!(log(), "{text}");
}

#[doc(hidden)]
#[macro_export]
macro_rules! __writeln_locked {
    ($stream: expr, $($arg:tt)*) => {{
        use ::std::io::Write as _;
        let _lock = $crate::Lock::new();
        let _ = ::std::writeln!($stream, $($arg)*);
    }};
}

/// `writeln!` to [`out()`] under a [`Lock`], ignoring failures.
#[macro_export]
macro_rules! outln {
    ($($arg:tt)*) => { $crate::__writeln_locked!($crate::out(), $($arg)*) };
}

/// `writeln!` to [`log()`] under a [`Lock`], ignoring failures.
#[macro_export]
macro_rules! logln {
    ($($arg:tt)*) => { $crate::__writeln_locked!($crate::log(), $($arg)*) };
}

/// `writeln!` to [`err()`] under a [`Lock`], ignoring failures.
#[macro_export]
macro_rules! errln {
    ($($arg:tt)*) => { $crate::__writeln_locked!($crate::err(), $($arg)*) };
}
