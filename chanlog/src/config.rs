//! Process-wide settings.
//!
//! Every setter takes effect immediately: the default path is read when the
//! next [`Logger`](crate::Logger) instance is created, the timestamp settings
//! on the next emitted line, the lock assertion on the next emit.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::timestamp::MAX_FRACTION_DIGITS;

/// Log file used when neither an explicit nor a default path is set.
pub const FALLBACK_LOG_PATH: &str = "chanlog.log";

/// Environment variable read by [`Settings::from_env`].
pub const CONFIG_ENV_VAR: &str = "CHANLOG_CONFIG";

static DEFAULT_LOG_PATH: Mutex<Option<PathBuf>> = parking_lot::const_mutex(None);
static ASSERT_LOCK: AtomicBool = AtomicBool::new(true);
static TIMESTAMP: AtomicBool = AtomicBool::new(true);
static TIMESTAMP_DATE: AtomicBool = AtomicBool::new(false);
static FRACTION_DIGITS: AtomicU8 = AtomicU8::new(4);

pub fn set_default_log_path(path: impl Into<PathBuf>) {
    *DEFAULT_LOG_PATH.lock() = Some(path.into());
}

/// The path used by [`Logger::start`](crate::Logger::start).
///
/// An empty default path falls back to [`FALLBACK_LOG_PATH`].
pub fn default_log_path() -> PathBuf {
    match &*DEFAULT_LOG_PATH.lock() {
        Some(path) if !path.as_os_str().is_empty() => path.clone(),
        _ => PathBuf::from(FALLBACK_LOG_PATH),
    }
}

/// Enables or disables the check that writes happen under a [`Lock`](crate::Lock).
pub fn set_assert_lock(enabled: bool) {
    ASSERT_LOCK.store(enabled, Ordering::Relaxed);
}

pub fn assert_lock() -> bool {
    ASSERT_LOCK.load(Ordering::Relaxed)
}

pub fn set_timestamp(enabled: bool) {
    TIMESTAMP.store(enabled, Ordering::Relaxed);
}

pub fn timestamp() -> bool {
    TIMESTAMP.load(Ordering::Relaxed)
}

/// Prefix timestamps with `YYYY-MM-DD` as well as the time of day.
pub fn set_timestamp_date(enabled: bool) {
    TIMESTAMP_DATE.store(enabled, Ordering::Relaxed);
}

pub fn timestamp_date() -> bool {
    TIMESTAMP_DATE.load(Ordering::Relaxed)
}

/// Number of fractional-second digits in the timestamp, `0..=6`.
///
/// Values above 6 are a programming error; release builds clamp them.
pub fn set_timestamp_fraction_digits(digits: u8) {
    debug_assert!(
        digits <= MAX_FRACTION_DIGITS,
        "timestamp fraction digits must be in 0..=6, got {digits}"
    );
    FRACTION_DIGITS.store(digits.min(MAX_FRACTION_DIGITS), Ordering::Relaxed);
}

pub fn timestamp_fraction_digits() -> u8 {
    FRACTION_DIGITS.load(Ordering::Relaxed)
}

/// A batch of settings, usually parsed from [`CONFIG_ENV_VAR`].
///
/// # String Format
///
/// A comma separated list of `key=value` pairs, every key optional:
///
/// - `path`: default log path.
/// - `timestamp`: `on` or `off`.
/// - `date`: `on` or `off`, include the date in timestamps.
/// - `fraction`: `0` through `6`, fractional-second digits.
/// - `assert`: `on` or `off`, the lock discipline check.
///
/// # Examples
///
/// ```
/// use chanlog::Settings;
///
/// let settings: Settings = "path=/tmp/app.log,fraction=3,assert=off".parse().unwrap();
/// assert_eq!(settings.fraction_digits, Some(3));
/// assert_eq!(settings.assert_lock, Some(false));
/// assert_eq!(settings.timestamp, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub default_log_path: Option<PathBuf>,
    pub timestamp: Option<bool>,
    pub timestamp_date: Option<bool>,
    pub fraction_digits: Option<u8>,
    pub assert_lock: Option<bool>,
}

impl Settings {
    /// Reads [`CONFIG_ENV_VAR`], using [`Settings::default()`] when it is
    /// unset or can't be parsed. Parse errors are reported on stderr unless
    /// `quiet` is set.
    #[track_caller]
    pub fn from_env(quiet: bool) -> Settings {
        let Ok(value) = std::env::var(CONFIG_ENV_VAR) else {
            return Settings::default();
        };
        match value.parse::<Settings>() {
            Ok(settings) => settings,
            Err(err) => {
                if !quiet {
                    crate::error::report_message(
                        format_args!("error parsing {CONFIG_ENV_VAR}=`{value}`: {err}"),
                        std::panic::Location::caller(),
                    );
                }
                Settings::default()
            }
        }
    }

    /// Installs every setting that is present.
    pub fn apply(&self) {
        if let Some(path) = &self.default_log_path {
            set_default_log_path(path.clone());
        }
        if let Some(enabled) = self.timestamp {
            set_timestamp(enabled);
        }
        if let Some(enabled) = self.timestamp_date {
            set_timestamp_date(enabled);
        }
        if let Some(digits) = self.fraction_digits {
            set_timestamp_fraction_digits(digits);
        }
        if let Some(enabled) = self.assert_lock {
            set_assert_lock(enabled);
        }
    }
}

fn parse_switch(value: &str) -> Result<bool, &'static str> {
    match value {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err("Expected `on` or `off`"),
    }
}

impl FromStr for Settings {
    type Err = &'static str;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut settings = Settings::default();
        for pair in input.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err("Expected `key=value`");
            };
            let value = value.trim();
            match key.trim() {
                "path" => {
                    if value.is_empty() {
                        return Err("path must not be empty");
                    }
                    settings.default_log_path = Some(PathBuf::from(value));
                }
                "timestamp" => settings.timestamp = Some(parse_switch(value)?),
                "date" => settings.timestamp_date = Some(parse_switch(value)?),
                "assert" => settings.assert_lock = Some(parse_switch(value)?),
                "fraction" => match value.parse::<u8>() {
                    Ok(digits) if digits <= MAX_FRACTION_DIGITS => {
                        settings.fraction_digits = Some(digits)
                    }
                    _ => return Err("fraction must be a number from 0 to 6"),
                },
                _ => return Err("Unknown setting"),
            }
        }
        Ok(settings)
    }
}
