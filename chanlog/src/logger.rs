use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::Settings;
use crate::redirect::Redirect;
use crate::stream::Channel;
use crate::target::{LogFile, Target};
use crate::{Error, Lock};

/// How a log file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Truncate,
    Append,
}

// Paths opened during this run; never cleared.
static OPENED_LOG_PATHS: Mutex<BTreeSet<PathBuf>> = parking_lot::const_mutex(BTreeSet::new());

/// Records `path` as opened; the first time this run it is truncated,
/// afterwards appended to.
pub fn decide_open_mode(path: &Path) -> OpenMode {
    if OPENED_LOG_PATHS.lock().insert(path.to_path_buf()) {
        OpenMode::Truncate
    } else {
        OpenMode::Append
    }
}

fn open_log_file(path: &Path) -> Result<File, Error> {
    let mut options = OpenOptions::new();
    options.create(true);
    match decide_open_mode(path) {
        OpenMode::Truncate => options.write(true).truncate(true),
        OpenMode::Append => options.append(true),
    };
    options.open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })
}

struct Instance {
    // Installed out, log, err; torn down in reverse.
    redirects: Vec<Redirect>,
    file: Option<LogFile>,
}

impl Instance {
    fn new(path: &Path) -> Instance {
        let file = match open_log_file(path) {
            Ok(file) => Some(LogFile::new(file)),
            Err(err) => {
                crate::error::report(&err);
                None
            }
        };
        let logged = || match &file {
            Some(file) => Target::DebugAndFile(file.clone()),
            None => Target::Debug,
        };
        let redirects = vec![
            Redirect::channel(Channel::Out, Target::Debug),
            Redirect::channel(Channel::Log, logged()),
            Redirect::channel(Channel::Err, logged()),
        ];
        Instance { redirects, file }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        while let Some(redirect) = self.redirects.pop() {
            drop(redirect);
        }
        if let Some(file) = &self.file {
            if let Err(err) = file.flush() {
                crate::error::report(&err);
            }
        }
    }
}

// Start and stop notices never leave `log` failed: a broken debug sink must
// not keep user lines from the still working file.
fn notice(text: &str) {
    crate::log().clear_failure();
    if writeln!(crate::log(), "{text}").is_err() {
        crate::log().clear_failure();
    }
}

// Guards creation and teardown; always taken after the write lock.
static INSTANCE: Mutex<Option<Weak<Instance>>> = parking_lot::const_mutex(None);

/// Handle keeping the `out`, `log` and `err` channels redirected.
///
/// The first handle starts the redirection: `out` goes to the
/// [debug sink](crate::debug_sink), `log` and `err` to the debug sink and the
/// log file, every line prefixed with a timestamp and a channel label. Further
/// handles, including clones, share the running instance. When the last one is
/// dropped the channels go back to their previous writers. Starting and stopping
/// never fails; problems are reported on the process stderr.
///
/// # Examples
///
/// ```no_run
/// use std::io::Write;
///
/// fn main() {
///     chanlog::set_default_log_path("app.log");
///     let _logger = chanlog::Logger::start();
///
///     let _lock = chanlog::Lock::new();
///     writeln!(chanlog::log(), "Hello Log!").ok();
///     writeln!(chanlog::err(), "This is an ERROR!").ok();
///     // Dropped here: `app.log` is closed and the channels restored.
/// }
/// ```
#[derive(Clone)]
#[must_use = "redirection stops when the last Logger is dropped"]
pub struct Logger {
    instance: Option<Arc<Instance>>,
}

impl Logger {
    /// Starts (or joins) redirection using [`default_log_path`](crate::default_log_path).
    pub fn start() -> Logger {
        Logger::start_at(None)
    }

    /// Starts redirection into `path`.
    ///
    /// When an instance is already running the handle joins it and `path` is
    /// ignored.
    pub fn with_path(path: impl AsRef<Path>) -> Logger {
        Logger::start_at(Some(path.as_ref()))
    }

    /// Applies [`Settings::from_env`] and starts.
    #[track_caller]
    pub fn start_from_env(quiet: bool) -> Logger {
        Settings::from_env(quiet).apply();
        Logger::start()
    }

    fn start_at(path: Option<&Path>) -> Logger {
        let _lock = Lock::new();
        let mut slot = INSTANCE.lock();
        if let Some(live) = slot.as_ref().and_then(Weak::upgrade) {
            return Logger {
                instance: Some(live),
            };
        }
        let path = match path {
            Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
            _ => crate::config::default_log_path(),
        };
        let instance = Arc::new(Instance::new(&path));
        *slot = Some(Arc::downgrade(&instance));
        notice("chanlog: logger started");
        Logger {
            instance: Some(instance),
        }
    }

    /// True when this handle keeps an instance alive.
    pub fn is_active(&self) -> bool {
        self.instance.is_some()
    }

    /// True while any handle keeps an instance alive.
    pub fn is_running() -> bool {
        INSTANCE.lock().as_ref().is_some_and(|live| live.strong_count() > 0)
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let Some(instance) = self.instance.take() else {
            return;
        };
        let _lock = Lock::new();
        let mut slot = INSTANCE.lock();
        if Arc::strong_count(&instance) == 1 {
            notice("chanlog: logger shutting down");
            *slot = None;
        }
        drop(instance);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn open_mode_truncates_once_per_path() {
        let first = Path::new("/nonexistent/chanlog-open-mode-a.log");
        let second = Path::new("/nonexistent/chanlog-open-mode-b.log");
        assert_eq!(decide_open_mode(first), OpenMode::Truncate);
        assert_eq!(decide_open_mode(first), OpenMode::Append);
        assert_eq!(decide_open_mode(second), OpenMode::Truncate);
        assert_eq!(decide_open_mode(first), OpenMode::Append);
    }
}
