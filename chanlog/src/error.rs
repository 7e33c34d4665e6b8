use std::io::Write;
use std::panic::Location;
use std::path::PathBuf;

/// Failures inside the redirection machinery.
///
/// None of these escape a [`Logger`](crate::Logger) start or stop; stream
/// writes surface them as [`std::io::Error`] after they have been reported.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open log file `{}`: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write to log file: {0}")]
    File(#[source] std::io::Error),
    #[error("failed to write to debug sink: {0}")]
    DebugSink(#[source] std::io::Error),
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Open { source, .. } => source,
            Error::File(source) | Error::DebugSink(source) => source,
        }
    }
}

/// Writes a diagnostic straight to the process stderr.
///
/// This path never goes through a [`Stream`](crate::Stream), so it is safe to
/// call while a channel is redirected or while its buffer is locked.
#[track_caller]
pub(crate) fn report(err: &Error) {
    report_message(format_args!("{err}"), Location::caller());
}

pub(crate) fn report_message(message: std::fmt::Arguments<'_>, caller: &Location<'_>) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(
        stderr,
        "chanlog: {}:{}: {}",
        caller.file(),
        caller.line(),
        message
    );
}
