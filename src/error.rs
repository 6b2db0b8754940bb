//! Crate-wide error type for the handful of fallible setup calls. Runtime
//! errors on live windows are handled by the installed X error handler
//! (`xconn::install_fatal_handler`), not by this type: everything past
//! setup either succeeds, is a no-op, or terminates the process from
//! inside the error callback.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WmError {
    #[error("failed to connect to X server (is $DISPLAY set?)")]
    NoDisplay,

    #[error("no screen associated with display")]
    NoScreen,

    #[error("substructure redirection refused, is another window manager running?")]
    RedirectionRefused,

    #[error("failed to query existing window tree")]
    QueryTreeFailed,

    #[error("failed to intern atom {0}")]
    AtomInternFailed(&'static str),
}

/// Log a fatal setup error and exit the process with a non-zero status.
pub fn die(err: &WmError) -> ! {
    error!("fatal: {}", err);
    std::process::exit(1);
}
