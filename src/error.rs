use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::cli::CliError;

/// Failures the driver surfaces outside the diagnostic pipeline: argument
/// assembly, source and command-file loading, and internal faults. Problems
/// in source text flow through [`crate::diagnostics::DiagnosticEngine`]
/// instead and never appear here.
#[derive(Debug)]
pub enum Error {
    /// Command-line assembly failed.
    Cli(CliError),
    /// A source, library, or command file could not be read. Rendered with
    /// the same wording the reference flow prints for failed loads.
    Load { path: PathBuf, source: io::Error },
    /// Filesystem trouble outside of source loading.
    Io(io::Error),
    /// A driver bug, not a user error.
    Internal {
        message: String,
        backtrace: Option<Backtrace>,
    },
}

/// Convenience result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// A failed file load. The loader records one of these per file and the
    /// driver prints them through its error channel.
    pub fn load(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Load {
            path: path.into(),
            source,
        }
    }

    /// Construct a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            backtrace: cfg!(debug_assertions).then(Backtrace::force_capture),
        }
    }

    /// The captured backtrace, if any.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            Error::Internal { backtrace, .. } => backtrace.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Cli(err) => write!(f, "{err}"),
            Error::Load { path, .. } => {
                write!(f, "unable to find or open file: '{}'", path.display())
            }
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::Internal { message, .. } => write!(f, "internal error: {message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Cli(err) => Some(err),
            Error::Load { source, .. } | Error::Io(source) => Some(source),
            Error::Internal { .. } => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<CliError> for Error {
    fn from(error: CliError) -> Self {
        Error::Cli(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_use_the_driver_wording() {
        let err = Error::load("missing/top.v", io::ErrorKind::NotFound.into());
        assert_eq!(err.to_string(), "unable to find or open file: 'missing/top.v'");
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<io::Error>().is_some());
    }

    #[test]
    fn cli_errors_pass_their_message_through() {
        let err = Error::from(CliError::new("unknown command line argument '-z'"));
        assert_eq!(err.to_string(), "unknown command line argument '-z'");
        assert!(err.source().unwrap().downcast_ref::<CliError>().is_some());
    }

    #[test]
    fn io_errors_are_labelled() {
        let err = Error::from(io::Error::other("disk gone"));
        assert_eq!(err.to_string(), "I/O error: disk gone");
    }

    #[test]
    fn internal_errors_capture_a_backtrace_in_debug_builds() {
        let err = Error::internal("definition map out of sync");
        assert_eq!(err.to_string(), "internal error: definition map out of sync");
        assert_eq!(err.backtrace().is_some(), cfg!(debug_assertions));
        assert!(err.source().is_none());
    }
}
