//! Definition of errors.

use std::process::ExitStatus;

/// A specialized Result type for bttok.
pub type Result<T, E = BttokError> = std::result::Result<T, E>;

/// The error type for bttok.
#[derive(Debug, thiserror::Error)]
pub enum BttokError {
    /// An argument or configuration value is out of range.
    #[error("invalid argument `{arg}`: {msg}")]
    InvalidArgument { arg: &'static str, msg: String },

    /// An input file contains a line that cannot be parsed.
    #[error("invalid {what} at line {line}: {msg}")]
    InvalidFormat {
        what: &'static str,
        line: usize,
        msg: String,
    },

    /// A persisted index is not a dense id mapping or has undecodable keys.
    #[error("invalid index: {0}")]
    InvalidIndex(String),

    /// An external tool (tagger or scorer) exited unsuccessfully.
    #[error("`{program}` exited with {status}")]
    ExternalProcess { program: String, status: ExitStatus },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl BttokError {
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument {
            arg,
            msg: msg.into(),
        }
    }

    pub(crate) fn invalid_format<S>(what: &'static str, line: usize, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidFormat {
            what,
            line,
            msg: msg.into(),
        }
    }
}
