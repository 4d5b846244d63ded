use std::path::PathBuf;
use thiserror::Error;

/// Failures that can stop a session from being built.
///
/// Once a [`Session`](crate::Session) exists no operation on it returns an
/// error: out-of-range viewport requests are clamped and every click resolves
/// to some sample.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("invalid signal: {0}")]
    InvalidSignal(String),
    #[error("malformed annotation token {token:?} at position {position}")]
    MalformedAnnotation { token: String, position: usize },
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = AnnotateError> = std::result::Result<T, E>;
