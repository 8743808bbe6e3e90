use thiserror::Error;

use super::session::SessionStage;

/// Failures that prevent verification from starting at all. Once a
/// verifier exists, every outcome of a verification — including internal
/// failures — is reported as a [`VerifyReport`](super::VerifyReport).
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Mx(#[from] crate::mx::Error),
}

/// Failure of a single SMTP dialogue. These never escape the retry
/// controller; it converts them into next-host or next-attempt decisions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} timed out")]
    Timeout { stage: SessionStage },
    #[error("connection closed during {stage}")]
    Disconnected { stage: SessionStage },
    #[error("I/O failure during {stage}: {source}")]
    Io {
        stage: SessionStage,
        #[source]
        source: std::io::Error,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
}
