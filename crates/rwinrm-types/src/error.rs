use thiserror::Error;

/// Failures raised by a remote session before any remote result exists
///
/// A remote command exiting nonzero is not an error; it is an
/// [`ExecutionOutcome`](crate::ExecutionOutcome) with a nonzero exit code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Bad endpoint or handshake parameters, detected without network I/O
    #[error("connection setup failed: {0}")]
    ConnectionSetup(String),
    /// The remote side rejected the credentials
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// The call could not complete (DNS, TCP, TLS, timeout, malformed reply)
    #[error("transport failure: {0}")]
    Transport(String),
}

impl SessionError {
    /// Errors the REPL reports and survives
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::Transport(_))
    }
}

/// Console-level failures: session errors plus output decoding and prompt refresh
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("cannot decode {stream} as {encoding}")]
    Decode {
        stream: &'static str,
        encoding: &'static str,
    },
    #[error("cannot determine remote prompt: {0}")]
    Prompt(#[source] Box<ConsoleError>),
}

impl ConsoleError {
    pub fn prompt(source: ConsoleError) -> Self {
        Self::Prompt(Box::new(source))
    }
}

/// Unexpected fault in the line-editing layer
#[derive(Debug, Error)]
#[error("input error: {0}")]
pub struct InputError(pub String);
