//! Core types shared by the rwinrm crates
//!
//! The immutable session configuration, the per-command execution outcome and
//! the error taxonomy every layer reports through.

mod config;
mod error;
mod outcome;

pub use config::{CertValidation, Configuration, Credentials, Encryption, ShellMode, TransportKind};
pub use error::{ConsoleError, InputError, SessionError};
pub use outcome::ExecutionOutcome;

// ============================================================================
// Constants
// ============================================================================

/// Default WinRM port over TLS
pub const DEFAULT_HTTPS_PORT: u16 = 5986;

/// Default WinRM port over plain HTTP
pub const DEFAULT_HTTP_PORT: u16 = 5985;

/// Default URL path of the WS-Management service
pub const DEFAULT_WSMAN_PATH: &str = "wsman";

/// Prefix the scripting shell puts on serialized diagnostic records
pub const CLIXML_MARKER: &str = "#< CLIXML";

/// Exit status of one-shot mode when no remote exit code was obtained
pub const ONE_SHOT_FAILURE_STATUS: i32 = 1;
