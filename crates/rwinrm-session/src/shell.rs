/// Remote execution capability consumed by the console
use async_trait::async_trait;
use rwinrm_types::{ExecutionOutcome, SessionError};

/// The two primitives of a remote session
///
/// Both calls complete the remote command before returning. An `Err` means no
/// remote result was produced; a remote failure is an `Ok` outcome with a
/// nonzero exit code.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Run one command with positional arguments in the native shell
    async fn execute_native(&self, command: &str, args: &[&str]) -> Result<ExecutionOutcome, SessionError>;

    /// Run an arbitrary, possibly multi-line, script in the scripting shell
    async fn execute_script(&self, script: &str) -> Result<ExecutionOutcome, SessionError>;

    /// Account the session authenticates as
    fn username(&self) -> &str;

    /// Endpoint URL the session talks to
    fn endpoint(&self) -> &str;
}
