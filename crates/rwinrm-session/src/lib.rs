// Remote session over WS-Management
//
// Exposes the two execution primitives the console needs (native shell and
// scripting shell) behind the `RemoteShell` trait, and a `WinRmSession` that
// implements them by driving a remote cmd.exe through WinRM SOAP calls.

mod codepage;
mod endpoint;
mod ntlm;
mod powershell;
mod session;
pub mod shell;
pub mod wsman;

// Re-export public API
pub use codepage::codepage_for;
pub use endpoint::build_endpoint;
pub use powershell::{clean_clixml, encode_command};
pub use session::WinRmSession;
pub use shell::RemoteShell;

// Constants
pub const DEFAULT_CODEPAGE: u32 = 437;
pub const MAX_ENVELOPE_SIZE: u32 = 153_600;
pub const OPERATION_TIMEOUT_SECS: u64 = 20;
/// HTTP deadline; must outlive the WS-Man operation timeout of a Receive
pub const HTTP_TIMEOUT_SECS: u64 = OPERATION_TIMEOUT_SECS + 10;
