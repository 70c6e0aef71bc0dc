//! rwinrm application library
//!
//! Command-line surface, startup setup, the console core and the two run
//! modes (interactive REPL and one-shot).

// Re-export workspace crates
pub use rwinrm_logging as logging;
pub use rwinrm_session::{self as session, RemoteShell, WinRmSession};
pub use rwinrm_types::{self as types, Configuration, ConsoleError, ExecutionOutcome, SessionError, ShellMode};

// Local modules
pub mod app;
pub mod cli;
pub mod config;
pub mod console;

// Re-exports from local modules
pub use app::{run_one_shot_mode, run_repl_mode, setup_from_cli, AppConfig};
pub use cli::Cli;
pub use config::resolve_encoding;
