pub mod oneshot;
pub mod repl;
pub mod setup;

pub use oneshot::{run_one_shot, run_one_shot_mode};
pub use repl::{run_repl_mode, Repl, ReplState};
pub use setup::{setup_from_cli, AppConfig, SessionSummary};
