//! Command execution core: dispatch, result interpretation, console state and
//! input acquisition.

pub mod dispatcher;
pub mod history;
pub mod input;
pub mod interpreter;
pub mod state;

pub use dispatcher::{dispatch, plan, Invocation};
pub use history::HistoryLog;
pub use input::{InputEvent, LineSource, RustylineSource};
pub use interpreter::{decode, interpret, RenderedResult};
pub use state::{format_prompt, status_line, ConsoleState};
