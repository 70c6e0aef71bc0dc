use anyhow::Result;
use colored::Colorize;
use encoding_rs::Encoding;
use rwinrm_session::{RemoteShell, WinRmSession};
use rwinrm_types::{Configuration, ExecutionOutcome, ShellMode};
use std::fmt::Display;
use std::io::{self, Write};
use std::time::Duration;

use crate::console::state::on_off;
use crate::console::{dispatch, interpret, status_line, ConsoleState, InputEvent, LineSource, RustylineSource};

/// Pause added per consecutive input fault before reading again
pub const INPUT_FAULT_BACKOFF: Duration = Duration::from_millis(10);

/// Upper bound of the pause between faulty reads
pub const MAX_INPUT_FAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Where the interactive loop currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplState {
    Starting,
    AwaitingInput,
    Dispatching(String),
    Rendering(Option<ExecutionOutcome>),
    Terminated,
}

/// Interactive loop over a remote shell
///
/// Every transition happens in [`Repl::step`]; the input source only reports
/// events and never touches the console state itself.
pub struct Repl<'a, S: RemoteShell + ?Sized, I: LineSource, W: Write> {
    session: &'a S,
    encoding: &'static Encoding,
    console: ConsoleState,
    input: I,
    out: W,
    state: ReplState,
    input_faults: u32,
}

impl<'a, S, I, W> Repl<'a, S, I, W>
where
    S: RemoteShell + ?Sized,
    I: LineSource,
    W: Write,
{
    pub fn new(session: &'a S, shell: ShellMode, encoding: &'static Encoding, input: I, out: W) -> Self {
        Self {
            session,
            encoding,
            console: ConsoleState::new(shell),
            input,
            out,
            state: ReplState::Starting,
            input_faults: 0,
        }
    }

    pub fn state(&self) -> &ReplState {
        &self.state
    }

    pub fn console(&self) -> &ConsoleState {
        &self.console
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until the loop terminates
    pub async fn run(&mut self) -> Result<()> {
        while self.state != ReplState::Terminated {
            self.step().await?;
        }
        Ok(())
    }

    /// Perform one transition
    ///
    /// Only failures outside the recoverable set come back as `Err`.
    pub async fn step(&mut self) -> Result<&ReplState> {
        let next = match std::mem::replace(&mut self.state, ReplState::Terminated) {
            ReplState::Starting => self.start().await?,
            ReplState::AwaitingInput => self.await_input().await?,
            ReplState::Dispatching(line) => self.dispatch_line(&line).await?,
            ReplState::Rendering(outcome) => self.render(outcome.as_ref())?,
            ReplState::Terminated => ReplState::Terminated,
        };
        self.state = next;
        Ok(&self.state)
    }

    async fn start(&mut self) -> Result<ReplState> {
        let refreshed = self
            .console
            .refresh_prompt(self.session, self.encoding)
            .await
            .map(|_| ());

        match refreshed {
            Ok(()) => {
                self.print_status()?;
                Ok(ReplState::AwaitingInput)
            }
            Err(e) => {
                self.print_error(&e)?;
                Ok(ReplState::Terminated)
            }
        }
    }

    async fn await_input(&mut self) -> Result<ReplState> {
        if self.input_faults > 0 {
            tokio::time::sleep(fault_backoff(self.input_faults)).await;
        }

        let event = match self.input.read_event(self.console.prompt(), self.console.multiline()) {
            Ok(event) => event,
            Err(e) => {
                // Input faults never end the session
                self.input_faults = self.input_faults.saturating_add(1);
                self.print_error(&e)?;
                return Ok(ReplState::AwaitingInput);
            }
        };
        self.input_faults = 0;

        match event {
            InputEvent::Submit(line) => Ok(ReplState::Dispatching(line)),
            InputEvent::ToggleMultiline => {
                let multiline = self.console.toggle_multiline();
                writeln!(self.out, "{}", format!("Set multiline {}", on_off(multiline)).bright_black())?;
                self.print_status()?;
                Ok(ReplState::AwaitingInput)
            }
            InputEvent::Cancel => {
                writeln!(self.out, "\n{}", "Ctrl-C pressed. Bailing out!".bright_black())?;
                Ok(ReplState::Terminated)
            }
        }
    }

    async fn dispatch_line(&mut self, line: &str) -> Result<ReplState> {
        match dispatch(self.session, self.console.shell(), line).await {
            Ok(outcome) => Ok(ReplState::Rendering(outcome)),
            Err(e) if e.is_recoverable() => {
                self.print_error(&e)?;
                Ok(ReplState::AwaitingInput)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn render(&mut self, outcome: Option<&ExecutionOutcome>) -> Result<ReplState> {
        match interpret(outcome, self.encoding) {
            Ok(Some(rendered)) => rendered.write_to(&mut self.out)?,
            Ok(None) => {}
            Err(e) => self.print_error(&e)?,
        }
        Ok(ReplState::AwaitingInput)
    }

    fn print_status(&mut self) -> io::Result<()> {
        let line = status_line(self.session.username(), self.session.endpoint(), self.console.multiline());
        writeln!(self.out, "{}", line.bright_black())
    }

    fn print_error(&mut self, e: &dyn Display) -> io::Result<()> {
        writeln!(self.out, "{}", format!("ERROR: {}", e).bright_red())?;
        self.out.flush()
    }
}

/// Pause before the next read after `faults` consecutive input faults
fn fault_backoff(faults: u32) -> Duration {
    INPUT_FAULT_BACKOFF
        .saturating_mul(faults)
        .min(MAX_INPUT_FAULT_BACKOFF)
}

/// Run interactive REPL mode against a connected session
pub async fn run_repl_mode(session: &WinRmSession, config: &Configuration) -> Result<()> {
    let input = RustylineSource::new()?;
    let mut repl = Repl::new(session, config.shell, config.encoding, input, io::stdout());
    repl.run().await
}
