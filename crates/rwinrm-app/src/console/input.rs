use colored::Colorize;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Context, Editor, Event, EventContext, EventHandler, Helper, KeyEvent,
    RepeatCount,
};
use rwinrm_types::InputError;
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::history::HistoryLog;

/// What one round of input acquisition produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A completed line or multi-line block
    Submit(String),
    /// The multiline toggle key was pressed
    ToggleMultiline,
    /// End of input or interrupt
    Cancel,
}

/// Input acquisition capability consumed by the REPL loop
pub trait LineSource {
    /// Block until the operator produces an event
    ///
    /// With `multiline` set, line breaks extend the input instead of
    /// submitting it.
    fn read_event(&mut self, prompt: &str, multiline: bool) -> Result<InputEvent, InputError>;
}

/// Ctrl-T state shared between the key handler and the reader
#[derive(Default)]
struct ToggleSignal {
    requested: AtomicBool,
    stash: Mutex<String>,
}

impl ToggleSignal {
    fn request(&self, line: &str) {
        if let Ok(mut stash) = self.stash.lock() {
            *stash = line.to_string();
        }
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Partially typed text if a toggle was requested
    fn take(&self) -> Option<String> {
        if !self.requested.swap(false, Ordering::SeqCst) {
            return None;
        }
        Some(
            self.stash
                .lock()
                .map(|mut stash| std::mem::take(&mut *stash))
                .unwrap_or_default(),
        )
    }
}

struct ToggleKey {
    signal: Arc<ToggleSignal>,
}

impl ConditionalEventHandler for ToggleKey {
    fn handle(&self, _evt: &Event, _n: RepeatCount, _positive: bool, ctx: &EventContext) -> Option<Cmd> {
        // Abort the read; the reader turns it into a toggle event
        self.signal.request(ctx.line());
        Some(Cmd::Interrupt)
    }
}

/// rustyline helper: history hints and multiline validation
pub struct ConsoleHelper {
    history: HistoryLog,
    multiline: bool,
}

impl ConsoleHelper {
    fn new() -> Self {
        Self {
            history: HistoryLog::new(),
            multiline: false,
        }
    }
}

impl Completer for ConsoleHelper {
    type Candidate = String;
}

impl Hinter for ConsoleHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        self.history.suggest(line).map(str::to_string)
    }
}

impl Highlighter for ConsoleHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.bright_black().to_string())
    }
}

impl Validator for ConsoleHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        if !self.multiline {
            return Ok(ValidationResult::Valid(None));
        }
        // Enter on an empty line ends a multiline block
        let input = ctx.input();
        if input.is_empty() || input.ends_with('\n') {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

impl Helper for ConsoleHelper {}

/// Terminal line editor with in-memory history, hints and a Ctrl-T toggle
pub struct RustylineSource {
    editor: Editor<ConsoleHelper, DefaultHistory>,
    toggle: Arc<ToggleSignal>,
    pending: String,
}

impl RustylineSource {
    pub fn new() -> Result<Self, InputError> {
        let config = Config::builder()
            .max_history_size(usize::MAX)
            .map_err(input_error)?
            .auto_add_history(false)
            .build();

        let mut editor = Editor::<ConsoleHelper, DefaultHistory>::with_config(config).map_err(input_error)?;
        editor.set_helper(Some(ConsoleHelper::new()));

        let toggle = Arc::new(ToggleSignal::default());
        editor.bind_sequence(
            KeyEvent::ctrl('T'),
            EventHandler::Conditional(Box::new(ToggleKey {
                signal: Arc::clone(&toggle),
            })),
        );

        Ok(Self {
            editor,
            toggle,
            pending: String::new(),
        })
    }

    fn remember(&mut self, line: &str) -> Result<(), InputError> {
        self.editor.add_history_entry(line).map_err(input_error)?;
        if let Some(helper) = self.editor.helper_mut() {
            helper.history.append(line);
        }
        Ok(())
    }
}

impl LineSource for RustylineSource {
    fn read_event(&mut self, prompt: &str, multiline: bool) -> Result<InputEvent, InputError> {
        if let Some(helper) = self.editor.helper_mut() {
            helper.multiline = multiline;
        }

        let initial = std::mem::take(&mut self.pending);
        match self.editor.readline_with_initial(prompt, (initial.as_str(), "")) {
            Ok(text) => {
                let text = trim_submitted(&text).to_string();
                if !text.trim().is_empty() {
                    self.remember(&text)?;
                }
                Ok(InputEvent::Submit(text))
            }
            Err(ReadlineError::Interrupted) => match self.toggle.take() {
                Some(partial) => {
                    self.pending = partial;
                    Ok(InputEvent::ToggleMultiline)
                }
                None => Ok(InputEvent::Cancel),
            },
            Err(ReadlineError::Eof) => Ok(InputEvent::Cancel),
            Err(e) => Err(input_error(e)),
        }
    }
}

/// Drop the line breaks left behind by the block-ending empty line
pub fn trim_submitted(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

fn input_error(e: ReadlineError) -> InputError {
    InputError(e.to_string())
}
