#![allow(dead_code)]

use async_trait::async_trait;
use rwinrm::console::{InputEvent, LineSource};
use rwinrm::types::InputError;
use rwinrm::{ExecutionOutcome, RemoteShell, SessionError};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const TEST_USER: &str = "admin";
pub const TEST_ENDPOINT: &str = "https://winbox:5986/wsman";

/// Disable ANSI colors so assertions can match plain text
pub fn plain_output() {
    colored::control::set_override(false);
}

/// A call the console made against the mock session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Native(String, Vec<String>),
    Script(String),
}

/// Remote shell that replays queued results and records every call
pub struct MockShell {
    responses: Mutex<VecDeque<Result<ExecutionOutcome, SessionError>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockShell {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_responses(responses: Vec<Result<ExecutionOutcome, SessionError>>) -> Self {
        let shell = Self::new();
        shell.responses.lock().unwrap().extend(responses);
        shell
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn next_response(&self, call: Call) -> Result<ExecutionOutcome, SessionError> {
        self.calls.lock().unwrap().push(call);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SessionError::Transport("no scripted response".to_string())))
    }
}

#[async_trait]
impl RemoteShell for MockShell {
    async fn execute_native(&self, command: &str, args: &[&str]) -> Result<ExecutionOutcome, SessionError> {
        let args = args.iter().map(|arg| arg.to_string()).collect();
        self.next_response(Call::Native(command.to_string(), args))
    }

    async fn execute_script(&self, script: &str) -> Result<ExecutionOutcome, SessionError> {
        self.next_response(Call::Script(script.to_string()))
    }

    fn username(&self) -> &str {
        TEST_USER
    }

    fn endpoint(&self) -> &str {
        TEST_ENDPOINT
    }
}

/// Successful outcome with the given stdout
pub fn ok_outcome(stdout: &str) -> Result<ExecutionOutcome, SessionError> {
    Ok(ExecutionOutcome::new(Some(0), stdout, ""))
}

/// Line source that replays events, then cancels
pub struct ScriptedInput {
    events: VecDeque<Result<InputEvent, InputError>>,
    /// (prompt, multiline) seen on each read
    pub reads: Vec<(String, bool)>,
}

impl ScriptedInput {
    pub fn new(events: Vec<Result<InputEvent, InputError>>) -> Self {
        Self {
            events: events.into(),
            reads: Vec::new(),
        }
    }

    pub fn submits(lines: &[&str]) -> Self {
        Self::new(
            lines
                .iter()
                .map(|line| Ok(InputEvent::Submit(line.to_string())))
                .collect(),
        )
    }
}

impl LineSource for ScriptedInput {
    fn read_event(&mut self, prompt: &str, multiline: bool) -> Result<InputEvent, InputError> {
        self.reads.push((prompt.to_string(), multiline));
        self.events.pop_front().unwrap_or(Ok(InputEvent::Cancel))
    }
}
