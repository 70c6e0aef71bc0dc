use encoding_rs::Encoding;
use rwinrm_session::RemoteShell;
use rwinrm_types::{ConsoleError, ShellMode};

use super::dispatcher::dispatch;
use super::interpreter::decode;

/// Mutable interactive state, owned by the REPL loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleState {
    multiline: bool,
    shell: ShellMode,
    prompt: String,
}

impl ConsoleState {
    pub fn new(shell: ShellMode) -> Self {
        Self {
            multiline: false,
            shell,
            prompt: String::new(),
        }
    }

    pub fn multiline(&self) -> bool {
        self.multiline
    }

    pub fn shell(&self) -> ShellMode {
        self.shell
    }

    /// Last prompt obtained from the remote host
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Flip multiline input and return the new value
    pub fn toggle_multiline(&mut self) -> bool {
        self.multiline = !self.multiline;
        self.multiline
    }

    /// Ask the remote host for its working directory and cache the prompt
    pub async fn refresh_prompt<S>(&mut self, session: &S, encoding: &'static Encoding) -> Result<&str, ConsoleError>
    where
        S: RemoteShell + ?Sized,
    {
        let query = match self.shell {
            ShellMode::Scripting => "(pwd).Path",
            ShellMode::Native => "cd",
        };

        let outcome = dispatch(session, self.shell, query)
            .await
            .map_err(|e| ConsoleError::prompt(e.into()))?
            .unwrap_or_default();
        let path = decode(&outcome.stdout, encoding, "stdout").map_err(ConsoleError::prompt)?;

        self.prompt = format_prompt(self.shell, path.trim());
        Ok(&self.prompt)
    }
}

/// `PS <path>> ` for the scripting shell, `<path>>` for the native shell
pub fn format_prompt(shell: ShellMode, path: &str) -> String {
    match shell {
        ShellMode::Scripting => format!("PS {}> ", path),
        ShellMode::Native => format!("{}>", path),
    }
}

/// Connection and mode summary shown under the prompt
pub fn status_line(username: &str, endpoint: &str, multiline: bool) -> String {
    format!(
        " Connected as {} to {}  Multiline is {}",
        username,
        endpoint,
        on_off(multiline)
    )
}

pub fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "off"
    }
}
