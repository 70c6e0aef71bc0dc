use async_trait::async_trait;
use colored::Colorize;
use rwinrm_types::{Configuration, ExecutionOutcome, SessionError, CLIXML_MARKER};

use crate::codepage::codepage_for;
use crate::endpoint::build_endpoint;
use crate::powershell::{clean_clixml, encode_command};
use crate::shell::RemoteShell;
use crate::wsman::envelope::{self, ACTION_COMMAND, ACTION_CREATE, ACTION_DELETE, ACTION_RECEIVE, ACTION_SIGNAL};
use crate::wsman::response::{parse_command_id, parse_receive, parse_shell_id};
use crate::wsman::{Reply, WsmanClient};

/// A WinRM session bound to one endpoint and one set of credentials
///
/// Every execution opens a fresh remote cmd shell, runs a single command in
/// it and closes it again, so no remote state survives between commands.
pub struct WinRmSession {
    client: WsmanClient,
    username: String,
    codepage: u32,
    verbose: bool,
}

impl WinRmSession {
    /// Validate the configuration and prepare the session; no network I/O
    pub fn connect(config: &Configuration) -> Result<Self, SessionError> {
        let endpoint = build_endpoint(&config.host, config.encryption)?;

        if config.credentials.username.trim().is_empty() {
            return Err(SessionError::ConnectionSetup("username must not be empty".to_string()));
        }

        let client = WsmanClient::new(
            endpoint,
            &config.credentials,
            config.transport,
            config.encryption,
            config.cert_validation,
            config.verbose,
        )?;

        Ok(Self {
            client,
            username: config.credentials.username.clone(),
            codepage: codepage_for(config.encoding),
            verbose: config.verbose,
        })
    }

    pub fn codepage(&self) -> u32 {
        self.codepage
    }

    async fn run_command(&self, command: &str, args: &[&str]) -> Result<ExecutionOutcome, SessionError> {
        let shell_id = self.open_shell().await?;
        let result = self.run_in_shell(&shell_id, command, args).await;

        // Cleanup must not mask the command's own result
        if let Err(e) = self.close_shell(&shell_id).await {
            self.cleanup_warning("close shell", &e);
        }

        result
    }

    async fn open_shell(&self) -> Result<String, SessionError> {
        let request = envelope::create_shell(self.client.endpoint(), self.codepage);
        let body = self.client.send(ACTION_CREATE, request).await?.into_body()?;
        parse_shell_id(&body)
    }

    async fn close_shell(&self, shell_id: &str) -> Result<(), SessionError> {
        let request = envelope::delete_shell(self.client.endpoint(), shell_id);
        self.client.send(ACTION_DELETE, request).await?.into_body()?;
        Ok(())
    }

    async fn run_in_shell(&self, shell_id: &str, command: &str, args: &[&str]) -> Result<ExecutionOutcome, SessionError> {
        let request = envelope::command(self.client.endpoint(), shell_id, command, args);
        let body = self.client.send(ACTION_COMMAND, request).await?.into_body()?;
        let command_id = parse_command_id(&body)?;

        let outcome = self.collect_output(shell_id, &command_id).await?;

        let request = envelope::signal_terminate(self.client.endpoint(), shell_id, &command_id);
        if let Err(e) = self.client.send(ACTION_SIGNAL, request).await.and_then(Reply::into_body) {
            self.cleanup_warning("terminate command", &e);
        }

        Ok(outcome)
    }

    async fn collect_output(&self, shell_id: &str, command_id: &str) -> Result<ExecutionOutcome, SessionError> {
        let mut outcome = ExecutionOutcome::default();

        loop {
            let request = envelope::receive(self.client.endpoint(), shell_id, command_id);
            let body = match self.client.send(ACTION_RECEIVE, request).await? {
                Reply::Body(body) => body,
                Reply::Fault(fault) if fault.is_operation_timeout() => continue,
                Reply::Fault(fault) => return Err(SessionError::Transport(fault.to_string())),
            };

            let chunk = parse_receive(&body)?;
            outcome.stdout.extend_from_slice(&chunk.stdout);
            outcome.stderr.extend_from_slice(&chunk.stderr);

            if chunk.done {
                outcome.exit_code = chunk.exit_code;
                return Ok(outcome);
            }
        }
    }

    fn cleanup_warning(&self, step: &str, error: &SessionError) {
        if self.verbose {
            eprintln!("{}", format!("⚠️  Failed to {}: {}", step, error).yellow());
        }
    }
}

#[async_trait]
impl RemoteShell for WinRmSession {
    async fn execute_native(&self, command: &str, args: &[&str]) -> Result<ExecutionOutcome, SessionError> {
        self.run_command(command, args).await
    }

    async fn execute_script(&self, script: &str) -> Result<ExecutionOutcome, SessionError> {
        let encoded = encode_command(script);
        let mut outcome = self.run_command("powershell", &["-encodedcommand", &encoded]).await?;
        if outcome.stderr.starts_with(CLIXML_MARKER.as_bytes()) {
            outcome.stderr = clean_clixml(&outcome.stderr);
        }
        Ok(outcome)
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn endpoint(&self) -> &str {
        self.client.endpoint()
    }
}
