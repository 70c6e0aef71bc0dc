use anyhow::{Context, Result};
use encoding_rs::Encoding;
use rustyline::DefaultEditor;
use rwinrm_types::{CertValidation, Configuration, Credentials, Encryption, ShellMode, TransportKind};
use serde::Serialize;

use crate::cli::Cli;
use crate::config::resolve_encoding;

/// Application configuration derived from CLI arguments and prompts
pub struct AppConfig {
    pub configuration: Configuration,
}

impl AppConfig {
    /// What verbose mode prints before connecting
    pub fn summary(&self) -> SessionSummary<'_> {
        SessionSummary::from(&self.configuration)
    }
}

/// Loggable view of the configuration; the password is never included
#[derive(Debug, Serialize)]
pub struct SessionSummary<'a> {
    pub host: &'a str,
    pub username: &'a str,
    pub transport: TransportKind,
    pub encryption: Encryption,
    pub server_cert_validation: CertValidation,
    pub shell: ShellMode,
    pub encoding: &'static str,
    pub one_shot: bool,
}

impl<'a> From<&'a Configuration> for SessionSummary<'a> {
    fn from(config: &'a Configuration) -> Self {
        Self {
            host: &config.host,
            username: &config.credentials.username,
            transport: config.transport,
            encryption: config.encryption,
            server_cert_validation: config.cert_validation,
            shell: config.shell,
            encoding: config.encoding.name(),
            one_shot: config.is_one_shot(),
        }
    }
}

/// Set up application configuration from CLI arguments
///
/// Missing credentials are asked for on the terminal.
pub fn setup_from_cli(cli: &Cli) -> Result<AppConfig> {
    let encoding = resolve_encoding(cli.encoding.as_deref())?;

    let username = match &cli.user {
        Some(user) => user.clone(),
        None => prompt_username()?,
    };
    let password = match &cli.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password("password: ").context("Failed to read password")?,
    };

    Ok(AppConfig {
        configuration: build_configuration(cli, Credentials::new(username, password), encoding),
    })
}

/// Assemble the immutable configuration once every input is known
pub fn build_configuration(cli: &Cli, credentials: Credentials, encoding: &'static Encoding) -> Configuration {
    Configuration {
        host: cli.host.clone(),
        credentials,
        transport: cli.transport,
        cert_validation: cli.server_cert_validation,
        encryption: cli.ssl,
        shell: cli.shell,
        encoding,
        run: cli.run.clone(),
        verbose: cli.verbose,
    }
}

fn prompt_username() -> Result<String> {
    let mut editor = DefaultEditor::new().context("Failed to open terminal for user prompt")?;
    let line = editor.readline("user: ").context("Failed to read user name")?;
    Ok(line.trim().to_string())
}
