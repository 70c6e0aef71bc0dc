use anyhow::Result;
use colored::Colorize;
use encoding_rs::Encoding;
use rwinrm_session::{RemoteShell, WinRmSession};
use rwinrm_types::{Configuration, ShellMode, ONE_SHOT_FAILURE_STATUS};
use std::io::{self, Write};

use crate::console::{dispatch, interpret};

/// Dispatch one command, print its result and return the process exit status
///
/// The status is the remote exit code when one was obtained, otherwise
/// [`ONE_SHOT_FAILURE_STATUS`]. The prompt is never queried.
pub async fn run_one_shot<S, W>(
    session: &S,
    shell: ShellMode,
    encoding: &'static Encoding,
    command: &str,
    out: &mut W,
) -> Result<i32>
where
    S: RemoteShell + ?Sized,
    W: Write,
{
    let outcome = match dispatch(session, shell, command).await {
        Ok(outcome) => outcome,
        Err(e) => {
            writeln!(out, "{}", format!("ERROR: {}", e).bright_red())?;
            return Ok(ONE_SHOT_FAILURE_STATUS);
        }
    };

    match interpret(outcome.as_ref(), encoding) {
        Ok(Some(rendered)) => rendered.write_to(out)?,
        Ok(None) => {}
        Err(e) => writeln!(out, "{}", format!("ERROR: {}", e).bright_red())?,
    }

    Ok(outcome
        .and_then(|outcome| outcome.exit_code)
        .unwrap_or(ONE_SHOT_FAILURE_STATUS))
}

/// Run the `--run` command against a connected session
pub async fn run_one_shot_mode(session: &WinRmSession, config: &Configuration) -> Result<i32> {
    let command = config.run.as_deref().unwrap_or_default();
    let mut stdout = io::stdout();
    let code = run_one_shot(session, config.shell, config.encoding, command, &mut stdout).await?;
    stdout.flush()?;
    Ok(code)
}
