use rwinrm_session::RemoteShell;
use rwinrm_types::{ExecutionOutcome, SessionError, ShellMode};

/// Which remote primitive a line of input maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation<'a> {
    Native { command: &'a str, args: Vec<&'a str> },
    Script(&'a str),
}

/// Decide how a line is executed, without executing it
///
/// Blank input maps to nothing. Input with a line break, or any input in
/// scripting mode, goes verbatim to the scripting shell. Otherwise the line is
/// split on whitespace into command and arguments; quoting is not understood,
/// so `dir "C:\Program Files"` passes two arguments.
pub fn plan(shell: ShellMode, line: &str) -> Option<Invocation<'_>> {
    if line.trim().is_empty() {
        return None;
    }

    if line.contains('\n') || shell == ShellMode::Scripting {
        return Some(Invocation::Script(line));
    }

    let mut tokens = line.split_whitespace();
    let command = tokens.next()?;
    Some(Invocation::Native {
        command,
        args: tokens.collect(),
    })
}

/// Execute a line of input against the session
///
/// Session errors are returned untouched; nothing is retried.
pub async fn dispatch<S>(session: &S, shell: ShellMode, line: &str) -> Result<Option<ExecutionOutcome>, SessionError>
where
    S: RemoteShell + ?Sized,
{
    match plan(shell, line) {
        None => Ok(None),
        Some(Invocation::Script(script)) => session.execute_script(script).await.map(Some),
        Some(Invocation::Native { command, args }) => session.execute_native(command, &args).await.map(Some),
    }
}
