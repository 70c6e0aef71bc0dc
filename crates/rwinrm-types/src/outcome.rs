/// Raw result of one remote execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// `None` when the remote shell finished without reporting a status
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecutionOutcome {
    pub fn new(exit_code: Option<i32>, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// True when the remote shell ran and reported failure
    pub fn is_remote_failure(&self) -> bool {
        matches!(self.exit_code, Some(code) if code != 0)
    }
}
