mod common;

use common::{plain_output, Call, MockShell};
use encoding_rs::UTF_8;
use rwinrm::app::run_one_shot;
use rwinrm::types::ONE_SHOT_FAILURE_STATUS;
use rwinrm::{ExecutionOutcome, SessionError, ShellMode};

#[tokio::test]
async fn test_exit_status_is_remote_exit_code() {
    plain_output();
    let shell = MockShell::with_responses(vec![Ok(ExecutionOutcome::new(Some(3), "partial\r\n", "disk full"))]);
    let mut out = Vec::new();

    let code = run_one_shot(&shell, ShellMode::Native, UTF_8, "backup.cmd now", &mut out)
        .await
        .unwrap();

    assert_eq!(code, 3);
    assert_eq!(String::from_utf8(out).unwrap(), "partial\nERROR (3): disk full\n");
    // The prompt is never queried in one-shot mode
    assert_eq!(
        shell.calls(),
        vec![Call::Native("backup.cmd".to_string(), vec!["now".to_string()])]
    );
}

#[tokio::test]
async fn test_success_exits_zero() {
    plain_output();
    let shell = MockShell::with_responses(vec![Ok(ExecutionOutcome::new(Some(0), "WINBOX\r\n", ""))]);
    let mut out = Vec::new();

    let code = run_one_shot(&shell, ShellMode::Scripting, UTF_8, "hostname", &mut out)
        .await
        .unwrap();

    assert_eq!(code, 0);
    assert_eq!(String::from_utf8(out).unwrap(), "WINBOX\n");
    assert_eq!(shell.calls(), vec![Call::Script("hostname".to_string())]);
}

#[tokio::test]
async fn test_absent_exit_code_is_failure_status() {
    plain_output();
    let shell = MockShell::with_responses(vec![Ok(ExecutionOutcome::new(None, "hi", ""))]);
    let mut out = Vec::new();

    let code = run_one_shot(&shell, ShellMode::Native, UTF_8, "echo hi", &mut out)
        .await
        .unwrap();

    assert_eq!(code, ONE_SHOT_FAILURE_STATUS);
}

#[tokio::test]
async fn test_transport_error_is_failure_status() {
    plain_output();
    let shell = MockShell::with_responses(vec![Err(SessionError::Transport("timed out".to_string()))]);
    let mut out = Vec::new();

    let code = run_one_shot(&shell, ShellMode::Native, UTF_8, "dir", &mut out)
        .await
        .unwrap();

    assert_eq!(code, 1);
    assert!(String::from_utf8(out).unwrap().contains("ERROR: transport failure: timed out"));
}

#[tokio::test]
async fn test_empty_command_dispatches_nothing() {
    plain_output();
    let shell = MockShell::new();
    let mut out = Vec::new();

    let code = run_one_shot(&shell, ShellMode::Native, UTF_8, "  ", &mut out).await.unwrap();

    assert_eq!(code, ONE_SHOT_FAILURE_STATUS);
    assert!(shell.calls().is_empty());
    assert!(out.is_empty());
}
