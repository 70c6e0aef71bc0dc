use base64::prelude::*;
use regex::Regex;
use rwinrm_types::SessionError;
use std::fmt;
use std::sync::OnceLock;

/// WS-Man fault code for "no output within OperationTimeout"; poll again
pub const OPERATION_TIMEOUT_FAULT_CODE: &str = "2150858793";

const COMMAND_STATE_DONE: &str = "CommandState/Done";

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("response pattern is valid"))
        }
    };
}

cached_regex!(shell_id_regex, r#"<(?:\w+:)?ShellId>\s*([^<\s]+)\s*</|<(?:\w+:)?Selector Name="ShellId">\s*([^<\s]+)\s*</"#);
cached_regex!(command_id_regex, r"<(?:\w+:)?CommandId>\s*([^<\s]+)\s*</");
cached_regex!(stream_regex, r"<(?:\w+:)?Stream\b([^>]*?)(?:/>|>([^<]*)</(?:\w+:)?Stream>)");
cached_regex!(stream_name_regex, r#"\bName="([^"]*)""#);
cached_regex!(command_state_regex, r#"<(?:\w+:)?CommandState\b[^>]*\bState="([^"]+)""#);
cached_regex!(exit_code_regex, r"<(?:\w+:)?ExitCode>\s*(-?\d+)\s*</");
cached_regex!(fault_code_regex, r#"<(?:\w+:)?WSManFault\b[^>]*\bCode="(\d+)""#);
cached_regex!(fault_text_regex, r"<(?:\w+:)?(?:Message|Text)\b[^>]*>\s*([^<]*?)\s*</");

/// A SOAP fault returned by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: Option<String>,
    pub reason: String,
}

impl Fault {
    pub fn is_operation_timeout(&self) -> bool {
        self.code.as_deref() == Some(OPERATION_TIMEOUT_FAULT_CODE)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "WS-Management fault {}: {}", code, self.reason),
            None => write!(f, "WS-Management fault: {}", self.reason),
        }
    }
}

/// Output gathered by one Receive call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveChunk {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub done: bool,
    pub exit_code: Option<i32>,
}

fn malformed(what: &str) -> SessionError {
    SessionError::Transport(format!("malformed WS-Management reply: {}", what))
}

pub fn parse_shell_id(body: &str) -> Result<String, SessionError> {
    shell_id_regex()
        .captures(body)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| malformed("no ShellId in Create response"))
}

pub fn parse_command_id(body: &str) -> Result<String, SessionError> {
    command_id_regex()
        .captures(body)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| malformed("no CommandId in Command response"))
}

/// Decode stream chunks and command state from a Receive response
pub fn parse_receive(body: &str) -> Result<ReceiveChunk, SessionError> {
    let mut chunk = ReceiveChunk::default();

    for caps in stream_regex().captures_iter(body) {
        let attributes = &caps[1];
        let Some(content) = caps.get(2).map(|m| m.as_str().trim()) else {
            continue;
        };
        if content.is_empty() {
            continue;
        }
        let name = stream_name_regex()
            .captures(attributes)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        let bytes = BASE64_STANDARD
            .decode(content)
            .map_err(|e| malformed(&format!("bad base64 in {} stream: {}", name, e)))?;
        match name.as_str() {
            "stdout" => chunk.stdout.extend_from_slice(&bytes),
            "stderr" => chunk.stderr.extend_from_slice(&bytes),
            _ => {}
        }
    }

    if let Some(caps) = command_state_regex().captures(body) {
        chunk.done = caps[1].ends_with(COMMAND_STATE_DONE);
    }

    if chunk.done {
        // Exit codes are DWORDs on the wire; keep the bit pattern
        chunk.exit_code = exit_code_regex()
            .captures(body)
            .and_then(|caps| caps[1].parse::<i64>().ok())
            .map(|code| code as i32);
    }

    Ok(chunk)
}

/// Extract a fault from an error response, if the body carries one
pub fn parse_fault(body: &str) -> Option<Fault> {
    if !body.contains("Fault") {
        return None;
    }
    let code = fault_code_regex().captures(body).map(|caps| caps[1].to_string());
    let reason = fault_text_regex()
        .captures_iter(body)
        .map(|caps| caps[1].to_string())
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| "no reason given".to_string());
    Some(Fault { code, reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell_id_from_body_or_selector() {
        let body = r#"<s:Body><x:ResourceCreated><a:ReferenceParameters><w:SelectorSet><w:Selector Name="ShellId">11111111-AAAA</w:Selector></w:SelectorSet></a:ReferenceParameters></x:ResourceCreated><rsp:Shell><rsp:ShellId>11111111-AAAA</rsp:ShellId></rsp:Shell></s:Body>"#;
        assert_eq!(parse_shell_id(body).unwrap(), "11111111-AAAA");

        let selector_only = r#"<w:Selector Name="ShellId">BEEF</w:Selector>"#;
        assert_eq!(parse_shell_id(selector_only).unwrap(), "BEEF");

        assert!(matches!(parse_shell_id("<s:Body/>"), Err(SessionError::Transport(_))));
    }

    #[test]
    fn test_parse_command_id() {
        let body = "<rsp:CommandResponse><rsp:CommandId>CMD-42</rsp:CommandId></rsp:CommandResponse>";
        assert_eq!(parse_command_id(body).unwrap(), "CMD-42");
    }

    #[test]
    fn test_parse_receive_running() {
        // "hello" / "oops"
        let body = r#"<rsp:ReceiveResponse><rsp:Stream Name="stdout" CommandId="C">aGVsbG8=</rsp:Stream><rsp:Stream Name="stderr" CommandId="C">b29wcw==</rsp:Stream><rsp:CommandState CommandId="C" State="http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Running"></rsp:CommandState></rsp:ReceiveResponse>"#;
        let chunk = parse_receive(body).unwrap();
        assert_eq!(chunk.stdout, b"hello");
        assert_eq!(chunk.stderr, b"oops");
        assert!(!chunk.done);
        assert_eq!(chunk.exit_code, None);
    }

    #[test]
    fn test_parse_receive_done_with_exit_code() {
        let body = r#"<rsp:ReceiveResponse><rsp:Stream Name="stdout" CommandId="C">T0s=</rsp:Stream><rsp:Stream Name="stdout" CommandId="C" End="true"></rsp:Stream><rsp:Stream Name="stderr" CommandId="C" End="true"/><rsp:CommandState CommandId="C" State="http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Done"><rsp:ExitCode>3</rsp:ExitCode></rsp:CommandState></rsp:ReceiveResponse>"#;
        let chunk = parse_receive(body).unwrap();
        assert_eq!(chunk.stdout, b"OK");
        assert!(chunk.stderr.is_empty());
        assert!(chunk.done);
        assert_eq!(chunk.exit_code, Some(3));
    }

    #[test]
    fn test_parse_receive_done_without_exit_code() {
        let body = r#"<rsp:CommandState CommandId="C" State="http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Done"/>"#;
        let chunk = parse_receive(body).unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.exit_code, None);
    }

    #[test]
    fn test_parse_receive_wraps_dword_exit_codes() {
        let body = r#"<rsp:CommandState State=".../CommandState/Done"><rsp:ExitCode>4294967295</rsp:ExitCode></rsp:CommandState>"#;
        assert_eq!(parse_receive(body).unwrap().exit_code, Some(-1));
    }

    #[test]
    fn test_parse_receive_rejects_bad_base64() {
        let body = r#"<rsp:Stream Name="stdout" CommandId="C">!!!</rsp:Stream>"#;
        assert!(matches!(parse_receive(body), Err(SessionError::Transport(_))));
    }

    #[test]
    fn test_parse_fault_operation_timeout() {
        let body = r#"<s:Envelope><s:Body><s:Fault><s:Code><s:Value>s:Receiver</s:Value></s:Code><s:Reason><s:Text xml:lang="en-US">The WS-Management service cannot complete the operation within the time specified in OperationTimeout.  </s:Text></s:Reason><s:Detail><f:WSManFault xmlns:f="http://schemas.microsoft.com/wbem/wsman/1/wsmanfault" Code="2150858793" Machine="winbox"><f:Message>timeout</f:Message></f:WSManFault></s:Detail></s:Fault></s:Body></s:Envelope>"#;
        let fault = parse_fault(body).unwrap();
        assert!(fault.is_operation_timeout());
        assert!(fault.reason.starts_with("The WS-Management service cannot complete"));
    }

    #[test]
    fn test_parse_fault_absent() {
        assert_eq!(parse_fault("<html>Bad Gateway</html>"), None);
    }
}
