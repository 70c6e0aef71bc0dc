use base64::prelude::*;
use rwinrm_session::wsman::envelope::{ACTION_COMMAND, ACTION_CREATE, ACTION_DELETE, ACTION_RECEIVE, ACTION_SIGNAL};
use rwinrm_types::{CertValidation, Configuration, Credentials, Encryption, ShellMode, TransportKind};
use wiremock::matchers::*;
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const SHELL_ID: &str = "0C5F3A52-7B1D-4E0A-9C2B-5D1E2F3A4B5C";
pub const COMMAND_ID: &str = "A1B2C3D4-0000-1111-2222-333344445555";

/// Flags a Windows server answers with when it accepts sealing
pub const SERVER_FLAGS: u32 = 0xE288_8235;

const SOAP_CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";

/// Mock WinRM service speaking just enough WS-Management for one command
pub struct WinRmMockServer {
    server: MockServer,
}

impl WinRmMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/wsman", self.server.uri())
    }

    /// Session configuration pointed at this server
    pub fn config(&self, transport: TransportKind, encryption: Encryption) -> Configuration {
        Configuration {
            host: self.endpoint(),
            credentials: Credentials::new("CORP\\admin", "secret"),
            transport,
            cert_validation: CertValidation::Validate,
            encryption,
            shell: ShellMode::Native,
            encoding: encoding_rs::UTF_8,
            run: None,
            verbose: false,
        }
    }

    /// Mock every step of a command that prints `stdout`/`stderr` and exits with `exit_code`
    pub async fn mock_command(&self, stdout: &[u8], stderr: &[u8], exit_code: i32) {
        self.mock_action(ACTION_CREATE, 200, &create_response()).await;
        self.mock_action(ACTION_COMMAND, 200, &command_response()).await;
        self.mock_action(ACTION_RECEIVE, 200, &receive_done(stdout, stderr, exit_code))
            .await;
        self.mock_action(ACTION_SIGNAL, 200, &empty_response()).await;
        self.mock_action(ACTION_DELETE, 200, &empty_response()).await;
    }

    /// Answer requests carrying `action` with a fixed status and body
    pub async fn mock_action(&self, action: &str, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path("/wsman"))
            .and(body_string_contains(action_element(action)))
            .respond_with(soap(status, body))
            .mount(&self.server)
            .await;
    }

    /// Like `mock_action`, but only for the first `times` matching requests
    pub async fn mock_action_once(&self, action: &str, status: u16, body: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path("/wsman"))
            .and(body_string_contains(action_element(action)))
            .respond_with(soap(status, body))
            .up_to_n_times(times)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Reject every request with 401
    pub async fn mock_unauthorized(&self) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&self.server)
            .await;
    }

    /// Mock the NTLM handshake: challenge the NEGOTIATE token, accept the AUTHENTICATE one
    pub async fn mock_ntlm_handshake(&self, accept: bool) {
        let challenge = format!("Negotiate {}", BASE64_STANDARD.encode(challenge_message(SERVER_FLAGS)));
        Mock::given(method("POST"))
            .and(header_regex("authorization", "^Negotiate TlRMTVNTUAAB"))
            .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", challenge.as_str()))
            .with_priority(1)
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(header_regex("authorization", "^Negotiate TlRMTVNTUAAD"))
            .respond_with(ResponseTemplate::new(if accept { 200 } else { 401 }))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Answer sealed requests with a status and an empty body
    pub async fn mock_sealed(&self, status: u16) {
        Mock::given(method("POST"))
            .and(header_regex("content-type", "^multipart/encrypted"))
            .respond_with(ResponseTemplate::new(status))
            .with_priority(2)
            .mount(&self.server)
            .await;
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Actions of the SOAP requests received so far, in order
    pub async fn actions(&self) -> Vec<&'static str> {
        self.requests()
            .await
            .iter()
            .filter_map(|request| {
                let body = String::from_utf8_lossy(&request.body).into_owned();
                [ACTION_CREATE, ACTION_COMMAND, ACTION_RECEIVE, ACTION_SIGNAL, ACTION_DELETE]
                    .into_iter()
                    .find(|action| body.contains(&action_element(action)))
            })
            .collect()
    }

    /// Number of requests whose Authorization header starts with `prefix`
    pub async fn authorizations(&self, prefix: &str) -> usize {
        self.requests()
            .await
            .iter()
            .filter(|request| {
                request
                    .headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .is_some_and(|value| value.starts_with(prefix))
            })
            .count()
    }
}

fn action_element(action: &str) -> String {
    format!(">{}</a:Action>", action)
}

fn soap(status: u16, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.to_string(), SOAP_CONTENT_TYPE)
}

pub fn create_response() -> String {
    format!(
        r#"<s:Envelope><s:Body><x:ResourceCreated><a:ReferenceParameters><w:SelectorSet><w:Selector Name="ShellId">{0}</w:Selector></w:SelectorSet></a:ReferenceParameters></x:ResourceCreated><rsp:Shell><rsp:ShellId>{0}</rsp:ShellId></rsp:Shell></s:Body></s:Envelope>"#,
        SHELL_ID
    )
}

pub fn command_response() -> String {
    format!(
        "<s:Envelope><s:Body><rsp:CommandResponse><rsp:CommandId>{}</rsp:CommandId></rsp:CommandResponse></s:Body></s:Envelope>",
        COMMAND_ID
    )
}

pub fn receive_done(stdout: &[u8], stderr: &[u8], exit_code: i32) -> String {
    format!(
        r#"<s:Envelope><s:Body><rsp:ReceiveResponse><rsp:Stream Name="stdout" CommandId="{id}">{out}</rsp:Stream><rsp:Stream Name="stderr" CommandId="{id}">{err}</rsp:Stream><rsp:CommandState CommandId="{id}" State="http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Done"><rsp:ExitCode>{code}</rsp:ExitCode></rsp:CommandState></rsp:ReceiveResponse></s:Body></s:Envelope>"#,
        id = COMMAND_ID,
        out = BASE64_STANDARD.encode(stdout),
        err = BASE64_STANDARD.encode(stderr),
        code = exit_code
    )
}

pub fn empty_response() -> String {
    "<s:Envelope><s:Body/></s:Envelope>".to_string()
}

pub fn fault_response(code: &str, message: &str) -> String {
    format!(
        r#"<s:Envelope><s:Body><s:Fault><s:Code><s:Value>s:Receiver</s:Value></s:Code><s:Reason><s:Text xml:lang="en-US">{1}</s:Text></s:Reason><s:Detail><f:WSManFault xmlns:f="http://schemas.microsoft.com/wbem/wsman/1/wsmanfault" Code="{0}" Machine="winbox"><f:Message>{1}</f:Message></f:WSManFault></s:Detail></s:Fault></s:Body></s:Envelope>"#,
        code, message
    )
}

/// A CHALLENGE message with a domain name and a timestamp in its target info
pub fn challenge_message(flags: u32) -> Vec<u8> {
    let mut target_info = Vec::new();
    let domain: Vec<u8> = "CORP".encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect();
    target_info.extend_from_slice(&2u16.to_le_bytes());
    target_info.extend_from_slice(&(domain.len() as u16).to_le_bytes());
    target_info.extend_from_slice(&domain);
    target_info.extend_from_slice(&7u16.to_le_bytes());
    target_info.extend_from_slice(&8u16.to_le_bytes());
    target_info.extend_from_slice(&132_223_104_000_000_000u64.to_le_bytes());
    target_info.extend_from_slice(&[0, 0, 0, 0]);

    let mut message = Vec::new();
    message.extend_from_slice(b"NTLMSSP\0");
    message.extend_from_slice(&2u32.to_le_bytes());
    // empty target name
    message.extend_from_slice(&[0, 0, 0, 0]);
    message.extend_from_slice(&48u32.to_le_bytes());
    message.extend_from_slice(&flags.to_le_bytes());
    message.extend_from_slice(&[0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef]);
    message.extend_from_slice(&[0; 8]);
    message.extend_from_slice(&(target_info.len() as u16).to_le_bytes());
    message.extend_from_slice(&(target_info.len() as u16).to_le_bytes());
    message.extend_from_slice(&48u32.to_le_bytes());
    message.extend_from_slice(&target_info);
    message
}
