use base64::prelude::*;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use rwinrm_logging::{log_request, log_response};
use rwinrm_types::{CertValidation, Credentials, Encryption, SessionError, TransportKind};
use std::error::Error as _;
use std::time::Duration;
use tokio::sync::Mutex;

use super::encryption::{is_encrypted, seal_envelope, unseal_body, ENCRYPTED_CONTENT_TYPE};
use super::response::{parse_fault, Fault};
use crate::ntlm::{NtlmCredentials, SessionSecurity};
use crate::HTTP_TIMEOUT_SECS;

const SOAP_CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";
const NEGOTIATE_SCHEME: &str = "Negotiate";

/// Result of a SOAP exchange that reached the service
#[derive(Debug)]
pub enum Reply {
    Body(String),
    Fault(Fault),
}

impl Reply {
    /// The body of a successful reply; faults become transport errors
    pub fn into_body(self) -> Result<String, SessionError> {
        match self {
            Reply::Body(body) => Ok(body),
            Reply::Fault(fault) => Err(SessionError::Transport(fault.to_string())),
        }
    }
}

enum Auth {
    /// Precomputed `Authorization` header sent with every request
    Basic(String),
    Negotiate(Negotiate),
}

/// Connection-bound NTLM context carried in the HTTP `Negotiate` scheme
///
/// The context is established lazily by the first request and replaced when
/// the server answers 401 to an authenticated request.
struct Negotiate {
    credentials: NtlmCredentials,
    seal: bool,
    context: Mutex<Option<SessionSecurity>>,
}

/// HTTP carrier for WS-Management envelopes
pub struct WsmanClient {
    http: reqwest::Client,
    endpoint: String,
    auth: Auth,
    username: String,
    verbose: bool,
}

impl WsmanClient {
    pub fn new(
        endpoint: String,
        credentials: &Credentials,
        transport: TransportKind,
        encryption: Encryption,
        cert_validation: CertValidation,
        verbose: bool,
    ) -> Result<Self, SessionError> {
        // One pooled HTTP/1.1 connection keeps the NTLM context alive
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(cert_validation == CertValidation::Ignore)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .pool_max_idle_per_host(1)
            .http1_only()
            .build()
            .map_err(|e| SessionError::ConnectionSetup(format!("cannot build HTTP client: {}", e)))?;

        let auth = match transport {
            TransportKind::Basic => {
                let token = BASE64_STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
                Auth::Basic(format!("Basic {}", token))
            }
            // Without a ticket source SPNEGO falls back to NTLM for Kerberos too
            TransportKind::Ntlm | TransportKind::Kerberos => Auth::Negotiate(Negotiate {
                credentials: NtlmCredentials::new(&credentials.username, &credentials.password),
                seal: encryption == Encryption::Plaintext,
                context: Mutex::new(None),
            }),
        };

        Ok(Self {
            http,
            endpoint,
            auth,
            username: credentials.username.clone(),
            verbose,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST one envelope and classify the reply
    pub async fn send(&self, action: &str, envelope: String) -> Result<Reply, SessionError> {
        let negotiate = match &self.auth {
            Auth::Basic(header) => {
                let (status, body) = self.post(action, Some(header.as_str()), &envelope, None).await?;
                return self.classify(status, body);
            }
            Auth::Negotiate(negotiate) => negotiate,
        };

        // Held for the whole exchange: sealed messages are numbered in order
        let mut context = negotiate.context.lock().await;
        let mut fresh = false;
        if context.is_none() {
            *context = Some(self.handshake(negotiate).await?);
            fresh = true;
        }

        loop {
            let security = if negotiate.seal { context.as_mut() } else { None };
            let (status, body) = self.post(action, None, &envelope, security).await?;

            if status != StatusCode::UNAUTHORIZED || fresh {
                return self.classify(status, body);
            }

            // The server dropped the connection the context was bound to
            *context = Some(self.handshake(negotiate).await?);
            fresh = true;
        }
    }

    async fn post(
        &self,
        action: &str,
        authorization: Option<&str>,
        envelope: &str,
        security: Option<&mut SessionSecurity>,
    ) -> Result<(StatusCode, String), SessionError> {
        log_request(&self.endpoint, action, authorization, envelope, self.verbose);

        let mut security = security;
        let mut request = self.http.post(&self.endpoint);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let request = match security.as_deref_mut() {
            Some(security) => request
                .header(CONTENT_TYPE, ENCRYPTED_CONTENT_TYPE)
                .body(seal_envelope(security, envelope)),
            None => request.header(CONTENT_TYPE, SOAP_CONTENT_TYPE).body(envelope.to_string()),
        };

        let response = request.send().await.map_err(|e| transport_error(&self.endpoint, e))?;

        let status = response.status();
        let sealed_reply = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_encrypted);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(&self.endpoint, e))?;

        let body = match security {
            Some(security) if sealed_reply => unseal_body(security, &bytes)?,
            _ => String::from_utf8_lossy(&bytes).into_owned(),
        };

        log_response(status, &body, self.verbose);
        Ok((status, body))
    }

    fn classify(&self, status: StatusCode, body: String) -> Result<Reply, SessionError> {
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.rejected());
        }

        if status.is_success() {
            return Ok(Reply::Body(body));
        }

        match parse_fault(&body) {
            Some(fault) => Ok(Reply::Fault(fault)),
            None => Err(SessionError::Transport(format!(
                "unexpected HTTP status {} from {}",
                status, self.endpoint
            ))),
        }
    }

    /// Run the NEGOTIATE / CHALLENGE / AUTHENTICATE round trip on empty POSTs
    async fn handshake(&self, negotiate: &Negotiate) -> Result<SessionSecurity, SessionError> {
        let opening = negotiate.credentials.negotiate();
        let (status, headers) = self.authorize("NTLM negotiate", &opening).await?;

        if status != StatusCode::UNAUTHORIZED {
            return Err(SessionError::Authentication(format!(
                "expected an NTLM challenge from {}, got HTTP status {}",
                self.endpoint, status
            )));
        }
        let challenge = challenge_token(&headers).ok_or_else(|| {
            SessionError::Authentication(format!("{} does not offer Negotiate authentication", self.endpoint))
        })?;

        let authenticated = negotiate
            .credentials
            .authenticate(&opening, &challenge)
            .map_err(|e| SessionError::Authentication(format!("bad NTLM challenge: {}", e)))?;

        if negotiate.seal && !authenticated.can_seal {
            return Err(SessionError::ConnectionSetup(
                "the server does not support message encryption over HTTP; use --ssl=ssl".to_string(),
            ));
        }

        let (status, _) = self.authorize("NTLM authenticate", &authenticated.token).await?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.rejected());
        }

        Ok(authenticated.security)
    }

    /// Send one handshake token; the body is drained so the connection is reused
    async fn authorize(&self, step: &str, token: &[u8]) -> Result<(StatusCode, HeaderMap), SessionError> {
        let header = format!("{} {}", NEGOTIATE_SCHEME, BASE64_STANDARD.encode(token));
        log_request(&self.endpoint, step, Some(&header), "", self.verbose);

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, header)
            .body("")
            .send()
            .await
            .map_err(|e| transport_error(&self.endpoint, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&self.endpoint, e))?;

        log_response(status, &body, self.verbose);
        Ok((status, headers))
    }

    fn rejected(&self) -> SessionError {
        SessionError::Authentication(format!("the server rejected the credentials for '{}'", self.username))
    }
}

/// Decode the token of a `WWW-Authenticate: Negotiate <base64>` header
fn challenge_token(headers: &HeaderMap) -> Option<Vec<u8>> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split_once(' '))
        .find(|(scheme, _)| scheme.eq_ignore_ascii_case(NEGOTIATE_SCHEME) || scheme.eq_ignore_ascii_case("NTLM"))
        .and_then(|(_, token)| BASE64_STANDARD.decode(token.trim()).ok())
}

fn transport_error(endpoint: &str, error: reqwest::Error) -> SessionError {
    let kind = if error.is_timeout() {
        "request timed out"
    } else if error.is_connect() {
        "cannot connect"
    } else {
        "request failed"
    };

    // reqwest keeps the useful detail (DNS, TLS, refused) in the source chain
    let mut detail = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }

    SessionError::Transport(format!("{} to {} ({})", kind, endpoint, detail))
}
