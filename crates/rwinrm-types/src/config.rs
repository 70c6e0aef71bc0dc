use anyhow::Result;
use encoding_rs::Encoding;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Transport selection
// ============================================================================

/// Authentication scheme used against the WS-Management endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Ntlm,
    Kerberos,
    Basic,
}

impl Default for TransportKind {
    fn default() -> Self {
        Self::Ntlm
    }
}

impl FromStr for TransportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ntlm" => Ok(Self::Ntlm),
            "kerberos" => Ok(Self::Kerberos),
            "basic" => Ok(Self::Basic),
            _ => Err(anyhow::anyhow!(
                "Invalid transport: '{}'. Valid options: 'ntlm', 'kerberos', 'basic'",
                s
            )),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ntlm => write!(f, "ntlm"),
            Self::Kerberos => write!(f, "kerberos"),
            Self::Basic => write!(f, "basic"),
        }
    }
}

/// Server certificate validation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CertValidation {
    Validate,
    Ignore,
}

impl Default for CertValidation {
    fn default() -> Self {
        Self::Validate
    }
}

impl FromStr for CertValidation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "validate" => Ok(Self::Validate),
            "ignore" => Ok(Self::Ignore),
            _ => Err(anyhow::anyhow!(
                "Invalid server certificate validation: '{}'. Valid options: 'validate', 'ignore'",
                s
            )),
        }
    }
}

impl fmt::Display for CertValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validate => write!(f, "validate"),
            Self::Ignore => write!(f, "ignore"),
        }
    }
}

/// Channel encryption: TLS or plain HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    Ssl,
    Plaintext,
}

impl Default for Encryption {
    fn default() -> Self {
        Self::Ssl
    }
}

impl FromStr for Encryption {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ssl" => Ok(Self::Ssl),
            "plaintext" => Ok(Self::Plaintext),
            _ => Err(anyhow::anyhow!(
                "Invalid ssl mode: '{}'. Valid options: 'ssl', 'plaintext'",
                s
            )),
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssl => write!(f, "ssl"),
            Self::Plaintext => write!(f, "plaintext"),
        }
    }
}

// ============================================================================
// Shell mode
// ============================================================================

/// Which remote interpreter receives single-line input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellMode {
    /// cmd.exe, invoked with a command token and positional arguments
    Native,
    /// PowerShell, invoked with a whole script body
    Scripting,
}

impl Default for ShellMode {
    fn default() -> Self {
        Self::Native
    }
}

impl FromStr for ShellMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cmd" => Ok(Self::Native),
            "powershell" => Ok(Self::Scripting),
            _ => Err(anyhow::anyhow!(
                "Invalid shell: '{}'. Valid options: 'cmd', 'powershell'",
                s
            )),
        }
    }
}

impl fmt::Display for ShellMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "cmd"),
            Self::Scripting => write!(f, "powershell"),
        }
    }
}

// ============================================================================
// Configuration record
// ============================================================================

/// Username and password for the remote endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything the console needs, resolved once at startup and never mutated
#[derive(Debug, Clone)]
pub struct Configuration {
    pub host: String,
    pub credentials: Credentials,
    pub transport: TransportKind,
    pub cert_validation: CertValidation,
    pub encryption: Encryption,
    pub shell: ShellMode,
    pub encoding: &'static Encoding,
    /// When present the REPL is skipped entirely
    pub run: Option<String>,
    pub verbose: bool,
}

impl Configuration {
    pub fn is_one_shot(&self) -> bool {
        self.run.is_some()
    }
}
