use clap::Parser;
use rwinrm_types::{CertValidation, Encryption, ShellMode, TransportKind};

/// CLI arguments for rwinrm
#[derive(Parser, Debug)]
#[command(name = "rwinrm")]
#[command(about = "Interactive console for remote Windows hosts over WinRM")]
#[command(version)]
pub struct Cli {
    /// Remote user name (prompted when omitted)
    #[arg(long, value_name = "USER")]
    pub user: Option<String>,

    /// Remote password (prompted without echo when omitted)
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Authentication scheme: ntlm, kerberos or basic
    #[arg(long, value_name = "T", default_value = "ntlm")]
    pub transport: TransportKind,

    /// Channel encryption: ssl or plaintext
    #[arg(long, value_name = "S", default_value = "ssl")]
    pub ssl: Encryption,

    /// Server certificate policy: validate or ignore
    #[arg(long = "server_cert_validation", value_name = "V", default_value = "validate")]
    pub server_cert_validation: CertValidation,

    /// Encoding of remote output as a WHATWG label, e.g. utf-8 or windows-1252
    /// (defaults to the terminal's encoding; DOS code pages like cp437 are not accepted)
    #[arg(long, value_name = "E")]
    pub encoding: Option<String>,

    /// Remote shell: cmd or powershell
    #[arg(long, value_name = "SH", default_value = "cmd")]
    pub shell: ShellMode,

    /// Run one command, print its result and exit with its exit code
    #[arg(long, value_name = "CMD")]
    pub run: Option<String>,

    /// Print every WS-Management request and response to stderr
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,

    /// Target host: host, host:port or a full endpoint URL
    pub host: String,
}
