use std::borrow::Cow;

use crate::{MAX_ENVELOPE_SIZE, OPERATION_TIMEOUT_SECS};

pub const ACTION_CREATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Create";
pub const ACTION_DELETE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Delete";
pub const ACTION_COMMAND: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Command";
pub const ACTION_RECEIVE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Receive";
pub const ACTION_SIGNAL: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Signal";

const RESOURCE_URI_CMD: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/cmd";
const SIGNAL_TERMINATE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/signal/terminate";
const ANONYMOUS_ADDRESS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

const NAMESPACES: &str = concat!(
    r#"xmlns:env="http://www.w3.org/2003/05/soap-envelope" "#,
    r#"xmlns:a="http://schemas.xmlsoap.org/ws/2004/08/addressing" "#,
    r#"xmlns:w="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd" "#,
    r#"xmlns:p="http://schemas.microsoft.com/wbem/wsman/1/wsman.xsd" "#,
    r#"xmlns:rsp="http://schemas.microsoft.com/wbem/wsman/1/windows/shell""#,
);

/// Escape text for use in XML element content or attribute values
pub fn xml_escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn envelope(endpoint: &str, action: &str, shell_id: Option<&str>, options: &[(&str, String)], body: &str) -> String {
    let mut header = String::new();
    header.push_str(&format!("<a:To>{}</a:To>", xml_escape(endpoint)));
    header.push_str(&format!(
        r#"<a:ReplyTo><a:Address env:mustUnderstand="true">{}</a:Address></a:ReplyTo>"#,
        ANONYMOUS_ADDRESS
    ));
    header.push_str(&format!(
        r#"<w:MaxEnvelopeSize env:mustUnderstand="true">{}</w:MaxEnvelopeSize>"#,
        MAX_ENVELOPE_SIZE
    ));
    header.push_str(&format!("<a:MessageID>uuid:{}</a:MessageID>", uuid::Uuid::new_v4().to_string().to_uppercase()));
    header.push_str(r#"<w:Locale env:mustUnderstand="false" xml:lang="en-US"/>"#);
    header.push_str(r#"<p:DataLocale env:mustUnderstand="false" xml:lang="en-US"/>"#);
    header.push_str(&format!("<w:OperationTimeout>PT{}S</w:OperationTimeout>", OPERATION_TIMEOUT_SECS));
    header.push_str(&format!(
        r#"<w:ResourceURI env:mustUnderstand="true">{}</w:ResourceURI>"#,
        RESOURCE_URI_CMD
    ));
    header.push_str(&format!(r#"<a:Action env:mustUnderstand="true">{}</a:Action>"#, action));

    if let Some(id) = shell_id {
        header.push_str(&format!(
            r#"<w:SelectorSet><w:Selector Name="ShellId">{}</w:Selector></w:SelectorSet>"#,
            xml_escape(id)
        ));
    }

    if !options.is_empty() {
        header.push_str("<w:OptionSet>");
        for (name, value) in options {
            header.push_str(&format!(r#"<w:Option Name="{}">{}</w:Option>"#, name, xml_escape(value)));
        }
        header.push_str("</w:OptionSet>");
    }

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><env:Envelope {}><env:Header>{}</env:Header><env:Body>{}</env:Body></env:Envelope>"#,
        NAMESPACES, header, body
    )
}

/// Open a cmd shell with the given console code page
pub fn create_shell(endpoint: &str, codepage: u32) -> String {
    let options = [
        ("WINRS_NOPROFILE", "FALSE".to_string()),
        ("WINRS_CODEPAGE", codepage.to_string()),
    ];
    let body = "<rsp:Shell><rsp:InputStreams>stdin</rsp:InputStreams><rsp:OutputStreams>stdout stderr</rsp:OutputStreams></rsp:Shell>";
    envelope(endpoint, ACTION_CREATE, None, &options, body)
}

/// Start `command args...` in an open shell
pub fn command(endpoint: &str, shell_id: &str, command: &str, args: &[&str]) -> String {
    let options = [
        ("WINRS_CONSOLEMODE_STDIN", "TRUE".to_string()),
        ("WINRS_SKIP_CMD_SHELL", "FALSE".to_string()),
    ];
    let mut body = format!("<rsp:CommandLine><rsp:Command>{}</rsp:Command>", xml_escape(command));
    for arg in args {
        body.push_str(&format!("<rsp:Arguments>{}</rsp:Arguments>", xml_escape(arg)));
    }
    body.push_str("</rsp:CommandLine>");
    envelope(endpoint, ACTION_COMMAND, Some(shell_id), &options, &body)
}

/// Poll a running command for output
pub fn receive(endpoint: &str, shell_id: &str, command_id: &str) -> String {
    let body = format!(
        r#"<rsp:Receive><rsp:DesiredStream CommandId="{}">stdout stderr</rsp:DesiredStream></rsp:Receive>"#,
        xml_escape(command_id)
    );
    envelope(endpoint, ACTION_RECEIVE, Some(shell_id), &[], &body)
}

/// Terminate a command and release its resources
pub fn signal_terminate(endpoint: &str, shell_id: &str, command_id: &str) -> String {
    let body = format!(
        r#"<rsp:Signal CommandId="{}"><rsp:Code>{}</rsp:Code></rsp:Signal>"#,
        xml_escape(command_id),
        SIGNAL_TERMINATE
    );
    envelope(endpoint, ACTION_SIGNAL, Some(shell_id), &[], &body)
}

/// Close a shell
pub fn delete_shell(endpoint: &str, shell_id: &str) -> String {
    envelope(endpoint, ACTION_DELETE, Some(shell_id), &[], "")
}
