use colored::Colorize;
use encoding_rs::Encoding;
use rwinrm_types::{ConsoleError, ExecutionOutcome, CLIXML_MARKER};
use std::fmt;
use std::io::{self, Write};

/// Printable form of one execution outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedResult {
    /// Decoded standard output
    pub output: Option<String>,
    /// `ERROR ...` line built from the diagnostic stream or exit code
    pub error: Option<String>,
}

impl RenderedResult {
    pub fn is_empty(&self) -> bool {
        self.output.is_none() && self.error.is_none()
    }

    /// Print output as-is and the error line in red
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if let Some(output) = &self.output {
            writeln!(out, "{}", output)?;
        }
        if let Some(error) = &self.error {
            writeln!(out, "{}", error.bright_red())?;
        }
        out.flush()
    }
}

impl fmt::Display for RenderedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<&str> = self.output.iter().chain(self.error.iter()).map(String::as_str).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// Decode one output stream strictly; invalid bytes are an error, not `U+FFFD`
pub fn decode(bytes: &[u8], encoding: &'static Encoding, stream: &'static str) -> Result<String, ConsoleError> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or(ConsoleError::Decode {
            stream,
            encoding: encoding.name(),
        })
}

fn trim_line_breaks(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

/// Map an execution outcome to what the operator sees
///
/// Output is shown whenever present. A nonzero exit code always yields an
/// `ERROR (<code>)` line, with the diagnostic stream appended when non-empty.
/// With exit code zero or absent, the diagnostic stream is shown as
/// `ERROR: <text>` unless it is a CLIXML record stream, which the scripting
/// shell uses for progress and verbose records.
pub fn interpret(
    outcome: Option<&ExecutionOutcome>,
    encoding: &'static Encoding,
) -> Result<Option<RenderedResult>, ConsoleError> {
    let Some(outcome) = outcome else {
        return Ok(None);
    };

    let stdout = decode(&outcome.stdout, encoding, "stdout")?;
    let stdout = trim_line_breaks(&stdout);
    let output = (!stdout.is_empty()).then(|| stdout.to_string());

    let stderr = decode(&outcome.stderr, encoding, "stderr")?;
    // Trailing line breaks are dropped from the diagnostic text as well
    let stderr = trim_line_breaks(&stderr);

    let error = match outcome.exit_code.filter(|_| outcome.is_remote_failure()) {
        Some(code) => {
            if stderr.is_empty() {
                Some(format!("ERROR ({})", code))
            } else {
                Some(format!("ERROR ({}): {}", code, stderr))
            }
        }
        _ if stderr.is_empty() || stderr.starts_with(CLIXML_MARKER) => None,
        _ => Some(format!("ERROR: {}", stderr)),
    };

    let rendered = RenderedResult { output, error };
    Ok((!rendered.is_empty()).then_some(rendered))
}
