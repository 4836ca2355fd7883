//! Small extensions over `std::process::Command`
//!
//! Every external tool this program drives follows the same contract: run
//! to completion, capture stdout and stderr, and on non-zero exit surface
//! the captured output to the operator verbatim.

use std::process::{Command, Output};

/// Captured stdout and stderr joined for diagnostics, empty streams skipped.
fn collect_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    [stdout.trim(), stderr.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

/// Synchronous invocation helpers shared by all external tool calls.
pub trait CommandRunExt {
    /// Run to completion capturing output; a non-zero exit becomes an error
    /// carrying the captured output.
    fn run_captured(&mut self) -> std::io::Result<Output>;
}

impl CommandRunExt for Command {
    fn run_captured(&mut self) -> std::io::Result<Output> {
        let output = self.output()?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!(
                    "command exited with status {}: {}",
                    output.status,
                    collect_output(&output)
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_captured_success() {
        let output = Command::new("true").run_captured().unwrap();
        assert!(output.status.success());
    }

    #[test]
    fn test_run_captured_failure_carries_output() {
        let err = Command::new("sh")
            .args(["-c", "echo oops >&2; exit 3"])
            .run_captured()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("oops"), "missing captured stderr: {msg}");
        assert!(msg.contains("status"), "missing exit status: {msg}");
    }
}
