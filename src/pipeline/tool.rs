//! External converter invocation.
//!
//! The office suite and the markup converter are opaque programs. Each call
//! is awaited to completion and folded into a [`ToolOutcome`]; the caller
//! decides what a failure means for its stage. Nothing here retries or
//! times out: a hung converter hangs the stage.

use crate::error::ItemError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt kept in a [`ToolOutcome::NonZeroExit`].
const STDERR_LIMIT: usize = 2000;

/// Result of running one external conversion command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolOutcome {
    /// Exit status zero.
    Success,
    /// The program is not installed or not on `PATH`.
    NotFound { program: String },
    /// The program ran and exited unsuccessfully. `code` is `None` when it
    /// was killed by a signal.
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    /// The program could not be started for another reason (permissions, …).
    Failed { program: String, reason: String },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success)
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutcome::Success => f.write_str("success"),
            ToolOutcome::NotFound { program } => {
                write!(f, "'{program}' not found; is it installed and on PATH?")
            }
            ToolOutcome::NonZeroExit {
                program,
                code,
                stderr,
            } => {
                match code {
                    Some(c) => write!(f, "'{program}' exited with status {c}")?,
                    None => write!(f, "'{program}' was terminated by a signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            ToolOutcome::Failed { program, reason } => {
                write!(f, "failed to start '{program}': {reason}")
            }
        }
    }
}

/// Run `program` with `args`, wait for it, and classify the result.
///
/// Stdin is closed and stdout is discarded; stderr is captured so that a
/// failing conversion can be reported with the converter's own message.
pub async fn run_tool<I, S>(program: &str, args: I) -> ToolOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    debug!("Running {:?}", cmd.as_std());

    let output = match cmd.output().await {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return ToolOutcome::NotFound {
                program: program.to_string(),
            };
        }
        Err(e) => {
            return ToolOutcome::Failed {
                program: program.to_string(),
                reason: e.to_string(),
            };
        }
    };

    if output.status.success() {
        return ToolOutcome::Success;
    }

    let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.len() > STDERR_LIMIT {
        let mut cut = STDERR_LIMIT;
        while !stderr.is_char_boundary(cut) {
            cut -= 1;
        }
        stderr.truncate(cut);
        stderr.push('\u{2026}');
    }

    ToolOutcome::NonZeroExit {
        program: program.to_string(),
        code: output.status.code(),
        stderr,
    }
}

/// Run one conversion of `file` that is expected to create `expected`.
///
/// A clean exit that leaves no output file is still a failure: office
/// suites exit 0 when another instance swallowed the request.
pub(crate) async fn convert_file<I, S>(
    program: &str,
    args: I,
    file: &Path,
    expected: &Path,
) -> Result<(), ItemError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    match run_tool(program, args).await {
        ToolOutcome::Success if expected.exists() => {
            debug!("Wrote {}", expected.display());
            Ok(())
        }
        ToolOutcome::Success => Err(ItemError::MissingOutput {
            file: file.to_path_buf(),
            expected: expected.to_path_buf(),
        }),
        outcome => Err(ItemError::Tool {
            file: file.to_path_buf(),
            outcome,
        }),
    }
}
