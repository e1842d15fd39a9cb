use crate::prelude::*;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;

/// External tools are not trusted to terminate on their own. A stuck
/// invocation is killed after this long (`kill_on_drop` below reaps it).
const TOOL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub(crate) enum ProcessError {
    #[error("`{program}` is not installed on this host")]
    NotFound { program: String },

    #[error("Failed to invoke `{program}`")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} invocation failed with status {status}. Command:\n{command}\nStderr:\n{stderr}")]
    BadExitStatus {
        program: String,
        status: ExitStatus,
        command: String,
        stderr: String,
    },

    #[error("{program} did not finish within {TOOL_TIMEOUT:?}. Command:\n{command}")]
    TimedOut { program: String, command: String },
}

pub(crate) async fn run(program: &str, args: &[&str]) -> Result<Vec<u8>, ProcessError> {
    let display_cmd = format!("{program} {}", shlex::join(args.iter().copied()));
    debug!(
        cmd = %display_cmd,
        "Running program"
    );

    let invocation = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(TOOL_TIMEOUT, invocation)
        .await
        .map_err(|_elapsed| ProcessError::TimedOut {
            program: program.to_owned(),
            command: display_cmd.clone(),
        })?
        .map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ProcessError::NotFound {
                    program: program.to_owned(),
                }
            } else {
                ProcessError::Spawn {
                    program: program.to_owned(),
                    source,
                }
            }
        })?;

    let status = output.status;

    if !status.success() {
        return Err(ProcessError::BadExitStatus {
            program: program.to_owned(),
            status,
            command: display_cmd,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test_log::test(tokio::test)]
    async fn missing_program_is_reported_as_not_found() {
        let result = run("definitely-not-a-real-program-5bdf91", &[]).await;
        assert_matches!(result, Err(ProcessError::NotFound { .. }));
    }
}
