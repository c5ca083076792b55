use crate::domain::ports::{CommandSpec, ProcessOutput, ProcessRunner, RunError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Runs commands with `tokio::process`, capturing stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        deadline: Option<Duration>,
    ) -> Result<ProcessOutput, RunError> {
        let program = command.program.to_string_lossy().into_owned();

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let child = cmd.spawn().map_err(|source| RunError::Spawn {
            program: program.clone(),
            source,
        })?;
        let start = Instant::now();

        // Dropping the wait future on timeout drops the child, which kills it.
        let waited = match deadline {
            Some(deadline) => tokio::time::timeout(deadline, child.wait_with_output())
                .await
                .map_err(|_| RunError::TimedOut {
                    program: program.clone(),
                    deadline,
                })?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| RunError::Wait {
            program: program.clone(),
            source,
        })?;

        let result = ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(
            "{} finished in {}ms with {:?}",
            program,
            start.elapsed().as_millis(),
            result.exit_code
        );
        for line in result.stderr.lines().filter(|l| !l.trim().is_empty()) {
            tracing::debug!("[{}] {}", program, line);
        }

        Ok(result)
    }
}
