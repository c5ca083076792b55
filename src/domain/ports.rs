use crate::domain::model::ProbeResult;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Reads width, height and format from an image file.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    fn name(&self) -> &'static str;
    async fn probe(&self, path: &Path) -> Result<ProbeResult>;
}

/// Rewrites an image file as PNG.
#[async_trait]
pub trait FormatConverter: Send + Sync {
    fn name(&self) -> &'static str;
    async fn convert_to_png(&self, source: &Path, destination: &Path) -> Result<()>;
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Lossy rendering for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short failure description including the tail of stderr.
    pub fn failure_summary(&self) -> String {
        let status = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            status
        } else {
            let tail: Vec<&str> = stderr.lines().rev().take(3).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            format!("{}: {}", status, tail.join(" | "))
        }
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' did not finish within {:.3}s", deadline.as_secs_f64())]
    TimedOut { program: String, deadline: Duration },

    #[error("failed waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs an external program to completion, optionally bounded by a deadline.
///
/// The deadline clock starts once the process has been spawned. A process still running
/// when it elapses is killed and the call returns [`RunError::TimedOut`].
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        command: &CommandSpec,
        deadline: Option<Duration>,
    ) -> std::result::Result<ProcessOutput, RunError>;
}
