//! ImageMagick-backed probe and converter.

use crate::adapters::staging::StagedFile;
use crate::domain::model::ProbeResult;
use crate::domain::ports::{CommandSpec, FormatConverter, ImageProbe, ProcessRunner};
use crate::utils::error::{Result, UpscaleError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The ImageMagick entry point: `magick` for v7, `convert` for v6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagickCommand {
    parts: Vec<OsString>,
}

impl MagickCommand {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Prefers `magick` when it is on `PATH`.
    pub fn detect() -> Self {
        if find_on_path("magick").is_some() {
            Self::new(["magick"])
        } else {
            Self::new(["convert"])
        }
    }

    fn command(&self) -> CommandSpec {
        match self.parts.split_first() {
            Some((program, rest)) => CommandSpec::new(program.clone()).args(rest.iter().cloned()),
            None => CommandSpec::new("magick"),
        }
    }
}

pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{}.exe", name));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Parses `"<width> <height> <FORMAT>"` as printed by `-format "%w %h %m"`.
pub fn parse_identify(stdout: &str) -> Option<ProbeResult> {
    let mut fields = stdout.split_whitespace();
    let width = fields.next()?.parse::<u32>().ok()?;
    let height = fields.next()?.parse::<u32>().ok()?;
    let format = fields.next()?;
    Some(ProbeResult::new(width, height, format))
}

pub struct MagickProbe {
    runner: Arc<dyn ProcessRunner>,
    magick: MagickCommand,
}

impl MagickProbe {
    pub fn new(runner: Arc<dyn ProcessRunner>, magick: MagickCommand) -> Self {
        Self { runner, magick }
    }
}

#[async_trait]
impl ImageProbe for MagickProbe {
    fn name(&self) -> &'static str {
        "magick"
    }

    async fn probe(&self, path: &Path) -> Result<ProbeResult> {
        let failure = |message: String| UpscaleError::ProbeFailure {
            path: path.display().to_string(),
            message,
        };

        // Only the first frame, so animations report a single size.
        let mut first_frame = path.as_os_str().to_os_string();
        first_frame.push("[0]");
        let cmd = self
            .magick
            .command()
            .arg(first_frame)
            .args(["-format", "%w %h %m", "info:"]);

        let output = self
            .runner
            .run(&cmd, None)
            .await
            .map_err(|e| failure(e.to_string()))?;
        if !output.success() {
            return Err(failure(output.failure_summary()));
        }

        parse_identify(&output.stdout)
            .ok_or_else(|| failure(format!("unrecognized output '{}'", output.stdout.trim())))
    }
}

pub struct MagickConverter {
    runner: Arc<dyn ProcessRunner>,
    magick: MagickCommand,
}

impl MagickConverter {
    pub fn new(runner: Arc<dyn ProcessRunner>, magick: MagickCommand) -> Self {
        Self { runner, magick }
    }
}

#[async_trait]
impl FormatConverter for MagickConverter {
    fn name(&self) -> &'static str {
        "magick"
    }

    async fn convert_to_png(&self, source: &Path, destination: &Path) -> Result<()> {
        let staged = StagedFile::beside(destination)?;

        // A multi-frame source would otherwise be split into numbered PNG siblings.
        let mut first_frame = source.as_os_str().to_os_string();
        first_frame.push("[0]");
        let mut target = OsString::from("png:");
        target.push(staged.path().as_os_str());
        let cmd = self.magick.command().arg(first_frame).arg(target);

        let output = self.runner.run(&cmd, None).await.map_err(|e| {
            UpscaleError::ConversionFailure {
                message: e.to_string(),
            }
        })?;
        if !output.success() {
            return Err(UpscaleError::ConversionFailure {
                message: output.failure_summary(),
            });
        }

        staged.persist(destination)
    }
}
