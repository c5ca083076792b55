//! Upscale Orchestrator: chooses a fast path, runs the upscaler and cleans up on failure.

use crate::adapters::staging::{staging_dir, StagedFile};
use crate::adapters::waifu2x::Waifu2xCommand;
use crate::domain::model::{OutputOutcome, ProbeResult, ResolvedPlan};
use crate::domain::ports::{FormatConverter, ProcessRunner, RunError};
use crate::utils::error::{Result, UpscaleError};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Formats the upscaler reads directly.
pub const NATIVE_FORMATS: &[&str] = &["png", "jpeg", "webp"];

/// Format every destination is written in.
pub const DESTINATION_FORMAT: &str = "png";

/// Route a run takes after the fast-path check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Alias the destination to the source; no tool runs.
    Symlink,
    /// Convert to PNG and stop.
    ConvertOnly,
    /// Convert to PNG, then upscale the converted file.
    ConvertThenUpscale,
    /// Upscale the source directly.
    Upscale,
}

pub fn choose_route(plan: &ResolvedPlan, probe: &ProbeResult) -> Route {
    let noop = plan.is_noop();
    if noop && probe.format == DESTINATION_FORMAT {
        return Route::Symlink;
    }

    let needs_conversion = noop || !NATIVE_FORMATS.contains(&probe.format.as_str());
    match (needs_conversion, noop) {
        (true, true) => Route::ConvertOnly,
        (true, false) => Route::ConvertThenUpscale,
        (false, _) => Route::Upscale,
    }
}

pub struct Orchestrator {
    converter: Arc<dyn FormatConverter>,
    runner: Arc<dyn ProcessRunner>,
    upscaler: Waifu2xCommand,
}

impl Orchestrator {
    pub fn new(
        converter: Arc<dyn FormatConverter>,
        runner: Arc<dyn ProcessRunner>,
        upscaler: Waifu2xCommand,
    ) -> Self {
        Self {
            converter,
            runner,
            upscaler,
        }
    }

    /// Produces `destination` from `source` according to `plan`.
    ///
    /// `deadline` bounds the upscaler process only. Tool output lands in a staged file
    /// beside `destination` and is renamed over it on success, so a symlink at
    /// `destination` is replaced rather than written through. When a run that converted
    /// the source fails, `destination` is removed; otherwise it is left as it was.
    pub async fn run(
        &self,
        plan: &ResolvedPlan,
        probe: &ProbeResult,
        source: &Path,
        destination: &Path,
        deadline: Option<Duration>,
    ) -> Result<OutputOutcome> {
        let original = probe.resolution();
        let upscaled = original.scaled(plan.scale).ok_or_else(|| {
            UpscaleError::invalid(
                "scale",
                format!("{} scaled by {} overflows", original, plan.scale),
            )
        })?;

        let route = choose_route(plan, probe);
        tracing::debug!("Route for {} ({}): {:?}", source.display(), probe.format, route);

        match route {
            Route::Symlink => {
                link_destination(source, destination).await?;
                tracing::info!("Linked {} -> {}", destination.display(), source.display());
                return Ok(OutputOutcome::Symlinked(original));
            }
            Route::ConvertOnly => {
                let dst_existed = tokio::fs::symlink_metadata(destination).await.is_ok();
                if let Err(e) = self.convert(probe, source, destination).await {
                    if !dst_existed {
                        discard_destination(destination).await;
                    }
                    return Err(e);
                }
                return Ok(OutputOutcome::ConvertedOnly(original));
            }
            Route::ConvertThenUpscale | Route::Upscale => {}
        }

        let converted = if route == Route::ConvertThenUpscale {
            let staged = StagedFile::beside(destination)?;
            self.convert(probe, source, staged.path()).await?;
            Some(staged)
        } else {
            None
        };
        let input = converted.as_ref().map_or(source, |staged| staged.path());

        let output = StagedFile::beside(destination)?;
        let result = match self.upscale(plan, input, output.path(), deadline).await {
            Ok(()) => output.persist(destination),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!("Upscaled {} to {}", original, upscaled);
                Ok(OutputOutcome::Upscaled(upscaled))
            }
            Err(e) => {
                tracing::error!("Upscale of {} failed: {}", source.display(), e);
                if converted.is_some() {
                    discard_destination(destination).await;
                }
                Err(e)
            }
        }
    }

    async fn convert(&self, probe: &ProbeResult, source: &Path, output: &Path) -> Result<()> {
        tracing::info!(
            "Converting {} from {} using {}",
            source.display(),
            probe.format,
            self.converter.name()
        );
        self.converter.convert_to_png(source, output).await
    }

    async fn upscale(
        &self,
        plan: &ResolvedPlan,
        input: &Path,
        output: &Path,
        deadline: Option<Duration>,
    ) -> Result<()> {
        let cmd = self.upscaler.build(input, output, plan);
        tracing::debug!("Running {}", cmd.display());

        let result = self.runner.run(&cmd, deadline).await.map_err(|e| match e {
            RunError::TimedOut { deadline, .. } => UpscaleError::UpscaleTimeout { deadline },
            other => UpscaleError::UpscaleFailure {
                message: other.to_string(),
            },
        })?;

        if !result.success() {
            return Err(UpscaleError::UpscaleFailure {
                message: result.failure_summary(),
            });
        }

        // The staged file exists from the start; an empty one means nothing was written.
        let written = tokio::fs::metadata(output)
            .await
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        if !written {
            return Err(UpscaleError::UpscaleFailure {
                message: format!(
                    "{} exited successfully but did not write {}",
                    self.upscaler.executable().display(),
                    output.display()
                ),
            });
        }

        Ok(())
    }
}

/// Removes `destination` after a failed run. A cleanup error is logged so it does not
/// hide the failure that triggered it.
async fn discard_destination(destination: &Path) {
    match tokio::fs::remove_file(destination).await {
        Ok(()) => tracing::debug!("Removed {}", destination.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove {}: {}", destination.display(), e),
    }
}

/// Points `destination` at `source`, replacing whatever is there in one rename.
async fn link_destination(source: &Path, destination: &Path) -> Result<()> {
    let target = tokio::fs::canonicalize(source).await?;
    let destination = destination.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let link = tempfile::Builder::new()
            .prefix(".link-")
            .make_in(staging_dir(&destination), |path| alias(&target, path))?;
        link.into_temp_path()
            .persist(&destination)
            .map_err(|e| UpscaleError::IoError(e.error))
    })
    .await
    .map_err(|e| UpscaleError::IoError(io::Error::other(e)))?
}

#[cfg(unix)]
fn alias(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn alias(target: &Path, link: &Path) -> io::Result<()> {
    // Symlinks need extra privileges on Windows.
    std::os::windows::fs::symlink_file(target, link).or_else(|_| std::fs::hard_link(target, link))
}

#[cfg(not(any(unix, windows)))]
fn alias(target: &Path, link: &Path) -> io::Result<()> {
    std::fs::hard_link(target, link)
}
