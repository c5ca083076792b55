//! Serves remote upscale messages on top of [`UpscaleEngine`].
//!
//! Each request gets its own temporary directory, so concurrent requests never share a
//! destination path. The transport that delivers messages lives outside this crate.

use crate::config::toml_config::ToolConfig;
use crate::core::engine::UpscaleEngine;
use crate::core::normalizer::NormalizedRequest;
use crate::domain::message::{UpscaleRequestMessage, UpscaleResponseMessage};
use crate::domain::ports::ProcessRunner;
use crate::utils::error::{Result, UpscaleError};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct RequestHandler {
    engine: Arc<UpscaleEngine>,
    jobs: Option<Arc<Semaphore>>,
}

impl RequestHandler {
    /// `max_jobs` caps how many upscales run at once; `None` means no cap.
    pub fn new(engine: Arc<UpscaleEngine>, max_jobs: Option<usize>) -> Self {
        Self {
            engine,
            jobs: max_jobs.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    /// Real collaborators from `config`, with `config.jobs` as the concurrency cap.
    pub fn from_config(config: &ToolConfig) -> Result<Self> {
        let engine = UpscaleEngine::from_config(config)?;
        Ok(Self::new(Arc::new(engine), config.jobs))
    }

    pub fn with_runner(config: &ToolConfig, runner: Arc<dyn ProcessRunner>) -> Result<Self> {
        let engine = UpscaleEngine::with_runner(config, runner)?;
        Ok(Self::new(Arc::new(engine), config.jobs))
    }

    pub async fn handle(&self, message: &UpscaleRequestMessage) -> Result<UpscaleResponseMessage> {
        let ext = sanitize_extension(&message.original_ext)?;
        if message.original_file.is_empty() {
            return Err(UpscaleError::invalid("original_file", "No image data"));
        }
        let request = message.to_scale_request()?;

        let workdir = tempfile::Builder::new().prefix("upscale").tempdir()?;
        let source = workdir.path().join(format!("source.{}", ext));
        tokio::fs::write(&source, &message.original_file).await?;

        let normalized = NormalizedRequest {
            source,
            destination: workdir.path().join("upscaled.png"),
            request,
        };

        let permit = match &self.jobs {
            Some(jobs) => Some(jobs.clone().acquire_owned().await.map_err(|e| {
                UpscaleError::UpscaleFailure {
                    message: format!("job limiter closed: {}", e),
                }
            })?),
            None => None,
        };
        let outcome = self.engine.run_normalized(&normalized).await?;
        drop(permit);

        let upscaled = tokio::fs::read(&normalized.destination).await?;
        tracing::info!(
            "Served {} bytes at {}",
            upscaled.len(),
            outcome.resolution()
        );

        Ok(UpscaleResponseMessage::new(outcome.resolution(), upscaled))
    }
}

fn sanitize_extension(ext: &str) -> Result<String> {
    let ext = ext.trim().trim_start_matches('.');
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(UpscaleError::invalid(
            "original_ext",
            format!("'{}' is not a usable file extension", ext),
        ));
    }
    Ok(ext.to_ascii_lowercase())
}
