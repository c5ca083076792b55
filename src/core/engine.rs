use crate::adapters::magick::MagickCommand;
use crate::adapters::process::TokioProcessRunner;
use crate::adapters::waifu2x::Waifu2xCommand;
use crate::adapters::{select_converter, select_probe};
use crate::config::toml_config::ToolConfig;
use crate::core::normalizer::{normalize, NormalizedRequest, RawRequest};
use crate::core::orchestrator::Orchestrator;
use crate::core::resolver::resolve;
use crate::domain::model::OutputOutcome;
use crate::domain::ports::{ImageProbe, ProcessRunner};
use crate::utils::error::{Result, UpscaleError};
use std::path::Path;
use std::sync::Arc;

/// Runs one invocation end to end: normalize, probe, resolve, orchestrate.
pub struct UpscaleEngine {
    probe: Arc<dyn ImageProbe>,
    orchestrator: Orchestrator,
}

impl UpscaleEngine {
    pub fn new(probe: Arc<dyn ImageProbe>, orchestrator: Orchestrator) -> Self {
        Self {
            probe,
            orchestrator,
        }
    }

    /// Wires the real collaborators described by `config`.
    pub fn from_config(config: &ToolConfig) -> Result<Self> {
        let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner);
        Self::with_runner(config, runner)
    }

    /// Like [`UpscaleEngine::from_config`] but with a caller-supplied process runner.
    pub fn with_runner(config: &ToolConfig, runner: Arc<dyn ProcessRunner>) -> Result<Self> {
        let magick = match &config.magick {
            Some(parts) => MagickCommand::new(parts.iter().map(String::as_str)),
            None => MagickCommand::detect(),
        };

        let probe = select_probe(config.probe, runner.clone(), magick.clone())?;
        let converter = select_converter(config.converter, runner.clone(), magick)?;
        let upscaler = Waifu2xCommand::new(
            &config.upscaler.executable,
            config.upscaler.model.clone(),
        )
        .with_extra_args(config.upscaler.extra_args.clone());

        tracing::debug!(
            "Using probe '{}', converter '{}', upscaler '{}'",
            probe.name(),
            converter.name(),
            config.upscaler.executable
        );

        Ok(Self::new(
            probe,
            Orchestrator::new(converter, runner, upscaler),
        ))
    }

    pub async fn run(&self, raw: &RawRequest) -> Result<OutputOutcome> {
        let normalized = normalize(raw)?;
        self.run_normalized(&normalized).await
    }

    pub async fn run_normalized(&self, request: &NormalizedRequest) -> Result<OutputOutcome> {
        ensure_regular_file(&request.source).await?;

        let probe = self.probe.probe(&request.source).await?;
        tracing::info!(
            "Probed {}: {}x{} {}",
            request.source.display(),
            probe.width,
            probe.height,
            probe.format
        );

        let plan = resolve(&request.request, &probe)?;
        tracing::info!(
            "Plan: scale {} denoise {}",
            plan.scale,
            plan.denoise.get()
        );

        self.orchestrator
            .run(
                &plan,
                &probe,
                &request.source,
                &request.destination,
                request.request.deadline,
            )
            .await
    }
}

async fn ensure_regular_file(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(UpscaleError::invalid(
            "source",
            format!("{} is not a regular file", path.display()),
        )),
        Err(e) => Err(UpscaleError::invalid(
            "source",
            format!("{}: {}", path.display(), e),
        )),
    }
}
