use crate::adapters::Backend;
use crate::config::toml_config::ToolConfig;
use crate::core::normalizer::{normalize, DenoiseInput, RawRequest};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Command-line surface. Every request field falls back to an `UPSCALE_*` variable,
/// read once at parse time.
#[derive(Debug, Clone, Parser)]
#[command(name = "upscale")]
#[command(about = "Upscale an image by a power-of-two factor with an external upscaler")]
pub struct CliConfig {
    /// Source image (never modified)
    #[arg(short = 'i', long, env = "UPSCALE_SOURCE", default_value = "")]
    pub source: String,

    /// Destination PNG; replaced if it exists
    #[arg(short = 'o', long, env = "UPSCALE_DESTINATION", default_value = "")]
    pub destination: String,

    /// Scale factor, rounded up to a power of two (0 = unset)
    #[arg(
        short,
        long,
        env = "UPSCALE_SCALING_FACTOR",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub scale: i64,

    /// Target width, fit semantics (0 = unset)
    #[arg(long, env = "UPSCALE_TARGET_WIDTH", default_value_t = 0, allow_negative_numbers = true)]
    pub target_width: i64,

    /// Target height, fit semantics (0 = unset)
    #[arg(long, env = "UPSCALE_TARGET_HEIGHT", default_value_t = 0, allow_negative_numbers = true)]
    pub target_height: i64,

    /// Minimum width, fill semantics (0 = unset)
    #[arg(long, env = "UPSCALE_MIN_WIDTH", default_value_t = 0, allow_negative_numbers = true)]
    pub min_width: i64,

    /// Minimum height, fill semantics (0 = unset)
    #[arg(long, env = "UPSCALE_MIN_HEIGHT", default_value_t = 0, allow_negative_numbers = true)]
    pub min_height: i64,

    /// Treat the target size as a minimum for both axes
    #[arg(
        long,
        env = "UPSCALE_TARGET_FILL",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub fill: bool,

    /// Denoise level (-1..3) or a boolean
    #[arg(short = 'n', long, env = "UPSCALE_DENOISE", allow_negative_numbers = true)]
    pub denoise: Option<DenoiseInput>,

    /// Upscaler deadline in seconds (0 = none)
    #[arg(long, env = "UPSCALE_TIMEOUT", allow_negative_numbers = true)]
    pub timeout: Option<f64>,

    /// Tool configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the upscaler executable
    #[arg(long)]
    pub upscaler: Option<String>,

    /// Override the upscaler model directory
    #[arg(long)]
    pub model: Option<String>,

    /// Override the probe backend
    #[arg(long, value_enum)]
    pub probe: Option<Backend>,

    /// Override the converter backend
    #[arg(long, value_enum)]
    pub converter: Option<Backend>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Write logs to stderr as JSON")]
    pub log_json: bool,
}

impl CliConfig {
    pub fn to_raw_request(&self) -> RawRequest {
        RawRequest {
            source: self.source.clone(),
            destination: self.destination.clone(),
            scale: self.scale,
            target_width: self.target_width,
            target_height: self.target_height,
            min_width: self.min_width,
            min_height: self.min_height,
            fill: self.fill,
            denoise: self.denoise,
            timeout_seconds: self.timeout,
        }
    }

    /// Loads `--config` (or defaults) and applies the command-line overrides.
    pub fn tool_config(&self) -> Result<ToolConfig> {
        let mut config = match &self.config {
            Some(path) => ToolConfig::from_file(path)?,
            None => ToolConfig::default(),
        };

        if let Some(upscaler) = &self.upscaler {
            config.upscaler.executable = upscaler.clone();
        }
        if let Some(model) = &self.model {
            config.upscaler.model = Some(model.clone());
        }
        if let Some(probe) = self.probe {
            config.probe = probe;
        }
        if let Some(converter) = self.converter {
            config.converter = converter;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        normalize(&self.to_raw_request()).map(|_| ())
    }
}
