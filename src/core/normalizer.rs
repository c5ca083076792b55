//! Request Normalizer: turns a raw parameter bag into a canonical [`ScaleRequest`].
//!
//! Two surface shapes are accepted. The legacy shape carries one target pair plus a
//! `fill` flag; the extended shape carries separate target (fit) and minimum (fill)
//! pairs. Both normalize into [`ScaleMode::Targets`].

use crate::domain::model::{Bounds, ScaleMode, ScaleRequest, Targets};
use crate::utils::error::{Result, UpscaleError};
use crate::utils::validation::{
    validate_dimension, validate_file_extension, validate_path, validate_timeout,
};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;

/// Denoise as it arrives at the boundary: older callers send a flag, newer ones a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenoiseInput {
    Level(i64),
    Flag(bool),
}

impl DenoiseInput {
    /// Requested level, or `None` when no denoising was asked for.
    pub fn level(self) -> Option<i64> {
        match self {
            DenoiseInput::Level(level) => Some(level),
            DenoiseInput::Flag(true) => Some(1),
            DenoiseInput::Flag(false) => None,
        }
    }
}

impl FromStr for DenoiseInput {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(level) = s.parse::<i64>() {
            return Ok(DenoiseInput::Level(level));
        }
        match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(DenoiseInput::Flag(true)),
            "" | "false" | "no" | "off" => Ok(DenoiseInput::Flag(false)),
            other => Err(format!(
                "expected a denoise level or a boolean, got '{}'",
                other
            )),
        }
    }
}

/// Raw invocation fields. Numeric fields use `0` for "unset".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRequest {
    pub source: String,
    pub destination: String,
    pub scale: i64,
    pub target_width: i64,
    pub target_height: i64,
    pub min_width: i64,
    pub min_height: i64,
    /// Legacy shape: treat the target pair as fill bounds.
    pub fill: bool,
    pub denoise: Option<DenoiseInput>,
    pub timeout_seconds: Option<f64>,
}

/// A normalized invocation: validated paths plus the canonical request.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub request: ScaleRequest,
}

pub fn normalize(raw: &RawRequest) -> Result<NormalizedRequest> {
    validate_path("source", &raw.source)?;
    validate_path("destination", &raw.destination)?;
    validate_file_extension("destination", &raw.destination, &["png"])?;
    if raw.source == raw.destination {
        return Err(UpscaleError::invalid(
            "destination",
            "Destination cannot be the source file",
        ));
    }

    let request = normalize_scale(raw)?;

    Ok(NormalizedRequest {
        source: PathBuf::from(&raw.source),
        destination: PathBuf::from(&raw.destination),
        request,
    })
}

/// Validates the scaling fields only. Paths are not inspected.
pub fn normalize_scale(raw: &RawRequest) -> Result<ScaleRequest> {
    let scale = validate_dimension("scale", raw.scale)?;
    let target_width = validate_dimension("target_width", raw.target_width)?;
    let target_height = validate_dimension("target_height", raw.target_height)?;
    let min_width = validate_dimension("min_width", raw.min_width)?;
    let min_height = validate_dimension("min_height", raw.min_height)?;
    let deadline = validate_timeout("timeout", raw.timeout_seconds)?;

    let any_target = target_width > 0 || target_height > 0 || min_width > 0 || min_height > 0;
    if scale > 0 && any_target {
        return Err(UpscaleError::invalid(
            "scale",
            "Cannot specify a scaling factor alongside target or minimum sizes",
        ));
    }

    let target = Bounds::from_dimensions(target_width, target_height);
    let minimum = Bounds::from_dimensions(min_width, min_height);

    let (fit, fill) = if raw.fill {
        if minimum.is_some() && target.is_some() {
            return Err(UpscaleError::invalid(
                "fill",
                "The fill flag cannot be combined with minimum sizes",
            ));
        }
        (None, target.or(minimum))
    } else {
        (target, minimum)
    };

    let mode = match NonZeroU32::new(scale) {
        Some(factor) => ScaleMode::Factor(factor),
        None if fit.is_some() || fill.is_some() => ScaleMode::Targets(Targets { fit, fill }),
        None => ScaleMode::Original,
    };

    Ok(ScaleRequest {
        mode,
        denoise: raw.denoise.and_then(DenoiseInput::level),
        deadline,
    })
}
