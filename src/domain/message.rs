//! Remote request/response schema.
//!
//! A remote caller sends either an explicit scale or a pair of target/minimum
//! resolutions together with the raw source bytes; the reply carries the final
//! resolution and the PNG bytes.

use crate::domain::model::{Bounds, Resolution, ScaleMode, ScaleRequest, Targets};
use crate::utils::error::Result;
use crate::utils::validation::validate_timeout;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolutions {
    pub target: Option<Resolution>,
    pub minimum: Option<Resolution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSize {
    Scale(u32),
    Resolutions(Resolutions),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpscaleRequestMessage {
    pub target_size: Option<TargetSize>,
    #[serde(default)]
    pub denoise: bool,
    #[serde(default)]
    pub original_file: Vec<u8>,
    /// Extension of the original file without the leading dot.
    pub original_ext: String,
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpscaleResponseMessage {
    pub res: Option<Resolution>,
    pub upscaled: Vec<u8>,
}

impl TargetSize {
    /// Wire shape of a normalized mode. `None` for [`ScaleMode::Original`].
    pub fn from_mode(mode: &ScaleMode) -> Option<TargetSize> {
        match mode {
            ScaleMode::Original => None,
            ScaleMode::Factor(factor) => Some(TargetSize::Scale(factor.get())),
            ScaleMode::Targets(targets) => Some(TargetSize::Resolutions(Resolutions {
                target: targets.fit.map(|b| b.to_resolution()),
                minimum: targets.fill.map(|b| b.to_resolution()),
            })),
        }
    }

    /// Canonical mode for this wire shape. Zero values mean "unset".
    pub fn to_mode(&self) -> ScaleMode {
        match self {
            TargetSize::Scale(scale) => match NonZeroU32::new(*scale) {
                Some(factor) => ScaleMode::Factor(factor),
                None => ScaleMode::Original,
            },
            TargetSize::Resolutions(resolutions) => {
                let fit = resolutions
                    .target
                    .and_then(|r| Bounds::from_dimensions(r.width, r.height));
                let fill = resolutions
                    .minimum
                    .and_then(|r| Bounds::from_dimensions(r.width, r.height));
                if fit.is_none() && fill.is_none() {
                    ScaleMode::Original
                } else {
                    ScaleMode::Targets(Targets { fit, fill })
                }
            }
        }
    }
}

impl UpscaleRequestMessage {
    /// Denoise level carried by the boolean flag: `true` asks for level 1.
    pub fn denoise_level(&self) -> Option<i64> {
        self.denoise.then_some(1)
    }

    /// The canonical request carried by this message.
    pub fn to_scale_request(&self) -> Result<ScaleRequest> {
        Ok(ScaleRequest {
            mode: self
                .target_size
                .as_ref()
                .map_or(ScaleMode::Original, TargetSize::to_mode),
            denoise: self.denoise_level(),
            deadline: validate_timeout("timeout_seconds", self.timeout_seconds)?,
        })
    }

    /// Copies the scaling fields of `request` into a message, leaving the payload empty.
    ///
    /// The wire flag carries no level: any level from 0 to 3 is sent as `true` and comes
    /// back as level 1 from [`UpscaleRequestMessage::to_scale_request`].
    pub fn from_request(request: &ScaleRequest, original_ext: impl Into<String>) -> Self {
        Self {
            target_size: TargetSize::from_mode(&request.mode),
            denoise: request.denoise.is_some_and(|level| level >= 0),
            original_file: Vec::new(),
            original_ext: original_ext.into(),
            timeout_seconds: request.deadline.map(|d| d.as_secs_f64()),
        }
    }
}

impl UpscaleResponseMessage {
    pub fn new(res: Resolution, upscaled: Vec<u8>) -> Self {
        Self {
            res: Some(res),
            upscaled,
        }
    }
}
