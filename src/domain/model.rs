use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

/// Width and height of a raster image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both axes multiplied by `scale`, or `None` on overflow.
    pub fn scaled(&self, scale: u32) -> Option<Resolution> {
        Some(Resolution {
            width: self.width.checked_mul(scale)?,
            height: self.height.checked_mul(scale)?,
        })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A target box where either axis may be left open.
///
/// At least one axis is always set; the normalizer never builds an empty box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: Option<NonZeroU32>,
    pub height: Option<NonZeroU32>,
}

impl Bounds {
    /// Builds bounds from raw `0 = unset` dimensions. Returns `None` when both are unset.
    pub fn from_dimensions(width: u32, height: u32) -> Option<Bounds> {
        let bounds = Bounds {
            width: NonZeroU32::new(width),
            height: NonZeroU32::new(height),
        };
        if bounds.width.is_none() && bounds.height.is_none() {
            None
        } else {
            Some(bounds)
        }
    }

    /// The bounds as a resolution with `0` for open axes.
    pub fn to_resolution(&self) -> Resolution {
        Resolution {
            width: self.width.map_or(0, NonZeroU32::get),
            height: self.height.map_or(0, NonZeroU32::get),
        }
    }
}

/// Size constraints of a target-driven request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targets {
    /// Fit: at least one axis must reach its bound.
    pub fit: Option<Bounds>,
    /// Fill: every given axis must reach its bound.
    pub fill: Option<Bounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMode {
    /// Neither a factor nor targets were given.
    Original,
    Factor(NonZeroU32),
    Targets(Targets),
}

/// Denoise strength handed to the upscaler. `-1` means no denoising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DenoiseLevel(i8);

impl DenoiseLevel {
    pub const NONE: DenoiseLevel = DenoiseLevel(-1);
    pub const MAX: DenoiseLevel = DenoiseLevel(3);

    /// Clamps a requested level into `[-1, 3]`; `None` means denoising was not requested.
    pub fn clamped(requested: Option<i64>) -> DenoiseLevel {
        match requested {
            None => DenoiseLevel::NONE,
            Some(level) => {
                DenoiseLevel(level.clamp(i64::from(Self::NONE.0), i64::from(Self::MAX.0)) as i8)
            }
        }
    }

    pub fn get(self) -> i8 {
        self.0
    }

    pub fn is_requested(self) -> bool {
        self != DenoiseLevel::NONE
    }
}

impl Default for DenoiseLevel {
    fn default() -> Self {
        DenoiseLevel::NONE
    }
}

/// A validated, canonical request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleRequest {
    pub mode: ScaleMode,
    /// Requested level before clamping; `None` when no denoising was asked for.
    pub denoise: Option<i64>,
    pub deadline: Option<Duration>,
}

impl ScaleRequest {
    pub fn unscaled() -> Self {
        Self {
            mode: ScaleMode::Original,
            denoise: None,
            deadline: None,
        }
    }
}

/// What the probe collaborator reports for a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub width: u32,
    pub height: u32,
    /// Lowercase format name such as `png`, `jpeg` or `bmp`.
    pub format: String,
}

impl ProbeResult {
    pub fn new(width: u32, height: u32, format: impl Into<String>) -> Self {
        Self {
            width,
            height,
            format: format.into().to_ascii_lowercase(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPlan {
    /// Power of two in `1..=32`.
    pub scale: u32,
    pub denoise: DenoiseLevel,
}

impl ResolvedPlan {
    /// True when neither scaling nor denoising is needed.
    pub fn is_noop(&self) -> bool {
        self.scale == 1 && !self.denoise.is_requested()
    }
}

/// Terminal state of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputOutcome {
    Symlinked(Resolution),
    ConvertedOnly(Resolution),
    Upscaled(Resolution),
}

impl OutputOutcome {
    pub fn resolution(&self) -> Resolution {
        match self {
            OutputOutcome::Symlinked(res)
            | OutputOutcome::ConvertedOnly(res)
            | OutputOutcome::Upscaled(res) => *res,
        }
    }
}
