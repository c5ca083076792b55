//! Scale Resolver: picks one power-of-two factor and a clamped denoise level.

use crate::domain::model::{
    Bounds, DenoiseLevel, ProbeResult, ResolvedPlan, ScaleMode, ScaleRequest, Targets,
};
use crate::utils::error::{Result, UpscaleError};

/// Highest factor any supported upscaler build accepts.
pub const MAX_SCALE: u32 = 32;

pub fn resolve(request: &ScaleRequest, probe: &ProbeResult) -> Result<ResolvedPlan> {
    if probe.width == 0 || probe.height == 0 {
        return Err(UpscaleError::invalid(
            "probe",
            format!(
                "Source reports a zero dimension ({}x{})",
                probe.width, probe.height
            ),
        ));
    }

    let raw_factor = match &request.mode {
        ScaleMode::Original => 0,
        ScaleMode::Factor(factor) => factor.get(),
        ScaleMode::Targets(targets) => target_factor(targets, probe),
    };

    let plan = ResolvedPlan {
        scale: round_scale(raw_factor),
        denoise: DenoiseLevel::clamped(request.denoise),
    };
    tracing::debug!(
        "Resolved raw factor {} to scale {} (denoise {})",
        raw_factor,
        plan.scale,
        plan.denoise.get()
    );
    Ok(plan)
}

/// Factor needed to satisfy the target constraints before power-of-two rounding.
pub fn target_factor(targets: &Targets, probe: &ProbeResult) -> u32 {
    let fit = targets.fit.map_or(0, |bounds| fit_factor(&bounds, probe));
    let fill = targets.fill.map_or(0, |bounds| fill_factor(&bounds, probe));
    fit.max(fill)
}

/// Smallest factor where at least one given axis reaches its bound.
pub fn fit_factor(bounds: &Bounds, probe: &ProbeResult) -> u32 {
    let (w, h) = axis_factors(bounds, probe);
    match (w, h) {
        (Some(w), Some(h)) => w.min(h),
        (Some(f), None) | (None, Some(f)) => f,
        (None, None) => 0,
    }
}

/// Smallest factor where every given axis reaches its bound.
pub fn fill_factor(bounds: &Bounds, probe: &ProbeResult) -> u32 {
    let (w, h) = axis_factors(bounds, probe);
    w.unwrap_or(0).max(h.unwrap_or(0))
}

fn axis_factors(bounds: &Bounds, probe: &ProbeResult) -> (Option<u32>, Option<u32>) {
    (
        bounds.width.map(|t| t.get().div_ceil(probe.width)),
        bounds.height.map(|t| t.get().div_ceil(probe.height)),
    )
}

/// Rounds up to a power of two and clamps into `[1, MAX_SCALE]`; `0` becomes `1`.
pub fn round_scale(raw: u32) -> u32 {
    if raw > MAX_SCALE {
        tracing::warn!(
            "Scale {} is above the upscaler limit, clamping to {}",
            raw,
            MAX_SCALE
        );
        return MAX_SCALE;
    }
    raw.max(1).next_power_of_two()
}
