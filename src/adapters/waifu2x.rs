use crate::domain::model::{DenoiseLevel, ResolvedPlan};
use crate::domain::ports::CommandSpec;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXECUTABLE: &str = "waifu2x-ncnn-vulkan";
pub const DEFAULT_MODEL: &str = "models-cunet";

/// Tile size passed on every run so the tool never auto-selects one.
/// 400 is the largest value it would pick by itself.
pub const TILE_SIZE: u32 = 400;

/// Builds command lines for waifu2x-ncnn-vulkan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waifu2xCommand {
    executable: PathBuf,
    model: Option<String>,
    extra_args: Vec<String>,
}

impl Default for Waifu2xCommand {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTABLE, Some(DEFAULT_MODEL.to_string()))
    }
}

impl Waifu2xCommand {
    pub fn new(executable: impl Into<PathBuf>, model: Option<String>) -> Self {
        Self {
            executable: executable.into(),
            model,
            extra_args: Vec::new(),
        }
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// The `-n` value for a denoise level, or `None` to leave the flag off.
    pub fn denoise_arg(level: DenoiseLevel) -> Option<String> {
        level.is_requested().then(|| level.get().to_string())
    }

    pub fn build(&self, input: &Path, output: &Path, plan: &ResolvedPlan) -> CommandSpec {
        let mut cmd = CommandSpec::new(self.executable.as_os_str());
        if let Some(model) = &self.model {
            cmd = cmd.arg("-m").arg(model);
        }
        cmd = cmd
            .arg("-i")
            .arg(input.as_os_str())
            .arg("-o")
            .arg(output.as_os_str())
            .arg("-s")
            .arg(plan.scale.to_string());
        if let Some(level) = Self::denoise_arg(plan.denoise) {
            cmd = cmd.arg("-n").arg(level);
        }
        cmd.arg("-t")
            .arg(TILE_SIZE.to_string())
            .args(self.extra_args.iter().map(String::as_str))
    }
}
