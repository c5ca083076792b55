// Adapters layer: concrete implementations of the collaborator ports.

pub mod magick;
#[cfg(feature = "native")]
pub mod native;
pub mod process;
pub mod staging;
pub mod waifu2x;

use crate::domain::ports::{FormatConverter, ImageProbe, ProcessRunner};
use crate::utils::error::{Result, UpscaleError};
use magick::{MagickCommand, MagickConverter, MagickProbe};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which implementation serves a collaborator port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Native when compiled in, otherwise ImageMagick.
    #[default]
    Auto,
    Native,
    Magick,
}

impl Backend {
    fn use_native(self) -> Result<bool> {
        match self {
            Backend::Magick => Ok(false),
            Backend::Auto => Ok(cfg!(feature = "native")),
            Backend::Native if cfg!(feature = "native") => Ok(true),
            Backend::Native => Err(UpscaleError::ConfigError {
                message: "the native backend was not compiled in (enable the 'native' feature)"
                    .to_string(),
            }),
        }
    }
}

pub fn select_probe(
    backend: Backend,
    runner: Arc<dyn ProcessRunner>,
    magick: MagickCommand,
) -> Result<Arc<dyn ImageProbe>> {
    if backend.use_native()? {
        #[cfg(feature = "native")]
        return Ok(Arc::new(native::NativeProbe));
    }
    Ok(Arc::new(MagickProbe::new(runner, magick)))
}

pub fn select_converter(
    backend: Backend,
    runner: Arc<dyn ProcessRunner>,
    magick: MagickCommand,
) -> Result<Arc<dyn FormatConverter>> {
    if backend.use_native()? {
        #[cfg(feature = "native")]
        return Ok(Arc::new(native::NativeConverter));
    }
    Ok(Arc::new(MagickConverter::new(runner, magick)))
}
