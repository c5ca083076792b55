//! In-process probe and converter built on the `image` crate.

use crate::adapters::staging::StagedFile;
use crate::domain::model::ProbeResult;
use crate::domain::ports::{FormatConverter, ImageProbe};
use crate::utils::error::{Result, UpscaleError};
use async_trait::async_trait;
use image::{ImageFormat, ImageReader};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Lowercase name for a decoded format, matching ImageMagick's `%m` spelling.
pub fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Png => "png".to_string(),
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        other => other
            .extensions_str()
            .first()
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| format!("{:?}", other).to_ascii_lowercase()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeProbe;

impl NativeProbe {
    fn probe_blocking(path: &Path) -> Result<ProbeResult> {
        let failure = |message: String| UpscaleError::ProbeFailure {
            path: path.display().to_string(),
            message,
        };

        let reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| failure(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| failure("unrecognized format".to_string()))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| failure(e.to_string()))?;

        Ok(ProbeResult::new(width, height, format_name(format)))
    }
}

#[async_trait]
impl ImageProbe for NativeProbe {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn probe(&self, path: &Path) -> Result<ProbeResult> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::probe_blocking(&owned))
            .await
            .map_err(|e| UpscaleError::ProbeFailure {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeConverter;

impl NativeConverter {
    fn convert_blocking(source: &Path, destination: &Path) -> Result<()> {
        let failure = |message: String| UpscaleError::ConversionFailure { message };

        let decoded = image::open(source)
            .map_err(|e| failure(format!("{}: {}", source.display(), e)))?;

        let staged = StagedFile::beside(destination)?;
        {
            let mut writer = BufWriter::new(staged.as_file());
            decoded
                .write_to(&mut writer, ImageFormat::Png)
                .map_err(|e| failure(e.to_string()))?;
            writer.flush()?;
        }
        staged.persist(destination)
    }
}

#[async_trait]
impl FormatConverter for NativeConverter {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn convert_to_png(&self, source: &Path, destination: &Path) -> Result<()> {
        let (source, destination): (PathBuf, PathBuf) =
            (source.to_path_buf(), destination.to_path_buf());
        tokio::task::spawn_blocking(move || Self::convert_blocking(&source, &destination))
            .await
            .map_err(|e| UpscaleError::ConversionFailure {
                message: e.to_string(),
            })?
    }
}
