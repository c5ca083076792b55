use crate::utils::error::{Result, UpscaleError};
use std::path::Path;
use tempfile::NamedTempFile;

/// A temporary file next to a destination, renamed over it once complete.
///
/// Dropping it without calling [`StagedFile::persist`] deletes it, so a failed write
/// never shows up at the destination path.
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    pub fn beside(destination: &Path) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(".staged-")
            .suffix(".png")
            .tempfile_in(staging_dir(destination))?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn as_file(&self) -> &std::fs::File {
        self.file.as_file()
    }

    pub fn persist(self, destination: &Path) -> Result<()> {
        self.file
            .into_temp_path()
            .persist(destination)
            .map_err(|e| UpscaleError::IoError(e.error))
    }
}

/// Directory that holds temporaries for `destination`; same filesystem, so a rename is atomic.
pub fn staging_dir(destination: &Path) -> &Path {
    destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
