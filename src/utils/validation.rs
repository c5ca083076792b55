use crate::utils::error::{Result, UpscaleError};
use std::path::Path;
use std::time::Duration;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(UpscaleError::invalid(field_name, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(UpscaleError::invalid(field_name, "Path contains null bytes"));
    }

    Ok(())
}

/// Checks that `path` ends in one of `allowed_extensions` (case-insensitive).
pub fn validate_file_extension(
    field_name: &str,
    path: &str,
    allowed_extensions: &[&str],
) -> Result<()> {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension {
        Some(ext) if allowed_extensions.contains(&ext.as_str()) => Ok(()),
        Some(ext) => Err(UpscaleError::invalid(
            field_name,
            format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                ext,
                allowed_extensions.join(", ")
            ),
        )),
        None => Err(UpscaleError::invalid(
            field_name,
            "File has no extension or invalid filename",
        )),
    }
}

/// Converts a `0 = unset` count into `u32`, rejecting negatives and overflow.
pub fn validate_dimension(field_name: &str, value: i64) -> Result<u32> {
    if value < 0 {
        return Err(UpscaleError::invalid(
            field_name,
            format!("Value cannot be negative (got {})", value),
        ));
    }
    u32::try_from(value).map_err(|_| {
        UpscaleError::invalid(field_name, format!("Value {} is too large", value))
    })
}

/// Turns optional seconds into a deadline. Zero means no deadline.
pub fn validate_timeout(field_name: &str, seconds: Option<f64>) -> Result<Option<Duration>> {
    let Some(seconds) = seconds else {
        return Ok(None);
    };

    if !seconds.is_finite() {
        return Err(UpscaleError::invalid(field_name, "Timeout must be finite"));
    }
    if seconds < 0.0 {
        return Err(UpscaleError::invalid(
            field_name,
            format!("Timeout cannot be negative (got {})", seconds),
        ));
    }
    if seconds == 0.0 {
        return Ok(None);
    }

    Duration::try_from_secs_f64(seconds)
        .map(Some)
        .map_err(|e| UpscaleError::invalid(field_name, e.to_string()))
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(UpscaleError::invalid(
            field_name,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}
