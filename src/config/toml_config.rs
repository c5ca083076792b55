use crate::adapters::waifu2x::{DEFAULT_EXECUTABLE, DEFAULT_MODEL};
use crate::adapters::Backend;
use crate::utils::error::{Result, UpscaleError};
use crate::utils::validation::{validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// External tools and backends, usually loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub probe: Backend,
    pub converter: Backend,
    /// ImageMagick command prefix, e.g. `["magick"]`. Detected from `PATH` when unset.
    pub magick: Option<Vec<String>>,
    /// Upper bound on concurrent upscales in the request handler.
    pub jobs: Option<usize>,
    pub upscaler: UpscalerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpscalerConfig {
    pub executable: String,
    pub model: Option<String>,
    pub extra_args: Vec<String>,
}

impl Default for UpscalerConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            model: Some(DEFAULT_MODEL.to_string()),
            extra_args: Vec::new(),
        }
    }
}

impl ToolConfig {
    /// Loads a tool configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| UpscaleError::ConfigError {
            message: format!("{}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a tool configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| UpscaleError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` placeholders with environment values; unknown ones are kept.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| UpscaleError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("upscaler.executable", &self.upscaler.executable)
            .map_err(config_error)?;

        if let Some(model) = &self.upscaler.model {
            validate_non_empty_string("upscaler.model", model).map_err(config_error)?;
        }

        if let Some(parts) = &self.magick {
            match parts.first() {
                Some(program) => {
                    validate_non_empty_string("magick", program).map_err(config_error)?
                }
                None => {
                    return Err(UpscaleError::ConfigError {
                        message: "magick: command cannot be an empty list".to_string(),
                    })
                }
            }
        }

        if self.jobs == Some(0) {
            return Err(UpscaleError::ConfigError {
                message: "jobs: must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn config_error(e: UpscaleError) -> UpscaleError {
    match e {
        UpscaleError::InvalidArgument { field, reason } => UpscaleError::ConfigError {
            message: format!("{}: {}", field, reason),
        },
        other => other,
    }
}

impl Validate for ToolConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
