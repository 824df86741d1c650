use std::path::PathBuf;

use crate::api::ConverterConfig;
use crate::domain::AppError;

const ENV_OUTPUT_DIR: &str = "MP3DL_OUTPUT_DIR";
const ENV_POOL_SIZE: &str = "MP3DL_POOL_SIZE";
const ENV_DRIVE_ROOTS: &str = "MP3DL_DRIVE_ROOTS";
const ENV_CONVERTER_ORIGIN: &str = "MP3DL_CONVERTER_ORIGIN";
const ENV_CONVERTER_API: &str = "MP3DL_CONVERTER_API";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub output_folder: PathBuf,
    /// Concurrent downloads; defaults to the machine's available parallelism.
    pub pool_size: usize,
    /// Only drives mounted under one of these count; empty means any.
    pub drive_roots: Vec<PathBuf>,
    pub converter: ConverterConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_folder: PathBuf::from("output_mp3"),
            pool_size: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            drive_roots: Vec::new(),
            converter: ConverterConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `MP3DL_*` environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            config.output_folder = PathBuf::from(dir);
        }

        if let Some(raw) = lookup(ENV_POOL_SIZE) {
            config.pool_size = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(AppError::Config(format!(
                        "{ENV_POOL_SIZE} must be a positive integer, got {raw:?}"
                    )))
                }
            };
        }

        if let Some(raw) = lookup(ENV_DRIVE_ROOTS) {
            config.drive_roots = std::env::split_paths(&raw)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }

        if let Some(origin) = lookup(ENV_CONVERTER_ORIGIN) {
            config.converter.origin = origin;
        }
        if let Some(api) = lookup(ENV_CONVERTER_API) {
            config.converter.api_base = api;
        }

        Ok(config)
    }

    pub fn extension(&self) -> &str {
        &self.converter.extension
    }
}
