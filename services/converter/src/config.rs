//! Converter configuration.

use std::env;
use std::path::PathBuf;

use raster_codec::{CodecConfig, OutputMode};
use serde::{Deserialize, Serialize};
use storage::ArtifactStoreConfig;

/// Where the globe visualization picks up its wind layer.
pub const DEFAULT_EARTH_JSON: &str =
    "public/data/weather/current/current-wind-surface-level-gfs-1.0.json";

/// Top-level converter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Directory holding the source datasets
    pub input_dir: PathBuf,

    /// Directory for converted artifacts
    pub output_dir: PathBuf,

    /// Earth JSON output file
    pub earth_json: PathBuf,

    /// Artifact kind to produce
    pub mode: OutputMode,

    /// Frame exported to earth JSON
    pub frame: usize,

    /// Codec and execution strategy
    pub codec: CodecConfig,

    /// Remote artifact bucket
    pub store: ArtifactStoreConfig,

    /// Use a local directory as the artifact store instead of S3
    pub local_store: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("netcdf"),
            output_dir: PathBuf::from("tmp"),
            earth_json: PathBuf::from(DEFAULT_EARTH_JSON),
            mode: OutputMode::Container,
            frame: 0,
            codec: CodecConfig::default(),
            store: ArtifactStoreConfig::default(),
            local_store: None,
        }
    }
}

impl ConverterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            codec: CodecConfig::from_env(),
            store: ArtifactStoreConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = env::var("CONVERTER_INPUT_DIR") {
            config.input_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("CONVERTER_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("CONVERTER_EARTH_JSON") {
            config.earth_json = PathBuf::from(val);
        }
        if let Ok(val) = env::var("CONVERTER_MODE") {
            if let Ok(mode) = val.parse() {
                config.mode = mode;
            }
        }
        if let Ok(val) = env::var("CONVERTER_LOCAL_STORE") {
            config.local_store = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("CONVERTER_FRAME") {
            if let Ok(frame) = val.parse() {
                config.frame = frame;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.input_dir.as_os_str().is_empty() {
            return Err("input_dir must not be empty".to_string());
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err("output_dir must not be empty".to_string());
        }
        if self.earth_json.file_name().is_none() {
            return Err(format!(
                "earth_json {} does not name a file",
                self.earth_json.display()
            ));
        }
        self.codec.validate().map_err(|e| format!("codec: {}", e))?;
        if self.local_store.is_none() {
            self.store.validate().map_err(|e| format!("store: {}", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.mode, OutputMode::Container);
        assert_eq!(config.frame, 0);
        assert!(config.earth_json.ends_with("current-wind-surface-level-gfs-1.0.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = ConverterConfig::default();
        config.output_dir = PathBuf::new();
        assert!(config.validate().is_err());

        let mut config = ConverterConfig::default();
        config.earth_json = PathBuf::from("/");
        assert!(config.validate().is_err());

        let mut config = ConverterConfig::default();
        config.codec.tile_rows = 0;
        assert!(config.validate().unwrap_err().starts_with("codec:"));

        let mut config = ConverterConfig::default();
        config.store.bucket.clear();
        assert!(config.validate().unwrap_err().starts_with("store:"));
    }
}
