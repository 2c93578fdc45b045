//! Wind dataset converter.
//!
//! Converts a wind dataset into quantized PNG rasters or a binary container,
//! syncs the artifacts with object storage and exports the selected frame as
//! earth JSON for the globe visualization.

mod config;
mod convert;
mod source;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use raster_codec::OutputMode;
use renderer::EarthOptions;
use storage::ArtifactStore;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use config::ConverterConfig;
use convert::Converter;

/// Wind dataset converter
#[derive(Parser, Debug)]
#[command(name = "converter")]
#[command(about = "Convert wind datasets to rasters or binary containers and export earth JSON")]
struct Args {
    /// Dataset name, looked up as `{input_dir}/{name}.nc` or `{name}.bin`
    name: String,

    /// Artifact kind: png (two rasters per frame) or bin (one container)
    #[arg(short, long, env = "CONVERTER_MODE")]
    mode: Option<OutputMode>,

    /// Export the raw dataset without converting
    #[arg(short, long)]
    show_only: bool,

    /// Frame to export
    #[arg(short, long, env = "CONVERTER_FRAME")]
    frame: Option<usize>,

    /// Always encode sequentially
    #[arg(long)]
    no_accelerator: bool,

    /// Source dataset directory
    #[arg(long, env = "CONVERTER_INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Directory for converted artifacts
    #[arg(long, env = "CONVERTER_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Earth JSON output file
    #[arg(long, env = "CONVERTER_EARTH_JSON")]
    earth_json: Option<PathBuf>,

    /// Reference time written to the earth JSON header (RFC 3339)
    #[arg(long)]
    ref_time: Option<DateTime<Utc>>,

    /// Use a local directory as the artifact store instead of S3
    #[arg(long, env = "CONVERTER_LOCAL_STORE")]
    local_store: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

impl Args {
    /// Layer the flags over the environment configuration.
    fn into_config(self, mut config: ConverterConfig) -> ConverterConfig {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(frame) = self.frame {
            config.frame = frame;
        }
        if self.no_accelerator {
            config.codec.accelerator = false;
        }
        if let Some(dir) = self.input_dir {
            config.input_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(path) = self.earth_json {
            config.earth_json = path;
        }
        if let Some(dir) = self.local_store {
            config.local_store = Some(dir);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let name = args.name.clone();
    let show_only = args.show_only;
    let ref_time = args.ref_time;
    let config = args.into_config(ConverterConfig::from_env());
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {}", e))?;

    info!(
        name = %name,
        mode = %config.mode,
        frame = config.frame,
        input_dir = %config.input_dir.display(),
        "Starting converter"
    );

    let store = match &config.local_store {
        Some(root) => ArtifactStore::local(root)?,
        None => ArtifactStore::new(&config.store)?,
    };
    let mut earth = EarthOptions::default();
    if let Some(ref_time) = ref_time {
        earth.ref_time = ref_time;
    }
    let converter = Converter::new(config, store).with_earth_options(earth);

    if show_only {
        let path = converter
            .show_only(&name)
            .with_context(|| format!("exporting {}", name))?;
        info!(path = %path.display(), "Exported raw dataset");
        return Ok(());
    }

    let summary = converter
        .run(&name)
        .await
        .with_context(|| format!("converting {}", name))?;

    info!(
        provenance = ?summary.provenance,
        artifacts = summary.artifacts.len(),
        path = %summary.earth_json.display(),
        "Visualization data ready"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "converter",
            "gfs",
            "--mode",
            "png",
            "--frame",
            "2",
            "--no-accelerator",
            "--output-dir",
            "/tmp/wind",
        ]);
        assert_eq!(args.name, "gfs");
        assert!(!args.show_only);

        let config = args.into_config(ConverterConfig::default());
        assert_eq!(config.mode, OutputMode::Raster);
        assert_eq!(config.frame, 2);
        assert!(!config.codec.accelerator);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/wind"));
        assert_eq!(config.input_dir, PathBuf::from("netcdf"));
    }

    #[test]
    fn test_show_only_short_flag() {
        let args = Args::parse_from(["converter", "gfs", "-s"]);
        assert!(args.show_only);
        assert_eq!(args.into_config(ConverterConfig::default()).mode, OutputMode::Container);
    }

    #[test]
    fn test_ref_time_flag() {
        let args = Args::parse_from(["converter", "gfs", "--ref-time", "2025-06-04T00:00:00Z"]);
        assert_eq!(
            args.ref_time.unwrap().to_rfc3339(),
            "2025-06-04T00:00:00+00:00"
        );
    }
}
