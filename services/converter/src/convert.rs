//! The conversion pipeline: convert or fetch artifacts, then export earth JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use raster_codec::{
    decode_series, encode_series_to_container, BinaryContainer, GridCodec, OutputMode,
    SeriesRanges,
};
use renderer::{
    read_raster_png, records_from_axes, records_from_decoded, write_earth_json_file,
    write_raster_png, EarthOptions,
};
use storage::ArtifactStore;
use tracing::{debug, info, instrument};
use wind_common::WindDataset;

use crate::config::ConverterConfig;
use crate::source::load_dataset;

/// Where the artifacts of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Already in the store; downloaded.
    Downloaded,
    /// Converted locally and uploaded.
    Converted,
}

/// Outcome of a full run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub provenance: Provenance,
    /// Artifacts moved to or from the store.
    pub artifacts: Vec<String>,
    pub earth_json: PathBuf,
}

/// Artifacts needed to visualize one frame.
///
/// A container holds the whole series; rasters come in a pair per frame.
pub fn frame_artifacts(name: &str, mode: OutputMode, frame: usize) -> Vec<String> {
    match mode {
        OutputMode::Container => vec![format!("{}.{}", name, mode.extension())],
        OutputMode::Raster => vec![
            format!("{}/{}.coords.{}", name, frame, mode.extension()),
            format!("{}/{}.uv.{}", name, frame, mode.extension()),
        ],
    }
}

/// Every artifact produced by converting a series of `frames`.
pub fn series_artifacts(name: &str, mode: OutputMode, frames: usize) -> Vec<String> {
    match mode {
        OutputMode::Container => frame_artifacts(name, mode, 0),
        OutputMode::Raster => (0..frames)
            .flat_map(|t| frame_artifacts(name, mode, t))
            .collect(),
    }
}

/// Runs conversions for one configuration against one store.
pub struct Converter {
    config: ConverterConfig,
    codec: GridCodec,
    store: ArtifactStore,
    earth: EarthOptions,
}

impl Converter {
    pub fn new(config: ConverterConfig, store: ArtifactStore) -> Self {
        let codec = GridCodec::new(&config.codec);
        info!(strategy = ?codec.strategy_kind(), store = store.label(), "Converter ready");
        Self {
            config,
            codec,
            store,
            earth: EarthOptions::default(),
        }
    }

    /// Override the earth JSON header metadata.
    pub fn with_earth_options(mut self, earth: EarthOptions) -> Self {
        self.earth = earth;
        self
    }

    fn local_path(&self, artifact: &str) -> PathBuf {
        self.config.output_dir.join(artifact)
    }

    /// Export the selected frame straight from the raw dataset.
    #[instrument(skip(self))]
    pub fn show_only(&self, name: &str) -> Result<PathBuf> {
        let dataset = load_dataset(&self.config.input_dir, name)?;
        self.export_raw(&dataset)?;
        Ok(self.config.earth_json.clone())
    }

    /// Fetch or produce the artifacts for `name`, then export earth JSON.
    #[instrument(skip(self), fields(mode = %self.config.mode))]
    pub async fn run(&self, name: &str) -> Result<RunSummary> {
        let mode = self.config.mode;
        let wanted = frame_artifacts(name, mode, self.config.frame);

        let (provenance, artifacts) = if self.store.exists(&wanted[0]).await? {
            info!(artifact = %wanted[0], "Downloading converted files");
            let locals: Vec<PathBuf> = wanted.iter().map(|a| self.local_path(a)).collect();
            self.store
                .download_files(&wanted, &locals)
                .await
                .context("downloading artifacts")?;
            (Provenance::Downloaded, wanted)
        } else {
            info!("Converting to {}", mode);
            let dataset = load_dataset(&self.config.input_dir, name)?;
            let produced = self.convert(&dataset, name)?;

            info!(count = produced.len(), "Uploading artifacts");
            let locals: Vec<PathBuf> = produced.iter().map(|a| self.local_path(a)).collect();
            self.store
                .upload_files(&locals, &produced)
                .await
                .context("uploading artifacts")?;
            (Provenance::Converted, produced)
        };

        self.export_from_artifacts(name)?;

        Ok(RunSummary {
            provenance,
            artifacts,
            earth_json: self.config.earth_json.clone(),
        })
    }

    /// Convert a dataset into local artifacts; returns their names.
    pub fn convert(&self, dataset: &WindDataset, name: &str) -> Result<Vec<String>> {
        match self.config.mode {
            OutputMode::Container => self.convert_to_container(dataset, name),
            OutputMode::Raster => self.convert_to_rasters(dataset, name),
        }
    }

    fn convert_to_container(&self, dataset: &WindDataset, name: &str) -> Result<Vec<String>> {
        let artifacts = series_artifacts(name, OutputMode::Container, dataset.series.len());
        let path = self.local_path(&artifacts[0]);
        create_parent(&path)?;

        let start = Instant::now();
        let container = encode_series_to_container(&dataset.coords, &dataset.series)?;
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        container.write(BufWriter::new(file))?;

        info!(
            path = %path.display(),
            bytes = container.encoded_len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Wrote container"
        );
        Ok(artifacts)
    }

    fn convert_to_rasters(&self, dataset: &WindDataset, name: &str) -> Result<Vec<String>> {
        let artifacts = series_artifacts(name, OutputMode::Raster, dataset.series.len());
        let encoding =
            self.codec
                .encode_series(&dataset.coords, &dataset.series, SeriesRanges::default())?;

        for (frame, names) in encoding.iter().zip(artifacts.chunks_exact(2)) {
            let start = Instant::now();
            let frame = frame?;
            let (coords_path, uv_path) = (self.local_path(&names[0]), self.local_path(&names[1]));
            create_parent(&coords_path)?;
            write_raster_png(&coords_path, &frame.coords)?;
            write_raster_png(&uv_path, &frame.wind)?;
            info!(
                frame = frame.index,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Converted frame"
            );
        }

        Ok(artifacts)
    }

    /// Decode the local artifacts and export the selected frame.
    pub fn export_from_artifacts(&self, name: &str) -> Result<()> {
        let frame = self.config.frame;
        let artifacts = frame_artifacts(name, self.config.mode, frame);

        match self.config.mode {
            OutputMode::Container => {
                let path = self.local_path(&artifacts[0]);
                let file =
                    File::open(&path).with_context(|| format!("opening {}", path.display()))?;
                let dataset = BinaryContainer::read(BufReader::new(file))?.into_dataset()?;
                self.export_raw(&dataset)
            }
            OutputMode::Raster => {
                let coords = read_raster_png(&self.local_path(&artifacts[0]))?;
                let wind = read_raster_png(&self.local_path(&artifacts[1]))?;
                let decoded = decode_series(&self.codec, [(coords, wind)], SeriesRanges::default())
                    .next()
                    .ok_or_else(|| anyhow!("no frame decoded from {}", artifacts[1]))??;
                debug!(bbox = ?decoded.bbox(), "Decoded frame {}", frame);

                let records = records_from_decoded(&decoded, &self.earth)?;
                write_earth_json_file(&self.config.earth_json, &records)?;
                Ok(())
            }
        }
    }

    fn export_raw(&self, dataset: &WindDataset) -> Result<()> {
        let frame = self.config.frame;
        let wind = dataset.series.frame(frame).ok_or_else(|| {
            anyhow!(
                "frame {} out of range, dataset has {} frames",
                frame,
                dataset.series.len()
            )
        })?;
        let records = records_from_axes(&dataset.coords, wind, &self.earth)?;
        write_earth_json_file(&self.config.earth_json, &records)?;
        Ok(())
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use renderer::EarthRecord;
    use test_utils::{create_wind_dataset, ScratchDirs};

    fn earth() -> EarthOptions {
        EarthOptions {
            ref_time: Utc.with_ymd_and_hms(2025, 6, 4, 0, 0, 0).unwrap(),
            ..EarthOptions::default()
        }
    }

    fn setup(mode: OutputMode) -> (ScratchDirs, ConverterConfig, WindDataset) {
        let dirs = ScratchDirs::new().unwrap();
        let dataset = create_wind_dataset(6, 8, 3);
        let file = File::create(dirs.input().join("gfs.bin")).unwrap();
        BinaryContainer::from_dataset(&dataset)
            .unwrap()
            .write(file)
            .unwrap();

        let config = ConverterConfig {
            input_dir: dirs.input(),
            output_dir: dirs.output(),
            earth_json: dirs.root().join("earth").join("wind.json"),
            mode,
            frame: 1,
            ..ConverterConfig::default()
        };
        (dirs, config, dataset)
    }

    fn read_records(path: &Path) -> Vec<EarthRecord> {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(
            frame_artifacts("gfs", OutputMode::Container, 4),
            vec!["gfs.bin".to_string()]
        );
        assert_eq!(
            frame_artifacts("gfs", OutputMode::Raster, 2),
            vec!["gfs/2.coords.png".to_string(), "gfs/2.uv.png".to_string()]
        );
        assert_eq!(series_artifacts("gfs", OutputMode::Container, 5).len(), 1);
        let rasters = series_artifacts("gfs", OutputMode::Raster, 3);
        assert_eq!(rasters.len(), 6);
        assert_eq!(rasters[0], "gfs/0.coords.png");
        assert_eq!(rasters[5], "gfs/2.uv.png");
    }

    #[test]
    fn test_show_only_exports_raw_values() {
        let (_dirs, config, dataset) = setup(OutputMode::Container);
        let converter =
            Converter::new(config, ArtifactStore::in_memory()).with_earth_options(earth());

        let path = converter.show_only("gfs").unwrap();
        let [u, v]: [EarthRecord; 2] = read_records(&path).try_into().unwrap();
        let frame = dataset.series.frame(1).unwrap();
        assert_eq!(u.data, frame.a.flipped_rows());
        assert_eq!(v.data, frame.b.flipped_rows());
        assert_eq!((u.header.nx, u.header.ny), (8, 6));
    }

    #[test]
    fn test_frame_out_of_range() {
        let (_dirs, mut config, _) = setup(OutputMode::Container);
        config.frame = 3;
        let converter = Converter::new(config, ArtifactStore::in_memory());
        let err = converter.show_only("gfs").unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn test_container_run_converts_then_downloads() {
        let (_dirs, config, dataset) = setup(OutputMode::Container);
        let store = ArtifactStore::in_memory().with_prefix("runs");

        let first = Converter::new(config.clone(), store.clone()).with_earth_options(earth());
        let summary = first.run("gfs").await.unwrap();
        assert_eq!(summary.provenance, Provenance::Converted);
        assert_eq!(summary.artifacts, vec!["gfs.bin".to_string()]);
        assert!(store.exists("gfs.bin").await.unwrap());

        let records = read_records(&summary.earth_json);
        assert_eq!(records[0].data, dataset.series.frame(1).unwrap().a.flipped_rows());

        // A fresh workspace against the same store pulls the container back.
        let other = ScratchDirs::new().unwrap();
        let config = ConverterConfig {
            input_dir: other.input(),
            output_dir: other.output(),
            earth_json: other.root().join("wind.json"),
            ..config
        };
        let second = Converter::new(config, store).with_earth_options(earth());
        let summary = second.run("gfs").await.unwrap();
        assert_eq!(summary.provenance, Provenance::Downloaded);
        assert!(other.output().join("gfs.bin").exists());
        assert_eq!(read_records(&summary.earth_json), records);
    }

    #[tokio::test]
    async fn test_raster_run_stays_within_quantization_error() {
        let (dirs, config, dataset) = setup(OutputMode::Raster);
        let store = ArtifactStore::in_memory();
        let converter = Converter::new(config, store.clone()).with_earth_options(earth());

        let summary = converter.run("gfs").await.unwrap();
        assert_eq!(summary.provenance, Provenance::Converted);
        assert_eq!(summary.artifacts.len(), 6);
        for artifact in &summary.artifacts {
            assert!(store.exists(artifact).await.unwrap(), "{}", artifact);
            assert!(dirs.output().join(artifact).exists());
        }

        let [u, v]: [EarthRecord; 2] = read_records(&summary.earth_json).try_into().unwrap();
        let frame = dataset.series.frame(1).unwrap();
        let step = 100.0 / 65535.0;
        test_utils::assert_all_within!(&u.data, &frame.a.flipped_rows(), step);
        test_utils::assert_all_within!(&v.data, &frame.b.flipped_rows(), step);
        assert!((u.header.la1 - 90.0).abs() < 0.01);
        assert!((u.header.la2 + 90.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_raster_run_downloads_selected_frame() {
        let (_dirs, config, _) = setup(OutputMode::Raster);
        let store = ArtifactStore::in_memory();
        Converter::new(config.clone(), store.clone())
            .run("gfs")
            .await
            .unwrap();

        let other = ScratchDirs::new().unwrap();
        let config = ConverterConfig {
            output_dir: other.output(),
            earth_json: other.root().join("wind.json"),
            ..config
        };
        let summary = Converter::new(config, store).run("gfs").await.unwrap();
        assert_eq!(summary.provenance, Provenance::Downloaded);
        assert_eq!(summary.artifacts, frame_artifacts("gfs", OutputMode::Raster, 1));
        assert!(!other.output().join("gfs/0.uv.png").exists());
        assert!(other.output().join("gfs/1.uv.png").exists());
    }
}
