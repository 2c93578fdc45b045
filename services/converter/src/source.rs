//! Loading wind datasets from the input directory.
//!
//! `{name}.nc` is read when the `netcdf` feature is enabled and the file
//! exists; otherwise `{name}.bin` is read as a binary container.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use raster_codec::BinaryContainer;
use tracing::{info, instrument};
use wind_common::WindDataset;

#[cfg(feature = "netcdf")]
pub const VAR_U: &str = "u";
#[cfg(feature = "netcdf")]
pub const VAR_V: &str = "v";
#[cfg(feature = "netcdf")]
pub const VAR_LAT: &str = "latitude";
#[cfg(feature = "netcdf")]
pub const VAR_LON: &str = "longitude";

/// Candidate source files for a dataset name, in lookup order.
pub fn source_paths(input_dir: &Path, name: &str) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(2);
    if cfg!(feature = "netcdf") {
        paths.push(input_dir.join(format!("{}.nc", name)));
    }
    paths.push(input_dir.join(format!("{}.bin", name)));
    paths
}

/// Load coordinates and the wind series for `name`.
#[instrument]
pub fn load_dataset(input_dir: &Path, name: &str) -> Result<WindDataset> {
    let Some(path) = source_paths(input_dir, name)
        .into_iter()
        .find(|p| p.exists())
    else {
        if input_dir.join(format!("{}.nc", name)).exists() {
            bail!(
                "{}.nc found in {} but NetCDF support is not built in (enable the `netcdf` feature)",
                name,
                input_dir.display()
            );
        }
        bail!("no dataset named '{}' in {}", name, input_dir.display());
    };

    let dataset = match path.extension().and_then(|e| e.to_str()) {
        #[cfg(feature = "netcdf")]
        Some("nc") => netcdf_source::load(&path)?,
        _ => load_container(&path)?,
    };

    info!(
        path = %path.display(),
        rows = dataset.series.rows(),
        cols = dataset.series.cols(),
        frames = dataset.series.len(),
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Read a binary container file into a dataset.
pub fn load_container(path: &Path) -> Result<WindDataset> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let container = BinaryContainer::read(BufReader::new(file))
        .with_context(|| format!("parsing container {}", path.display()))?;
    Ok(container.into_dataset()?)
}

#[cfg(feature = "netcdf")]
mod netcdf_source {
    use std::path::Path;

    use anyhow::{anyhow, bail, Context, Result};
    use wind_common::{Coordinates, TimeSeries, WindDataset};

    use super::{VAR_LAT, VAR_LON, VAR_U, VAR_V};

    pub fn load(path: &Path) -> Result<WindDataset> {
        let file =
            netcdf::open(path).with_context(|| format!("opening NetCDF {}", path.display()))?;

        let lat = read_values(&file, VAR_LAT)?;
        let lon = read_values(&file, VAR_LON)?;
        let (rows, cols) = (lat.len(), lon.len());

        let u = read_wind(&file, VAR_U, rows, cols)?;
        let v = read_wind(&file, VAR_V, rows, cols)?;

        let series = TimeSeries::from_stacked(rows, cols, u, v)?;
        Ok(WindDataset::new(Coordinates::new(lat, lon), series)?)
    }

    fn read_values(file: &netcdf::File, name: &str) -> Result<Vec<f32>> {
        let var = file
            .variable(name)
            .ok_or_else(|| anyhow!("missing variable '{}'", name))?;
        let values: Vec<f32> = var
            .get_values(..)
            .with_context(|| format!("reading '{}'", name))?;

        let fill = get_f32_attr(&var, "_FillValue");
        let scale = get_f32_attr(&var, "scale_factor").unwrap_or(1.0);
        let offset = get_f32_attr(&var, "add_offset").unwrap_or(0.0);

        Ok(values
            .into_iter()
            .map(|val| match fill {
                Some(fill) if val == fill => f32::NAN,
                _ => val * scale + offset,
            })
            .collect())
    }

    /// Read a wind component as stacked `[time, rows, cols]` values.
    ///
    /// Singleton dimensions do not change the flat layout, so only the cell
    /// count is checked.
    fn read_wind(file: &netcdf::File, name: &str, rows: usize, cols: usize) -> Result<Vec<f32>> {
        let var = file
            .variable(name)
            .ok_or_else(|| anyhow!("missing variable '{}'", name))?;
        let cells: usize = var.dimensions().iter().map(|d| d.len()).product();
        let frame = rows * cols;
        if frame == 0 || cells % frame != 0 {
            bail!(
                "'{}' holds {} values, not whole {}x{} frames",
                name,
                cells,
                rows,
                cols
            );
        }

        read_values(file, name)
    }

    fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
        if !var.attributes().any(|attr| attr.name() == name) {
            return None;
        }
        let attr_value = var.attribute_value(name)?.ok()?;
        f32::try_from(attr_value).ok()
    }
}
