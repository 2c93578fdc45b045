//! Export of wind grids as earth-style JSON for the globe visualization.
//!
//! The document is an array of two records, U then V:
//!
//! ```text
//! [{ "header": { nx, ny, lo1, la1, lo2, la2, dx, dy,
//!                parameterUnit, refTime, forecastTime },
//!    "data": [ ...ny * nx values, northernmost row first ] }, ...]
//! ```
//!
//! Rows are flipped vertically before flattening. NaN values serialize as
//! `null`.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Timelike, Utc};
use raster_codec::DecodedFrame;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use wind_common::{min_max, CodecError, CodecResult, Coordinates, Frame, Grid};

/// Unit of the exported wind components.
pub const WIND_UNIT: &str = "m.s-1";

/// Metadata shared by both records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthOptions {
    pub parameter_unit: String,
    pub ref_time: DateTime<Utc>,
    /// Forecast offset from `ref_time`, in hours.
    pub forecast_time: i64,
}

impl Default for EarthOptions {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            parameter_unit: WIND_UNIT.to_string(),
            ref_time: now.with_nanosecond(0).unwrap_or(now),
            forecast_time: 0,
        }
    }
}

/// Grid description of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarthHeader {
    pub nx: usize,
    pub ny: usize,
    pub lo1: f64,
    pub la1: f64,
    pub lo2: f64,
    pub la2: f64,
    pub dx: f64,
    pub dy: f64,
    pub parameter_unit: String,
    pub ref_time: DateTime<Utc>,
    pub forecast_time: i64,
}

/// One channel of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthRecord {
    pub header: EarthHeader,
    pub data: Vec<f32>,
}

/// Build the U and V records from raw coordinate axes and a wind frame.
pub fn records_from_axes(
    coords: &Coordinates,
    wind: &Frame,
    options: &EarthOptions,
) -> CodecResult<[EarthRecord; 2]> {
    if coords.shape() != wind.shape() {
        return Err(CodecError::shape_mismatch(wind.shape(), coords.shape()));
    }
    build_records(&coords.lat, &coords.lon, wind, options)
}

/// Build the U and V records from a decoded frame pair.
pub fn records_from_decoded(
    frame: &DecodedFrame,
    options: &EarthOptions,
) -> CodecResult<[EarthRecord; 2]> {
    if frame.coords.shape() != frame.wind.shape() {
        return Err(CodecError::shape_mismatch(
            frame.wind.shape(),
            frame.coords.shape(),
        ));
    }
    build_records(
        frame.coords.a.as_slice(),
        frame.coords.b.as_slice(),
        &frame.wind,
        options,
    )
}

fn build_records(
    lats: &[f32],
    lons: &[f32],
    wind: &Frame,
    options: &EarthOptions,
) -> CodecResult<[EarthRecord; 2]> {
    let (la2, la1) =
        min_max(lats).ok_or_else(|| CodecError::dataset("latitudes are empty or all NaN"))?;
    let (lo1, lo2) =
        min_max(lons).ok_or_else(|| CodecError::dataset("longitudes are empty or all NaN"))?;

    let (ny, nx) = wind.shape();
    let header = EarthHeader {
        nx,
        ny,
        lo1: lo1 as f64,
        la1: la1 as f64,
        lo2: lo2 as f64,
        la2: la2 as f64,
        dx: spacing(lo2 as f64 - lo1 as f64, nx),
        dy: spacing(la1 as f64 - la2 as f64, ny),
        parameter_unit: options.parameter_unit.clone(),
        ref_time: options.ref_time,
        forecast_time: options.forecast_time,
    };

    Ok([record(header.clone(), &wind.a), record(header, &wind.b)])
}

fn spacing(extent: f64, n: usize) -> f64 {
    if n > 1 {
        extent / (n - 1) as f64
    } else {
        0.0
    }
}

fn record(header: EarthHeader, grid: &Grid) -> EarthRecord {
    EarthRecord {
        header,
        data: grid.flipped_rows(),
    }
}

/// Serialize records as a JSON array.
pub fn write_earth_json<W: Write>(records: &[EarthRecord], writer: W) -> CodecResult<()> {
    serde_json::to_writer(writer, records).map_err(std::io::Error::from)?;
    Ok(())
}

/// Write records to a JSON file, creating parent directories.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_earth_json_file(path: &Path, records: &[EarthRecord]) -> CodecResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_earth_json(records, file)?;
    info!(records = records.len(), "Exported earth JSON");
    Ok(())
}
