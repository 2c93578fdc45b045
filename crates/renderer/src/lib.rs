//! File and document outputs for encoded wind data.
//!
//! - PNG files holding encoded rasters (RGBA, 8 bits per channel)
//! - Earth-style JSON documents for the globe visualization

pub mod earth;
pub mod png;

pub use earth::{
    records_from_axes, records_from_decoded, write_earth_json, write_earth_json_file,
    EarthHeader, EarthOptions, EarthRecord,
};
pub use png::{decode_raster_png, encode_raster_png, read_raster_png, write_raster_png};
