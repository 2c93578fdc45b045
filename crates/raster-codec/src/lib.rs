//! Fixed-point raster encoding for paired geophysical grids
//!
//! This crate packs two co-registered scalar fields (latitude/longitude or
//! u/v wind) into RGBA rasters with 16 bits per channel, and restores them
//! with an error bounded by one quantization step. It provides:
//!
//! - **Scalar codec**: clamp, quantize and split into big-endian halves
//! - **Grid codec**: the scalar codec over every cell of a frame
//! - **Interchangeable execution**: sequential, or tiled data-parallel on a
//!   compute device, with byte-identical output
//! - **Series pipeline**: lazy per-frame raster pairs, or one raw container
//!
//! # Architecture
//!
//! ```text
//! Coordinates + TimeSeries
//!      │
//!      ▼
//! GridCodec::encode_series()
//!      │
//!      ├─► SeriesIter (owns the coordinate cache)
//!      │         │
//!      │         ├─► coords raster: once per series, or per frame
//!      │         │
//!      │         └─► wind raster: one per frame
//!      │
//!      └─► GridCodecStrategy
//!               │
//!               ├─► SequentialStrategy (rows, then cols)
//!               │
//!               └─► DataParallelStrategy<D: ComputeDevice>
//!                        upload ─► tiled launch ─► copy back
//! ```
//!
//! # Example
//!
//! ```ignore
//! use raster_codec::{CodecConfig, GridCodec, SeriesRanges};
//!
//! let codec = GridCodec::new(&CodecConfig::from_env());
//! for frame in codec.encode_series(&coords, &series, SeriesRanges::default())? {
//!     let frame = frame?;
//!     write_png(format!("{}.coords.png", frame.index), &frame.coords)?;
//!     write_png(format!("{}.uv.png", frame.index), &frame.wind)?;
//! }
//! ```

pub mod codec;
pub mod config;
pub mod container;
pub mod engine;
pub mod quantize;
pub mod raster;
pub mod series;

// Re-export commonly used types at crate root
pub use codec::{decode_frame, encode_frame, GridCodec};
pub use config::CodecConfig;
pub use container::BinaryContainer;
pub use engine::{
    select_strategy, select_strategy_with, ComputeDevice, DataParallelStrategy, GridCodecStrategy,
    RayonDevice, SequentialStrategy, StrategyKind,
};
pub use quantize::{decode_scalar, encode_scalar, pack, unpack, Pixel};
pub use raster::Raster;
pub use series::{
    decode_series, encode_series_to_container, DecodedFrame, EncodedFrame, OutputMode,
    SeriesEncoding, SeriesIter, SeriesRanges,
};
pub use wind_common::{ChannelPair, ChannelRange, CodecError, CodecResult};
