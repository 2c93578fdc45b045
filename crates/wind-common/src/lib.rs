//! Common types shared across the windpack crates.

pub mod error;
pub mod grid;
pub mod range;

pub use error::{CodecError, CodecResult};
pub use grid::{min_max, BoundingBox, Coordinates, Frame, Grid, TimeSeries, WindDataset};
pub use range::{ChannelPair, ChannelRange, QUANT_LEVELS};
