//! Grid codec: applies the scalar codec across whole frames.

use std::sync::Arc;

use tracing::{debug, instrument};
use wind_common::{ChannelPair, CodecError, CodecResult, Coordinates, Frame, Grid, TimeSeries};

use crate::config::CodecConfig;
use crate::engine::{
    select_strategy, CellInput, GridCodecStrategy, SequentialStrategy, StrategyKind,
};
use crate::raster::Raster;
use crate::series::{SeriesEncoding, SeriesRanges};

/// Encode two grids into a raster on the calling thread.
pub fn encode_frame(a: &Grid, b: &Grid, ranges: &ChannelPair) -> CodecResult<Raster> {
    GridCodec::sequential().encode_frame(a, b, ranges)
}

/// Decode a raster into two grids on the calling thread.
pub fn decode_frame(raster: &Raster, ranges: &ChannelPair) -> CodecResult<Frame> {
    GridCodec::sequential().decode_frame(raster, ranges)
}

/// Frame-level codec bound to an execution strategy.
///
/// The strategy is an execution detail; every strategy yields the same bytes.
#[derive(Debug, Clone)]
pub struct GridCodec {
    strategy: Arc<dyn GridCodecStrategy>,
    reuse_coords_raster: bool,
}

impl GridCodec {
    /// Build a codec, selecting the strategy from `config`.
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            strategy: select_strategy(config),
            reuse_coords_raster: config.reuse_coords_raster,
        }
    }

    /// A codec that always runs sequentially.
    pub fn sequential() -> Self {
        Self::with_strategy(Arc::new(SequentialStrategy))
    }

    /// A codec bound to a specific strategy.
    pub fn with_strategy(strategy: Arc<dyn GridCodecStrategy>) -> Self {
        Self {
            strategy,
            reuse_coords_raster: true,
        }
    }

    /// Recompute the coordinates raster for every frame of a series instead of
    /// reusing the first one.
    pub fn recompute_coords_per_frame(mut self) -> Self {
        self.reuse_coords_raster = false;
        self
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub(crate) fn strategy(&self) -> &dyn GridCodecStrategy {
        self.strategy.as_ref()
    }

    pub(crate) fn reuses_coords_raster(&self) -> bool {
        self.reuse_coords_raster
    }

    /// Encode two co-registered grids into a raster.
    #[instrument(skip_all, fields(strategy = %self.strategy.kind(), rows = a.rows(), cols = a.cols()))]
    pub fn encode_frame(&self, a: &Grid, b: &Grid, ranges: &ChannelPair) -> CodecResult<Raster> {
        if a.shape() != b.shape() {
            return Err(CodecError::shape_mismatch(a.shape(), b.shape()));
        }
        let raster = self.strategy.encode(&CellInput::Grids { a, b }, ranges);
        debug!("Encoded frame");
        Ok(raster)
    }

    /// Encode a frame pair.
    pub fn encode(&self, frame: &Frame, ranges: &ChannelPair) -> CodecResult<Raster> {
        self.encode_frame(&frame.a, &frame.b, ranges)
    }

    /// Encode coordinate axes: latitude by row, longitude by column.
    pub fn encode_coords(&self, coords: &Coordinates, ranges: &ChannelPair) -> Raster {
        self.strategy.encode(
            &CellInput::Axes {
                rows: &coords.lat,
                cols: &coords.lon,
            },
            ranges,
        )
    }

    /// Decode a raster into its two grids.
    #[instrument(skip_all, fields(strategy = %self.strategy.kind(), rows = raster.rows(), cols = raster.cols()))]
    pub fn decode_frame(&self, raster: &Raster, ranges: &ChannelPair) -> CodecResult<Frame> {
        self.strategy.decode(raster, ranges)
    }

    /// Lazily encode a whole series into per-frame raster pairs.
    pub fn encode_series<'a>(
        &'a self,
        coords: &'a Coordinates,
        series: &'a TimeSeries,
        ranges: SeriesRanges,
    ) -> CodecResult<SeriesEncoding<'a>> {
        SeriesEncoding::new(self, coords, series, ranges)
    }
}

impl Default for GridCodec {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch() {
        let a = Grid::filled(2, 3, 0.0);
        let b = Grid::filled(3, 2, 0.0);
        assert!(matches!(
            encode_frame(&a, &b, &ChannelPair::WIND),
            Err(CodecError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_wind_scenario_2x2() {
        let u = Grid::from_rows(&[vec![-50.0, 0.0], vec![50.0, 25.0]]).unwrap();
        let v = Grid::from_rows(&[vec![0.0, -50.0], vec![25.0, 50.0]]).unwrap();
        let raster = encode_frame(&u, &v, &ChannelPair::WIND).unwrap();
        let frame = decode_frame(&raster, &ChannelPair::WIND).unwrap();

        let bound = 100.0 / 65535.0;
        for (orig, back) in u.as_slice().iter().zip(frame.a.as_slice()) {
            assert!((orig - back).abs() <= bound, "{} vs {}", orig, back);
        }
        for (orig, back) in v.as_slice().iter().zip(frame.b.as_slice()) {
            assert!((orig - back).abs() <= bound, "{} vs {}", orig, back);
        }
    }

    #[test]
    fn test_coords_broadcast_matches_grids() {
        let coords = Coordinates::new(vec![45.0, 0.0, -45.0], vec![-90.0, 0.0, 90.0, 179.0]);
        let codec = GridCodec::sequential();
        let from_axes = codec.encode_coords(&coords, &ChannelPair::COORDS);
        let from_grids = codec.encode(&coords.to_frame(), &ChannelPair::COORDS).unwrap();
        assert_eq!(from_axes, from_grids);
    }

    #[test]
    fn test_default_codec_uses_accelerator() {
        assert_eq!(GridCodec::default().strategy_kind(), StrategyKind::DataParallel);
        assert_eq!(GridCodec::sequential().strategy_kind(), StrategyKind::Sequential);
    }
}
