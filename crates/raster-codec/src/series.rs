//! Time-series pipeline: per-frame raster pairs or one flat container.

use std::iter::FusedIterator;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use wind_common::{
    BoundingBox, ChannelPair, CodecError, CodecResult, Coordinates, Frame, TimeSeries,
};

use crate::codec::GridCodec;
use crate::container::BinaryContainer;
use crate::engine::{CellInput, ResidentAxes};
use crate::raster::Raster;

/// Ranges for the two rasters of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesRanges {
    pub coords: ChannelPair,
    pub wind: ChannelPair,
}

impl Default for SeriesRanges {
    fn default() -> Self {
        Self {
            coords: ChannelPair::COORDS,
            wind: ChannelPair::WIND,
        }
    }
}

/// How a converted series is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Two PNG rasters per frame.
    #[default]
    Raster,
    /// One binary container for the whole series.
    Container,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raster => "raster",
            Self::Container => "container",
        }
    }

    /// File extension of the artifacts.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Raster => "png",
            Self::Container => "bin",
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" | "raster" => Ok(Self::Raster),
            "bin" | "container" => Ok(Self::Container),
            other => Err(format!("unknown output mode '{}', expected png or bin", other)),
        }
    }
}

/// Flatten coordinates and every frame's raw U then V values.
pub fn encode_series_to_container(
    coords: &Coordinates,
    series: &TimeSeries,
) -> CodecResult<BinaryContainer> {
    BinaryContainer::from_parts(coords, series)
}

/// A lazily encoded series. Each call to [`iter`](Self::iter) starts over.
#[derive(Debug, Clone, Copy)]
pub struct SeriesEncoding<'a> {
    codec: &'a GridCodec,
    coords: &'a Coordinates,
    series: &'a TimeSeries,
    ranges: SeriesRanges,
}

impl<'a> SeriesEncoding<'a> {
    pub(crate) fn new(
        codec: &'a GridCodec,
        coords: &'a Coordinates,
        series: &'a TimeSeries,
        ranges: SeriesRanges,
    ) -> CodecResult<Self> {
        if coords.shape() != series.shape() {
            return Err(CodecError::shape_mismatch(series.shape(), coords.shape()));
        }
        Ok(Self {
            codec,
            coords,
            series,
            ranges,
        })
    }

    /// Number of frames the iteration yields.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> SeriesIter<'a> {
        SeriesIter {
            encoding: *self,
            next: 0,
            cache: None,
        }
    }
}

impl<'a> IntoIterator for SeriesEncoding<'a> {
    type Item = CodecResult<EncodedFrame>;
    type IntoIter = SeriesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &SeriesEncoding<'a> {
    type Item = CodecResult<EncodedFrame>;
    type IntoIter = SeriesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The raster pair of one encoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub index: usize,
    pub coords: Raster,
    pub wind: Raster,
}

impl EncodedFrame {
    pub fn into_pair(self) -> (Raster, Raster) {
        (self.coords, self.wind)
    }
}

/// Coordinate state shared by the frames of one iteration.
#[derive(Debug)]
struct SeriesCache {
    resident: Option<ResidentAxes>,
    coords_raster: Option<Raster>,
}

/// Iterator over the frames of a [`SeriesEncoding`], in index order.
///
/// The coordinate cache is built on the first frame and dropped as soon as
/// the last frame has been produced.
#[derive(Debug)]
pub struct SeriesIter<'a> {
    encoding: SeriesEncoding<'a>,
    next: usize,
    cache: Option<SeriesCache>,
}

impl<'a> SeriesIter<'a> {
    fn coords_raster(&mut self) -> Raster {
        let SeriesEncoding {
            codec,
            coords,
            series,
            ranges,
        } = self.encoding;

        let cache = self.cache.get_or_insert_with(|| {
            let resident = codec.strategy().make_resident(&coords.lat, &coords.lon);
            debug!(
                resident = resident.is_some(),
                frames = series.len(),
                "Created series coordinate cache"
            );
            SeriesCache {
                resident,
                coords_raster: None,
            }
        });

        if let Some(raster) = &cache.coords_raster {
            return raster.clone();
        }

        let input = match &cache.resident {
            Some(axes) => CellInput::Resident(axes),
            None => CellInput::Axes {
                rows: &coords.lat,
                cols: &coords.lon,
            },
        };
        let raster = codec.strategy().encode(&input, &ranges.coords);
        if codec.reuses_coords_raster() {
            cache.coords_raster = Some(raster.clone());
        }
        raster
    }

    fn release(&mut self) {
        if self.cache.take().is_some() {
            debug!("Released series coordinate cache");
        }
    }
}

impl<'a> Iterator for SeriesIter<'a> {
    type Item = CodecResult<EncodedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let SeriesEncoding {
            codec,
            series,
            ranges,
            ..
        } = self.encoding;
        let index = self.next;
        let frame = series.frame(index)?;
        self.next += 1;

        let coords = self.coords_raster();
        let wind = codec.encode(frame, &ranges.wind);

        if self.next == series.len() {
            self.release();
        }

        Some(wind.map(|wind| EncodedFrame {
            index,
            coords,
            wind,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.encoding.series.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SeriesIter<'_> {}

impl FusedIterator for SeriesIter<'_> {}

/// One reconstructed frame pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub index: usize,
    pub coords: Frame,
    pub wind: Frame,
}

impl DecodedFrame {
    /// Geographic extent of the decoded coordinates.
    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_frame(&self.coords)
    }
}

/// Lazily decode `(coords, wind)` raster pairs, in order.
///
/// A pair whose rasters differ in shape yields `ShapeMismatch`.
pub fn decode_series<'a, I>(
    codec: &'a GridCodec,
    rasters: I,
    ranges: SeriesRanges,
) -> impl Iterator<Item = CodecResult<DecodedFrame>> + 'a
where
    I: IntoIterator<Item = (Raster, Raster)>,
    I::IntoIter: 'a,
{
    rasters
        .into_iter()
        .enumerate()
        .map(move |(index, (coords, wind))| {
            if coords.shape() != wind.shape() {
                return Err(CodecError::shape_mismatch(coords.shape(), wind.shape()));
            }
            Ok(DecodedFrame {
                index,
                coords: codec.decode_frame(&coords, &ranges.coords)?,
                wind: codec.decode_frame(&wind, &ranges.wind)?,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use wind_common::Grid;

    fn dataset(frames: usize) -> (Coordinates, TimeSeries) {
        let coords = Coordinates::new(vec![30.0, 20.0, 10.0], vec![100.0, 110.0, 120.0, 130.0]);
        let frames = (0..frames)
            .map(|t| {
                let u = (0..12).map(|i| (i + t) as f32 - 6.0).collect();
                let v = (0..12).map(|i| 6.0 - (i * t) as f32 * 0.5).collect();
                Frame::new(Grid::new(3, 4, u).unwrap(), Grid::new(3, 4, v).unwrap()).unwrap()
            })
            .collect();
        (coords, TimeSeries::new(frames).unwrap())
    }

    #[test]
    fn test_encode_series_in_order() {
        let (coords, series) = dataset(3);
        let codec = GridCodec::sequential();
        let encoding = codec
            .encode_series(&coords, &series, SeriesRanges::default())
            .unwrap();

        let mut iter = encoding.iter();
        assert_eq!(iter.len(), 3);
        let frames: Vec<EncodedFrame> = iter.by_ref().map(Result::unwrap).collect();
        assert!(iter.next().is_none());
        assert_eq!(frames.iter().map(|f| f.index).collect::<Vec<_>>(), vec![0, 1, 2]);

        for (t, frame) in frames.iter().enumerate() {
            let expected = codec.encode(series.frame(t).unwrap(), &ChannelPair::WIND).unwrap();
            assert_eq!(frame.wind, expected);
            assert_eq!(frame.coords, frames[0].coords);
        }
    }

    #[test]
    fn test_encoding_is_restartable() {
        let (coords, series) = dataset(2);
        let codec = GridCodec::new(&CodecConfig::default());
        let encoding = codec
            .encode_series(&coords, &series, SeriesRanges::default())
            .unwrap();
        let first: Vec<_> = encoding.iter().map(Result::unwrap).collect();
        let second: Vec<_> = encoding.into_iter().map(Result::unwrap).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_recomputed_coords_match_reused() {
        let (coords, series) = dataset(3);
        let config = CodecConfig::default();
        let reused = GridCodec::new(&config);
        let recomputed = GridCodec::new(&config).recompute_coords_per_frame();

        let a: Vec<_> = reused
            .encode_series(&coords, &series, SeriesRanges::default())
            .unwrap()
            .iter()
            .map(Result::unwrap)
            .collect();
        let b: Vec<_> = recomputed
            .encode_series(&coords, &series, SeriesRanges::default())
            .unwrap()
            .iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_released_after_last_frame() {
        let (coords, series) = dataset(2);
        let codec = GridCodec::new(&CodecConfig::default());
        let encoding = codec
            .encode_series(&coords, &series, SeriesRanges::default())
            .unwrap();
        let mut iter = encoding.iter();
        assert!(iter.cache.is_none());
        iter.next().unwrap().unwrap();
        assert!(iter.cache.is_some());
        iter.next().unwrap().unwrap();
        assert!(iter.cache.is_none());
    }

    #[test]
    fn test_decode_rejects_mismatched_pair() {
        let codec = GridCodec::sequential();
        let pairs = vec![
            (Raster::zeroed(3, 4), Raster::zeroed(3, 4)),
            (Raster::zeroed(3, 4), Raster::zeroed(5, 5)),
        ];
        let mut decoded = decode_series(&codec, pairs, SeriesRanges::default());

        assert!(decoded.next().unwrap().is_ok());
        match decoded.next().unwrap() {
            Err(CodecError::ShapeMismatch {
                expected_rows,
                expected_cols,
                actual_rows,
                actual_cols,
            }) => {
                assert_eq!((expected_rows, expected_cols), (3, 4));
                assert_eq!((actual_rows, actual_cols), (5, 5));
            }
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_coords_shape_checked() {
        let (_, series) = dataset(1);
        let coords = Coordinates::new(vec![0.0; 2], vec![0.0; 4]);
        let codec = GridCodec::sequential();
        assert!(matches!(
            codec.encode_series(&coords, &series, SeriesRanges::default()),
            Err(CodecError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_series_round_trip() {
        let (coords, series) = dataset(2);
        let codec = GridCodec::sequential();
        let pairs: Vec<(Raster, Raster)> = codec
            .encode_series(&coords, &series, SeriesRanges::default())
            .unwrap()
            .iter()
            .map(|f| f.unwrap().into_pair())
            .collect();

        let decoded: Vec<DecodedFrame> = decode_series(&codec, pairs, SeriesRanges::default())
            .map(Result::unwrap)
            .collect();
        assert_eq!(decoded.len(), 2);

        let wind_step = ChannelPair::WIND.a.step() as f32;
        for (t, frame) in decoded.iter().enumerate() {
            assert_eq!(frame.index, t);
            let original = series.frame(t).unwrap();
            for (x, y) in original.a.as_slice().iter().zip(frame.wind.a.as_slice()) {
                assert!((x - y).abs() <= wind_step);
            }
        }

        let bbox = decoded[0].bbox().unwrap();
        assert!((bbox.min_lon - 100.0).abs() < 0.01);
        assert!((bbox.max_lat - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_series_to_container() {
        let (coords, series) = dataset(2);
        let container = encode_series_to_container(&coords, &series).unwrap();
        assert_eq!(container.frames(), 2);
        assert_eq!(container.u()[12], series.frame(1).unwrap().a.as_slice()[0]);
        assert_eq!(container.v().len(), 24);
    }

    #[test]
    fn test_output_mode_parse() {
        assert_eq!("png".parse::<OutputMode>().unwrap(), OutputMode::Raster);
        assert_eq!("BIN".parse::<OutputMode>().unwrap(), OutputMode::Container);
        assert!("tiff".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::Container.extension(), "bin");
    }
}
