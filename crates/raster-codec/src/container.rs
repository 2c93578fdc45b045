//! Flat binary container for raw, non-quantized series.
//!
//! Layout (all scalars little-endian, no padding):
//!
//! ```text
//! [rows: u32][cols: u32]
//! [lat: f32 x rows][lon: f32 x cols]
//! [u: f32 x frames x rows x cols]
//! [v: f32 x frames x rows x cols]
//! ```
//!
//! The frame count is not stored; readers infer it from the payload length.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, instrument};
use wind_common::{CodecError, CodecResult, Coordinates, TimeSeries, WindDataset};

/// Size of the `[rows][cols]` header.
pub const HEADER_LEN: usize = 8;

const F32_LEN: usize = 4;

/// Coordinates plus stacked U/V values in their original precision.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryContainer {
    rows: u32,
    cols: u32,
    lat: Vec<f32>,
    lon: Vec<f32>,
    u: Vec<f32>,
    v: Vec<f32>,
}

impl BinaryContainer {
    /// Assemble a container, checking every array against the header.
    pub fn new(
        rows: u32,
        cols: u32,
        lat: Vec<f32>,
        lon: Vec<f32>,
        u: Vec<f32>,
        v: Vec<f32>,
    ) -> CodecResult<Self> {
        let cells = frame_cells(rows, cols)?;
        if lat.len() != rows as usize || lon.len() != cols as usize {
            return Err(CodecError::shape_mismatch(
                (rows as usize, cols as usize),
                (lat.len(), lon.len()),
            ));
        }
        if u.len() != v.len() || u.is_empty() || u.len() % cells != 0 {
            return Err(CodecError::MalformedHeader(format!(
                "u/v hold {}/{} values, expected equal whole frames of {}x{}",
                u.len(),
                v.len(),
                rows,
                cols
            )));
        }
        Ok(Self {
            rows,
            cols,
            lat,
            lon,
            u,
            v,
        })
    }

    /// Flatten coordinates and a series, frame by frame.
    pub fn from_parts(coords: &Coordinates, series: &TimeSeries) -> CodecResult<Self> {
        if coords.shape() != series.shape() {
            return Err(CodecError::shape_mismatch(coords.shape(), series.shape()));
        }
        let rows = to_u32(coords.rows(), "rows")?;
        let cols = to_u32(coords.cols(), "cols")?;
        Self::new(
            rows,
            cols,
            coords.lat.clone(),
            coords.lon.clone(),
            series.stacked_a(),
            series.stacked_b(),
        )
    }

    pub fn from_dataset(dataset: &WindDataset) -> CodecResult<Self> {
        Self::from_parts(&dataset.coords, &dataset.series)
    }

    /// Split the container back into coordinates and frames.
    pub fn into_dataset(self) -> CodecResult<WindDataset> {
        let series =
            TimeSeries::from_stacked(self.rows as usize, self.cols as usize, self.u, self.v)?;
        WindDataset::new(Coordinates::new(self.lat, self.lon), series)
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Number of frames, implied by the U payload.
    pub fn frames(&self) -> usize {
        self.u.len() / (self.rows as usize * self.cols as usize)
    }

    pub fn lat(&self) -> &[f32] {
        &self.lat
    }

    pub fn lon(&self) -> &[f32] {
        &self.lon
    }

    pub fn u(&self) -> &[f32] {
        &self.u
    }

    pub fn v(&self) -> &[f32] {
        &self.v
    }

    /// Serialized size in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + F32_LEN * (self.lat.len() + self.lon.len() + self.u.len() + self.v.len())
    }

    /// Serialize to the container layout.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u32_le(self.rows);
        buf.put_u32_le(self.cols);
        for section in [&self.lat, &self.lon, &self.u, &self.v] {
            for &value in section.iter() {
                buf.put_f32_le(value);
            }
        }
        buf.freeze()
    }

    /// Parse the container layout, inferring the frame count.
    pub fn from_bytes(data: &[u8]) -> CodecResult<Self> {
        if data.len() < HEADER_LEN {
            return Err(CodecError::TruncatedInput {
                expected: HEADER_LEN,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let rows = buf.get_u32_le();
        let cols = buf.get_u32_le();
        let cells = frame_cells(rows, cols)?;

        let overflow = || CodecError::MalformedHeader(format!("{}x{} overflows", rows, cols));
        let axes_len = (rows as usize)
            .checked_add(cols as usize)
            .and_then(|n| n.checked_mul(F32_LEN))
            .ok_or_else(overflow)?;
        // One frame is a U grid plus a V grid.
        let frame_len = cells.checked_mul(2 * F32_LEN).ok_or_else(overflow)?;
        let min_len = HEADER_LEN
            .checked_add(axes_len)
            .and_then(|n| n.checked_add(frame_len))
            .ok_or_else(overflow)?;

        if data.len() < min_len {
            return Err(CodecError::TruncatedInput {
                expected: min_len,
                actual: data.len(),
            });
        }

        let payload = buf.remaining() - axes_len;
        let frames = payload / frame_len;
        if payload % frame_len != 0 {
            return Err(CodecError::TruncatedInput {
                expected: HEADER_LEN + axes_len + (frames + 1) * frame_len,
                actual: data.len(),
            });
        }

        let lat = read_f32s(&mut buf, rows as usize);
        let lon = read_f32s(&mut buf, cols as usize);
        let u = read_f32s(&mut buf, frames * cells);
        let v = read_f32s(&mut buf, frames * cells);

        debug!(rows, cols, frames, "Parsed binary container");
        Ok(Self {
            rows,
            cols,
            lat,
            lon,
            u,
            v,
        })
    }

    /// Write the container to a sink.
    #[instrument(skip_all, fields(rows = self.rows, cols = self.cols, frames = self.frames()))]
    pub fn write<W: Write>(&self, mut sink: W) -> CodecResult<()> {
        sink.write_all(&self.to_bytes())?;
        sink.flush()?;
        Ok(())
    }

    /// Read a whole container from a source.
    pub fn read<R: Read>(mut source: R) -> CodecResult<Self> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }
}

fn frame_cells(rows: u32, cols: u32) -> CodecResult<usize> {
    if rows == 0 || cols == 0 {
        return Err(CodecError::MalformedHeader(format!(
            "zero dimension {}x{}",
            rows, cols
        )));
    }
    (rows as usize)
        .checked_mul(cols as usize)
        .ok_or_else(|| CodecError::MalformedHeader(format!("{}x{} overflows", rows, cols)))
}

fn to_u32(value: usize, what: &str) -> CodecResult<u32> {
    u32::try_from(value)
        .map_err(|_| CodecError::MalformedHeader(format!("{} = {} does not fit in u32", what, value)))
}

fn read_f32s(buf: &mut &[u8], count: usize) -> Vec<f32> {
    (0..count).map(|_| buf.get_f32_le()).collect()
}
