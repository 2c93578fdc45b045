//! Sequential and data-parallel strategies must produce identical bytes.

use std::sync::Arc;

use proptest::prelude::*;
use raster_codec::engine::CellInput;
use raster_codec::{
    ChannelPair, ChannelRange, DataParallelStrategy, GridCodec, GridCodecStrategy, RayonDevice,
    SequentialStrategy, SeriesRanges,
};
use test_utils::fixtures::grid;
use test_utils::{create_coordinates, create_wind_frame, create_wind_series};
use wind_common::Grid;

fn parallel(tile_rows: usize, tile_cols: usize) -> DataParallelStrategy<RayonDevice> {
    DataParallelStrategy::new(RayonDevice::new(Some(4)).unwrap(), tile_rows, tile_cols)
}

fn sample() -> impl Strategy<Value = f32> {
    prop_oneof![
        8 => -80.0f32..80.0,
        1 => Just(f32::NAN),
        1 => prop_oneof![Just(f32::INFINITY), Just(f32::NEG_INFINITY), Just(-0.0f32)],
    ]
}

fn grids() -> impl Strategy<Value = (Grid, Grid)> {
    (1usize..40, 1usize..40).prop_flat_map(|(rows, cols)| {
        (
            proptest::collection::vec(sample(), rows * cols),
            proptest::collection::vec(sample(), rows * cols),
        )
            .prop_map(move |(a, b)| {
                (
                    Grid::new(rows, cols, a).unwrap(),
                    Grid::new(rows, cols, b).unwrap(),
                )
            })
    })
}

fn ranges() -> impl Strategy<Value = ChannelPair> {
    (-100.0f64..0.0, 1.0f64..100.0, -100.0f64..0.0, 1.0f64..100.0).prop_map(|(a0, a1, b0, b1)| {
        ChannelPair::new(
            ChannelRange::new(a0, a1).unwrap(),
            ChannelRange::new(b0, b1).unwrap(),
        )
    })
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_encode_is_strategy_independent(
        (a, b) in grids(),
        ranges in ranges(),
        tile_rows in 1usize..20,
        tile_cols in 1usize..20,
    ) {
        let input = CellInput::Grids { a: &a, b: &b };
        let expected = SequentialStrategy.encode(&input, &ranges);
        let actual = parallel(tile_rows, tile_cols).encode(&input, &ranges);
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_decode_is_strategy_independent(
        (a, b) in grids(),
        tile in 1usize..20,
    ) {
        let raster = SequentialStrategy.encode(&CellInput::Grids { a: &a, b: &b }, &ChannelPair::WIND);
        let expected = SequentialStrategy.decode(&raster, &ChannelPair::WIND).unwrap();
        let actual = parallel(tile, tile).decode(&raster, &ChannelPair::WIND).unwrap();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_axes_encode_is_strategy_independent(
        rows in 1usize..50,
        cols in 1usize..50,
        tile in 1usize..20,
    ) {
        let coords = create_coordinates(rows, cols);
        let axes = CellInput::Axes { rows: &coords.lat, cols: &coords.lon };
        let expected = SequentialStrategy.encode(&axes, &ChannelPair::COORDS);

        let strategy = parallel(tile, tile);
        let resident = strategy.make_resident(&coords.lat, &coords.lon).unwrap();
        prop_assert_eq!(&strategy.encode(&axes, &ChannelPair::COORDS), &expected);
        prop_assert_eq!(&strategy.encode(&CellInput::Resident(&resident), &ChannelPair::COORDS), &expected);
    }
}

// ============================================================================
// Tile boundary cases
// ============================================================================

#[test]
fn test_edge_case_shapes_match() {
    for spec in grid::EDGE_CASES {
        let frame = create_wind_frame(spec.rows, spec.cols, 0.7);
        let input = CellInput::Grids { a: &frame.a, b: &frame.b };
        let expected = SequentialStrategy.encode(&input, &ChannelPair::WIND);
        let actual = parallel(16, 16).encode(&input, &ChannelPair::WIND);
        assert_eq!(actual, expected, "mismatch for {:?}", spec);
    }
}

#[test]
fn test_series_is_strategy_independent() {
    let coords = create_coordinates(grid::RAGGED.rows, grid::RAGGED.cols);
    let series = create_wind_series(grid::RAGGED.rows, grid::RAGGED.cols, 3);

    let sequential = GridCodec::sequential();
    let accelerated = GridCodec::with_strategy(Arc::new(parallel(16, 16)));

    let a: Vec<_> = sequential
        .encode_series(&coords, &series, SeriesRanges::default())
        .unwrap()
        .iter()
        .map(Result::unwrap)
        .collect();
    let b: Vec<_> = accelerated
        .encode_series(&coords, &series, SeriesRanges::default())
        .unwrap()
        .iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(a, b);
}
