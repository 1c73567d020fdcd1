//! Wraparound board geometry.
//!
//! The board is a square of cells with integer coordinates in
//! `[-half_width, half_width]` on both axes. Positions that leave one edge
//! re-enter at the opposite edge, so every coordinate the simulation
//! stores has passed through [`Board::wrap`].

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// A cell coordinate on the board.
pub type Cell = (i32, i32);

/// Largest half-width whose board width `2 * size + 1` fits in `i32`.
pub const MAX_HALF_WIDTH: i32 = (i32::MAX - 1) / 2;

/// Square wraparound board of half-width `half_width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    half_width: i32,
}

impl Board {
    /// Create a board covering `[-half_width, half_width]` on both axes.
    ///
    /// Negative half-widths are treated as zero (a single-cell board) and
    /// half-widths above [`MAX_HALF_WIDTH`] are clamped to it.
    #[must_use]
    pub const fn new(half_width: i32) -> Self {
        let half_width = if half_width < 0 {
            0
        } else if half_width > MAX_HALF_WIDTH {
            MAX_HALF_WIDTH
        } else {
            half_width
        };
        Self { half_width }
    }

    /// Half-width (`size`) of the board.
    #[must_use]
    pub const fn half_width(&self) -> i32 {
        self.half_width
    }

    /// Number of cells along one axis, `2 * size + 1`.
    #[must_use]
    pub const fn width(&self) -> i32 {
        2 * self.half_width + 1
    }

    /// Inclusive coordinate range of one axis.
    #[must_use]
    pub const fn axis(&self) -> RangeInclusive<i32> {
        -self.half_width..=self.half_width
    }

    /// Whether a cell lies on the board.
    #[must_use]
    pub fn contains(&self, (x, y): Cell) -> bool {
        self.axis().contains(&x) && self.axis().contains(&y)
    }

    /// Map a single coordinate onto the board by modular wraparound.
    #[must_use]
    pub fn wrap_coord(&self, v: i32) -> i32 {
        let size = i64::from(self.half_width);
        let width = i64::from(self.width());
        ((i64::from(v) + size).rem_euclid(width) - size) as i32
    }

    /// Map any cell onto the board (Pac-Man topology).
    ///
    /// `wrap((size + 1, y)) == (-size, y)`.
    #[must_use]
    pub fn wrap(&self, (x, y): Cell) -> Cell {
        (self.wrap_coord(x), self.wrap_coord(y))
    }

    /// Rows covered by horizontal band `index` out of `bands`.
    ///
    /// Bands have height `max(1, width / bands)` starting from the bottom
    /// edge; the last band absorbs the remainder so the bands partition the
    /// board. Bands that would start beyond the top edge collapse onto the
    /// top row.
    #[must_use]
    pub fn band(&self, bands: u32, index: u32) -> RangeInclusive<i32> {
        let bands = bands.max(1);
        let index = index % bands;
        let size = i64::from(self.half_width);
        let height = (i64::from(self.width()) / i64::from(bands)).max(1);
        let start = (-size + i64::from(index) * height).min(size);
        let end = if index + 1 == bands {
            size
        } else {
            (start + height - 1).min(size)
        };
        start as i32..=end as i32
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_width() {
        assert_eq!(Board::new(10).width(), 21);
        assert_eq!(Board::new(0).width(), 1);
        assert_eq!(Board::new(-3).half_width(), 0);
    }

    #[test]
    fn test_huge_board_width_fits() {
        let board = Board::new(i32::MAX);
        assert_eq!(board.half_width(), MAX_HALF_WIDTH);
        assert_eq!(board.width(), i32::MAX);
        assert_eq!(board.wrap((i32::MIN, i32::MAX)), board.wrap(board.wrap((i32::MIN, i32::MAX))));
    }

    #[test]
    fn test_wrap_edges() {
        let board = Board::new(10);
        assert_eq!(board.wrap((11, 0)), (-10, 0));
        assert_eq!(board.wrap((-11, 0)), (10, 0));
        assert_eq!(board.wrap((0, 11)), (0, -10));
        assert_eq!(board.wrap((10, -10)), (10, -10));
        assert_eq!(board.wrap((21, 0)), (0, 0));
    }

    #[test]
    fn test_wrap_extreme_values() {
        let board = Board::new(7);
        assert!(board.contains(board.wrap((i32::MAX, i32::MIN))));
    }

    #[test]
    fn test_bands_partition_board() {
        let board = Board::new(20);
        let bands: Vec<_> = (0..4).map(|s| board.band(4, s)).collect();

        assert_eq!(*bands[0].start(), -20);
        assert_eq!(*bands[3].end(), 20);
        for pair in bands.windows(2) {
            assert_eq!(*pair[0].end() + 1, *pair[1].start());
        }
    }

    #[test]
    fn test_band_more_strata_than_rows() {
        let board = Board::new(1);
        for s in 0..10 {
            let band = board.band(10, s);
            assert!(board.axis().contains(band.start()));
            assert!(board.axis().contains(band.end()));
            assert!(band.start() <= band.end());
        }
    }

    proptest! {
        #[test]
        fn prop_wrap_lands_on_board(
            size in 0i32..200,
            k in 1i32..50,
            fx in -1.0f64..1.0,
            fy in -1.0f64..1.0,
        ) {
            let board = Board::new(size);
            let reach = f64::from(k * size.max(1));
            let cell = ((fx * reach) as i32, (fy * reach) as i32);
            prop_assert!(board.contains(board.wrap(cell)));
        }

        #[test]
        fn prop_wrap_is_idempotent(size in 0i32..200, x in any::<i32>(), y in any::<i32>()) {
            let board = Board::new(size);
            let once = board.wrap((x, y));
            prop_assert_eq!(board.wrap(once), once);
        }

        #[test]
        fn prop_wrap_preserves_on_board_cells(size in 0i32..200, fx in -1.0f64..=1.0, fy in -1.0f64..=1.0) {
            let board = Board::new(size);
            let cell = ((fx * f64::from(size)) as i32, (fy * f64::from(size)) as i32);
            prop_assert_eq!(board.wrap(cell), cell);
        }
    }
}
