//! Terminal grid geometry
//!
//! Derived from the drawable area and the measured cell size. Recomputed
//! whenever either changes; never stored independently of those inputs.

use serde::{Deserialize, Serialize};

/// Pixel size of one character cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellSize {
    pub width: f32,
    pub height: f32,
}

impl CellSize {
    /// Unit cells, for front ends that address whole characters
    pub const UNIT: CellSize = CellSize {
        width: 1.0,
        height: 1.0,
    };

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Visible grid dimensions plus the padding that centers it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub columns: usize,
    pub rows: usize,
    pub cell: CellSize,
    pub padding_x: f32,
    pub padding_y: f32,
}

impl Default for Grid {
    fn default() -> Self {
        Self::with_size(80, 24)
    }
}

impl Grid {
    /// A grid addressed in whole cells with no padding
    pub fn with_size(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cell: CellSize::UNIT,
            padding_x: 0.0,
            padding_y: 0.0,
        }
    }

    /// Fit as many cells as possible into a `width` x `height` area and
    /// center them using the leftover space.
    ///
    /// A degenerate area or cell size yields an empty grid.
    pub fn fit(width: f32, height: f32, cell: CellSize) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        if !cell.is_usable() || !width.is_finite() || !height.is_finite() {
            return Self {
                columns: 0,
                rows: 0,
                cell,
                padding_x: 0.0,
                padding_y: 0.0,
            };
        }

        let columns = (width / cell.width).floor();
        let rows = (height / cell.height).floor();
        Self {
            columns: columns as usize,
            rows: rows as usize,
            cell,
            padding_x: ((width - columns * cell.width) * 0.5).max(0.0),
            padding_y: ((height - rows * cell.height) * 0.5).max(0.0),
        }
    }

    /// Pixel position of the top-left corner of a cell
    pub fn cell_origin(&self, row: usize, column: usize) -> (f32, f32) {
        (
            self.padding_x + column as f32 * self.cell.width,
            self.padding_y + row as f32 * self.cell.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_floors_and_centers() {
        let grid = Grid::fit(
            805.0,
            410.0,
            CellSize {
                width: 10.0,
                height: 20.0,
            },
        );
        assert_eq!(grid.columns, 80);
        assert_eq!(grid.rows, 20);
        assert_eq!(grid.padding_x, 2.5);
        assert_eq!(grid.padding_y, 5.0);
        assert_eq!(grid.cell_origin(1, 2), (22.5, 25.0));
    }

    #[test]
    fn test_fit_never_negative() {
        let cell = CellSize {
            width: 8.0,
            height: 16.0,
        };
        let grid = Grid::fit(-100.0, 4.0, cell);
        assert_eq!(grid.columns, 0);
        assert_eq!(grid.rows, 0);
        assert!(grid.padding_x >= 0.0);
        assert_eq!(grid.padding_y, 2.0);
    }

    #[test]
    fn test_fit_zero_cell() {
        let grid = Grid::fit(
            800.0,
            600.0,
            CellSize {
                width: 0.0,
                height: 16.0,
            },
        );
        assert_eq!((grid.columns, grid.rows), (0, 0));
    }
}
