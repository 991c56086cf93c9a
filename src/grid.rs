//! Dense global grid.
//!
//! The full R×C matrix only ever exists on the reporting rank: as the
//! pattern being scattered at startup, and as each gathered snapshot.
//! Cells are stored row-major as `u8` (0 dead, 1 alive) so blocks of rows
//! can be handed to the transport without conversion.

use std::fmt;

use crate::error::{LifeError, Result};
use crate::stencil::next_state;

/// Number of cells in a `rows`×`cols` grid, rejecting empty and
/// unaddressable shapes.
pub(crate) fn cell_count(rows: usize, cols: usize) -> Result<usize> {
    if rows == 0 || cols == 0 {
        return Err(LifeError::Configuration(format!(
            "grid dimensions must be > 0, got {rows}x{cols}"
        )));
    }
    rows.checked_mul(cols).ok_or_else(|| {
        LifeError::Configuration(format!("a {rows}x{cols} grid does not fit in memory"))
    })
}

/// A dense R×C grid of 0/1 cells, row 0 first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl Grid {
    /// Create an all-dead grid.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        let len = cell_count(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            cells: vec![0; len],
        })
    }

    /// Wrap an existing row-major buffer. Any non-zero byte counts as alive.
    pub fn from_cells(rows: usize, cols: usize, mut cells: Vec<u8>) -> Result<Self> {
        let len = cell_count(rows, cols)?;
        if cells.len() != len {
            return Err(LifeError::Pattern(format!(
                "buffer holds {} cells, a {rows}x{cols} grid needs {len}",
                cells.len()
            )));
        }
        for cell in cells.iter_mut() {
            *cell = u8::from(*cell != 0);
        }
        Ok(Self { rows, cols, cells })
    }

    /// Build a grid from a dense boolean buffer in row-major order.
    pub fn from_bools(rows: usize, cols: usize, cells: &[bool]) -> Result<Self> {
        Self::from_cells(rows, cols, cells.iter().map(|&b| u8::from(b)).collect())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.cols + col] != 0
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, alive: bool) {
        self.cells[row * self.cols + col] = u8::from(alive);
    }

    /// One row as a slice of 0/1 bytes.
    pub fn row(&self, row: usize) -> &[u8] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// The whole grid, row-major.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Row-major boolean view for the rendering side.
    pub fn to_bools(&self) -> Vec<bool> {
        self.cells.iter().map(|&c| c != 0).collect()
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// Coordinates of all live cells, row-major order.
    pub fn live_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != 0)
            .map(|(i, _)| (i / self.cols, i % self.cols))
            .collect()
    }

    /// Next generation computed directly on the whole torus.
    ///
    /// This is the non-partitioned reference: every neighbour index is
    /// wrapped with modular arithmetic, no ghost rows involved.
    pub fn next_generation(&self) -> Grid {
        let (rows, cols) = (self.rows, self.cols);
        let mut next = vec![0u8; rows * cols];
        for r in 0..rows {
            let up = (r + rows - 1) % rows;
            let down = (r + 1) % rows;
            for c in 0..cols {
                let left = (c + cols - 1) % cols;
                let right = (c + 1) % cols;
                let neighbours = self.cells[up * cols + left]
                    + self.cells[up * cols + c]
                    + self.cells[up * cols + right]
                    + self.cells[r * cols + left]
                    + self.cells[r * cols + right]
                    + self.cells[down * cols + left]
                    + self.cells[down * cols + c]
                    + self.cells[down * cols + right];
                next[r * cols + c] = next_state(self.cells[r * cols + c], neighbours);
            }
        }
        Grid {
            rows,
            cols,
            cells: next,
        }
    }

    /// Advance the reference stepper `generations` times.
    pub fn advanced(&self, generations: u64) -> Grid {
        let mut grid = self.clone();
        for _ in 0..generations {
            grid = grid.next_generation();
        }
        grid
    }
}

impl fmt::Display for Grid {
    /// One line per row, `0`/`1` per cell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            for &cell in self.row(r) {
                f.write_str(if cell != 0 { "1" } else { "0" })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
