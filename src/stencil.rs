//! One generation of B3/S23 on a band.
//!
//! Reads the padded band (ghost rows included), writes the next state of
//! the owned rows into a scratch buffer, then copies the result back over
//! the owned rows. Columns wrap natively; rows wrap through the ghost rows.
//! No communication happens here, and rows are independent, so large bands
//! are processed row-parallel with rayon.

use rayon::prelude::*;

use crate::partition::Band;

/// Bands at least this many cells wide or tall are stepped in parallel.
/// Below it the rayon fork/join costs more than it saves.
pub const PARALLEL_THRESHOLD: usize = 256;

/// B3/S23: birth on exactly 3 neighbours, survival on 2 or 3.
#[inline(always)]
pub fn next_state(cell: u8, neighbours: u8) -> u8 {
    match (cell != 0, neighbours) {
        (true, 2) | (true, 3) => 1,
        (false, 3) => 1,
        _ => 0,
    }
}

/// Reusable output buffer for [`step`], sized to a band's owned rows.
#[derive(Debug, Clone)]
pub struct Scratch {
    cells: Vec<u8>,
}

impl Scratch {
    pub fn for_band(band: &Band) -> Self {
        Self {
            cells: vec![0; band.local_rows() * band.cols()],
        }
    }
}

/// Advance the owned rows of `band` by one generation.
///
/// The ghost rows must have been refreshed for this generation.
pub fn step(band: &mut Band, scratch: &mut Scratch) {
    let cols = band.cols();
    let local_rows = band.local_rows();
    debug_assert_eq!(scratch.cells.len(), local_rows * cols);

    let padded = band.padded();
    if cols >= PARALLEL_THRESHOLD || local_rows >= PARALLEL_THRESHOLD {
        scratch
            .cells
            .par_chunks_mut(cols)
            .enumerate()
            .for_each(|(row, out)| step_row(padded, cols, row + 1, out));
    } else {
        for (row, out) in scratch.cells.chunks_mut(cols).enumerate() {
            step_row(padded, cols, row + 1, out);
        }
    }

    band.owned_mut().copy_from_slice(&scratch.cells);
}

/// Any non-zero byte is a live cell.
#[inline(always)]
fn alive(cell: u8) -> u8 {
    u8::from(cell != 0)
}

/// Compute band row `row` (1-based, an owned row) into `out`.
#[inline]
fn step_row(padded: &[u8], cols: usize, row: usize, out: &mut [u8]) {
    let above = &padded[(row - 1) * cols..row * cols];
    let here = &padded[row * cols..(row + 1) * cols];
    let below = &padded[(row + 1) * cols..(row + 2) * cols];

    for col in 0..cols {
        let left = if col == 0 { cols - 1 } else { col - 1 };
        let right = if col + 1 == cols { 0 } else { col + 1 };

        let neighbours = alive(above[left])
            + alive(above[col])
            + alive(above[right])
            + alive(here[left])
            + alive(here[right])
            + alive(below[left])
            + alive(below[col])
            + alive(below[right]);
        out[col] = next_state(here[col], neighbours);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halo::wrap_single_band;
    use crate::partition::Partition;

    #[test]
    fn test_rule_table() {
        for n in 0..=8u8 {
            let born = next_state(0, n);
            let survives = next_state(1, n);
            assert_eq!(born, u8::from(n == 3), "dead cell with {n}");
            assert_eq!(survives, u8::from(n == 2 || n == 3), "live cell with {n}");
        }
    }

    #[test]
    fn test_column_wrap_counts_opposite_edge() {
        // A vertical bar in column 0 of a 3-wide band: the cells in column 2
        // see it through the wrap.
        let p = Partition::new(3, 3, 1, 0).unwrap();
        let mut band = Band::new(&p);
        band.owned_mut().copy_from_slice(&[1, 0, 0, 1, 0, 0, 1, 0, 0]);
        wrap_single_band(&mut band);

        let mut scratch = Scratch::for_band(&band);
        step(&mut band, &mut scratch);
        // On a 3x3 torus every cell neighbours every other cell: the bar
        // cells keep 2 neighbours and survive, the rest see 3 and are born.
        assert_eq!(band.owned(), &[1; 9]);
    }

    #[test]
    fn test_ghost_rows_feed_edge_rows() {
        // Owned rows are empty; three live cells in the top ghost give the
        // middle cell of the first owned row exactly three neighbours.
        let p = Partition::new(2, 5, 1, 0).unwrap();
        let mut band = Band::new(&p);
        band.row_mut(0).copy_from_slice(&[0, 1, 1, 1, 0]);

        let mut scratch = Scratch::for_band(&band);
        step(&mut band, &mut scratch);
        assert_eq!(band.row(1), &[0, 0, 1, 0, 0]);
        assert_eq!(band.row(2), &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_non_binary_cells_count_as_alive() {
        // Bytes written straight into the band are not normalised; a full
        // neighbourhood of 0xff must still count as 8, not wrap around.
        let p = Partition::new(3, 3, 1, 0).unwrap();
        let mut band = Band::new(&p);
        band.owned_mut().fill(0xff);
        band.row_mut(1)[1] = 0;
        wrap_single_band(&mut band);

        let mut scratch = Scratch::for_band(&band);
        step(&mut band, &mut scratch);
        assert_eq!(band.owned(), &[0; 9]);
    }

    #[test]
    fn test_parallel_path_matches_reference() {
        let rows = 4;
        let cols = PARALLEL_THRESHOLD;
        let p = Partition::new(rows, cols, 1, 0).unwrap();
        let mut band = Band::new(&p);
        for (i, cell) in band.owned_mut().iter_mut().enumerate() {
            *cell = u8::from(i % 3 == 0 || i % 7 == 0);
        }
        let reference = crate::grid::Grid::from_cells(rows, cols, band.owned().to_vec())
            .unwrap()
            .next_generation();

        wrap_single_band(&mut band);
        let mut scratch = Scratch::for_band(&band);
        step(&mut band, &mut scratch);
        assert_eq!(band.owned(), reference.cells());
    }
}
