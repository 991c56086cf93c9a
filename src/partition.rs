//! Row-band decomposition of the grid.
//!
//! The R×C grid is cut into P contiguous blocks of R/P rows, block `r`
//! belonging to rank `r`. Each rank keeps its block in a [`Band`]: the owned
//! rows plus one ghost row above and one below, all in one contiguous
//! buffer so that a single row can be handed to the transport as a slice.
//!
//! ```text
//!  band row 0              top ghost    (copy of predecessor's last row)
//!  band rows 1..=local     owned rows   (global rows start..end)
//!  band row local + 1      bottom ghost (copy of successor's first row)
//! ```

use std::ops::Range;

use tracing::debug;

use crate::comm::Communicator;
use crate::error::{LifeError, Result};
use crate::grid::Grid;

/// Band index of the top ghost row.
pub const TOP_GHOST: usize = 0;

/// Where one rank sits in the decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    rows: usize,
    cols: usize,
    size: usize,
    rank: usize,
    local_rows: usize,
}

impl Partition {
    /// Validate the decomposition. Called before any band is allocated, and
    /// every rank reaches the same verdict from the same inputs, so an
    /// invalid configuration stops the whole group before a message is sent.
    pub fn new(rows: usize, cols: usize, size: usize, rank: usize) -> Result<Self> {
        if size == 0 {
            return Err(LifeError::Configuration(
                "process count must be > 0".to_string(),
            ));
        }
        if rows == 0 || cols == 0 {
            return Err(LifeError::Configuration(format!(
                "grid dimensions must be > 0, got {rows}x{cols}"
            )));
        }
        if rows % size != 0 {
            return Err(LifeError::Configuration(format!(
                "{rows} rows cannot be split evenly across {size} processes"
            )));
        }
        if rank >= size {
            return Err(LifeError::Configuration(format!(
                "rank {rank} is outside a group of {size}"
            )));
        }
        let local_rows = rows / size;
        if local_rows.checked_add(2).and_then(|r| r.checked_mul(cols)).is_none() {
            return Err(LifeError::Configuration(format!(
                "a band of {local_rows}x{cols} cells plus ghost rows does not fit in memory"
            )));
        }
        Ok(Self {
            rows,
            cols,
            size,
            rank,
            local_rows,
        })
    }

    /// Partition for the rank behind `comm`.
    pub fn for_comm<C: Communicator>(rows: usize, cols: usize, comm: &C) -> Result<Self> {
        Self::new(rows, cols, comm.size(), comm.rank())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Rows owned by each rank.
    pub fn local_rows(&self) -> usize {
        self.local_rows
    }

    /// Global rows `[start, end)` owned by this rank.
    pub fn owned_range(&self) -> Range<usize> {
        self.range_of(self.rank)
    }

    /// Global rows owned by `rank`.
    pub fn range_of(&self, rank: usize) -> Range<usize> {
        rank * self.local_rows..(rank + 1) * self.local_rows
    }

    /// Rank owning global row `row`, if the row exists.
    pub fn owner_of(&self, row: usize) -> Option<usize> {
        (row < self.rows).then(|| row / self.local_rows)
    }

    /// Rank holding the band above this one (wraps to the last rank).
    pub fn predecessor(&self) -> usize {
        (self.rank + self.size - 1) % self.size
    }

    /// Rank holding the band below this one (wraps to rank 0).
    pub fn successor(&self) -> usize {
        (self.rank + 1) % self.size
    }

    /// Bytes in one block of owned rows.
    pub fn block_len(&self) -> usize {
        self.local_rows * self.cols
    }
}

/// One rank's rows plus two ghost rows, stored row-major in one buffer.
///
/// Allocated once and mutated in place every generation.
#[derive(Debug, Clone)]
pub struct Band {
    local_rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl Band {
    /// All-dead band shaped for `partition`. Ghost rows start zeroed and
    /// carry no meaning until the first halo exchange.
    pub fn new(partition: &Partition) -> Self {
        Self {
            local_rows: partition.local_rows(),
            cols: partition.cols(),
            cells: vec![0; (partition.local_rows() + 2) * partition.cols()],
        }
    }

    pub fn local_rows(&self) -> usize {
        self.local_rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Band index of the bottom ghost row.
    pub fn bottom_ghost_index(&self) -> usize {
        self.local_rows + 1
    }

    /// Band row `i`, ghost rows included.
    pub fn row(&self, i: usize) -> &[u8] {
        &self.cells[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [u8] {
        &mut self.cells[i * self.cols..(i + 1) * self.cols]
    }

    pub fn top_ghost(&self) -> &[u8] {
        self.row(TOP_GHOST)
    }

    pub fn bottom_ghost(&self) -> &[u8] {
        self.row(self.bottom_ghost_index())
    }

    pub fn first_owned(&self) -> &[u8] {
        self.row(1)
    }

    pub fn last_owned(&self) -> &[u8] {
        self.row(self.local_rows)
    }

    /// Owned rows only, contiguous.
    pub fn owned(&self) -> &[u8] {
        &self.cells[self.cols..(self.local_rows + 1) * self.cols]
    }

    /// Owned rows for writing. Any non-zero byte is read as alive.
    pub fn owned_mut(&mut self) -> &mut [u8] {
        &mut self.cells[self.cols..(self.local_rows + 1) * self.cols]
    }

    /// The whole padded buffer, ghost rows included.
    pub fn padded(&self) -> &[u8] {
        &self.cells
    }

    /// Two disjoint rows at once: `(&mut row a, &row b)`.
    pub(crate) fn row_pair_mut(&mut self, a: usize, b: usize) -> (&mut [u8], &[u8]) {
        debug_assert_ne!(a, b);
        let cols = self.cols;
        if a < b {
            let (head, tail) = self.cells.split_at_mut(b * cols);
            (&mut head[a * cols..(a + 1) * cols], &tail[..cols])
        } else {
            let (head, tail) = self.cells.split_at_mut(a * cols);
            (&mut tail[..cols], &head[b * cols..(b + 1) * cols])
        }
    }

    /// Live cells in the owned rows.
    pub fn live_count(&self) -> usize {
        self.owned().iter().filter(|&&c| c != 0).count()
    }
}

/// Distribute the initial grid: block `r` of the global rows lands in rank
/// `r`'s owned rows.
///
/// Only the root passes `Some(grid)`; every rank receives its block,
/// the root included.
pub fn scatter_band<C: Communicator>(
    comm: &C,
    partition: &Partition,
    grid: Option<&Grid>,
) -> Result<Band> {
    let send = match grid {
        Some(grid) if comm.is_root() => {
            if grid.rows() != partition.rows() || grid.cols() != partition.cols() {
                return Err(LifeError::Configuration(format!(
                    "pattern is {}x{} but the run is configured for {}x{}",
                    grid.rows(),
                    grid.cols(),
                    partition.rows(),
                    partition.cols()
                )));
            }
            Some(grid.cells())
        }
        _ => None,
    };

    let mut band = Band::new(partition);
    comm.scatter(send, band.owned_mut())?;
    debug!(
        rank = partition.rank(),
        rows = ?partition.owned_range(),
        live = band.live_count(),
        "received initial block"
    );
    Ok(band)
}
