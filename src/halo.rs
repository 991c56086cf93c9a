//! Ghost-row refresh.
//!
//! Runs before every stencil step. Afterwards the top ghost row holds the
//! predecessor's last owned row and the bottom ghost row holds the
//! successor's first owned row, with ranks arranged in a ring so the grid
//! wraps top to bottom.
//!
//! The exchange is two ring shifts, each one combined send+receive:
//! 1. every rank sends its first owned row up to its predecessor and
//!    receives its successor's first row into the bottom ghost;
//! 2. every rank sends its last owned row down to its successor and
//!    receives its predecessor's last row into the top ghost.
//!
//! Every rank sends and receives in the same shift, so no rank ever waits
//! on a peer that is itself blocked on a send. With a single rank there is
//! no one to talk to and the band wraps onto itself.

use tracing::trace;

use crate::comm::{Communicator, Tag};
use crate::error::Result;
use crate::partition::{Band, Partition, TOP_GHOST};

/// Refresh both ghost rows of `band`.
pub fn exchange_ghost_rows<C: Communicator>(
    comm: &C,
    partition: &Partition,
    band: &mut Band,
) -> Result<()> {
    if partition.size() == 1 {
        wrap_single_band(band);
        return Ok(());
    }

    let pred = partition.predecessor();
    let succ = partition.successor();
    let last = band.local_rows();
    let bottom = band.bottom_ghost_index();

    // Shift up.
    let (ghost, first) = band.row_pair_mut(bottom, 1);
    comm.send_receive(first, pred, ghost, succ, Tag::HaloUp)?;

    // Shift down.
    let (ghost, last_row) = band.row_pair_mut(TOP_GHOST, last);
    comm.send_receive(last_row, succ, ghost, pred, Tag::HaloDown)?;

    trace!(rank = partition.rank(), pred, succ, "ghost rows refreshed");
    Ok(())
}

/// Single-rank toroidal wrap: the band is its own predecessor and successor.
pub fn wrap_single_band(band: &mut Band) {
    let last = band.local_rows();
    let bottom = band.bottom_ghost_index();

    let (ghost, row) = band.row_pair_mut(TOP_GHOST, last);
    ghost.copy_from_slice(row);
    let (ghost, row) = band.row_pair_mut(bottom, 1);
    ghost.copy_from_slice(row);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::local::run_group;

    #[test]
    fn test_single_band_wraps_onto_itself() {
        let p = Partition::new(3, 2, 1, 0).unwrap();
        let mut band = Band::new(&p);
        band.owned_mut().copy_from_slice(&[1, 0, 0, 0, 0, 1]);

        wrap_single_band(&mut band);
        assert_eq!(band.top_ghost(), &[0, 1]);
        assert_eq!(band.bottom_ghost(), &[1, 0]);
    }

    #[test]
    fn test_single_row_band_sees_itself_on_both_sides() {
        let p = Partition::new(1, 3, 1, 0).unwrap();
        let mut band = Band::new(&p);
        band.owned_mut().copy_from_slice(&[1, 1, 0]);

        wrap_single_band(&mut band);
        assert_eq!(band.top_ghost(), &[1, 1, 0]);
        assert_eq!(band.bottom_ghost(), &[1, 1, 0]);
    }

    #[test]
    fn test_two_ranks_exchange_both_directions() {
        // With two ranks the predecessor and successor are the same peer;
        // the per-direction tags keep the rows apart.
        let results = run_group(2, |comm| {
            let p = Partition::new(4, 2, 2, comm.rank())?;
            let mut band = Band::new(&p);
            let base = comm.rank() as u8 * 10;
            band.row_mut(1).copy_from_slice(&[base + 1, base + 1]);
            band.row_mut(2).copy_from_slice(&[base + 2, base + 2]);
            exchange_ghost_rows(&comm, &p, &mut band)?;
            let ghosts = (band.top_ghost().to_vec(), band.bottom_ghost().to_vec());
            Ok::<_, crate::error::LifeError>(ghosts)
        })
        .unwrap();

        let (top0, bottom0) = results[0].as_ref().unwrap();
        assert_eq!(top0, &vec![12, 12]);
        assert_eq!(bottom0, &vec![11, 11]);

        let (top1, bottom1) = results[1].as_ref().unwrap();
        assert_eq!(top1, &vec![2, 2]);
        assert_eq!(bottom1, &vec![1, 1]);
    }
}
