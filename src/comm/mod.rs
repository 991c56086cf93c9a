//! Process-group messaging.
//!
//! Everything that crosses a band boundary goes through a [`Communicator`]:
//! ranks never share memory. Two transports implement it:
//! - [`local::LocalComm`]: ranks are threads in one process, connected by
//!   one crossbeam channel per ordered pair of ranks.
//! - [`mpi::MpiComm`] (feature `mpi`): ranks are MPI processes.
//!
//! Rank [`ROOT`] is the reporting rank: it owns the pattern before the
//! scatter, receives every gather and originates every broadcast.

pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi;

use crate::error::Result;

/// The reporting rank.
pub const ROOT: usize = 0;

/// Message tags. Each collective and each halo direction has its own tag so
/// that messages between the same pair of ranks can never be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Tag {
    /// First owned row travelling to the predecessor.
    HaloUp = 10,
    /// Last owned row travelling to the successor.
    HaloDown = 11,
    Scatter = 20,
    Gather = 21,
    Broadcast = 22,
    Reduce = 23,
    Barrier = 24,
}

/// Blocking messaging primitives used by the engine.
///
/// Every call is collective or paired: all ranks of the group must make the
/// matching call in the same order. Any transport failure is returned as
/// [`LifeError::Communication`](crate::error::LifeError::Communication) and
/// is fatal to the run.
pub trait Communicator {
    /// This rank, in `[0, size)`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Send `send` to `dest` and receive exactly `recv.len()` bytes from
    /// `source` as one combined operation. Completes regardless of the
    /// order in which the peers issue their own calls, so a ring of ranks
    /// all calling this at once cannot deadlock.
    fn send_receive(
        &self,
        send: &[u8],
        dest: usize,
        recv: &mut [u8],
        source: usize,
        tag: Tag,
    ) -> Result<()>;

    /// Split `send` (root only, `size() * recv.len()` bytes) into equal
    /// blocks and deliver block `r` to rank `r`.
    fn scatter(&self, send: Option<&[u8]>, recv: &mut [u8]) -> Result<()>;

    /// Collect every rank's `send` block on the root, concatenated in rank
    /// order. Returns `Some` on the root and `None` elsewhere.
    fn gather(&self, send: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Overwrite `buf` on every rank with the root's contents.
    fn broadcast(&self, buf: &mut [u8]) -> Result<()>;

    /// Maximum of `local` over all ranks, delivered to the root.
    fn reduce_max(&self, local: f64) -> Result<Option<f64>>;

    /// Block until every rank has entered the barrier.
    fn barrier(&self) -> Result<()>;

    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }
}

impl<C: Communicator + ?Sized> Communicator for &C {
    fn rank(&self) -> usize {
        (**self).rank()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn send_receive(
        &self,
        send: &[u8],
        dest: usize,
        recv: &mut [u8],
        source: usize,
        tag: Tag,
    ) -> Result<()> {
        (**self).send_receive(send, dest, recv, source, tag)
    }

    fn scatter(&self, send: Option<&[u8]>, recv: &mut [u8]) -> Result<()> {
        (**self).scatter(send, recv)
    }

    fn gather(&self, send: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).gather(send)
    }

    fn broadcast(&self, buf: &mut [u8]) -> Result<()> {
        (**self).broadcast(buf)
    }

    fn reduce_max(&self, local: f64) -> Result<Option<f64>> {
        (**self).reduce_max(local)
    }

    fn barrier(&self) -> Result<()> {
        (**self).barrier()
    }
}
