//! MPI transport.
//!
//! Requires the `mpi` feature flag and an MPI installation. The caller keeps
//! the `Universe` alive for as long as the communicator is in use:
//!
//! ```ignore
//! let universe = mpi::initialize().expect("MPI init failed");
//! let comm = MpiComm::new(universe.world());
//! ```
//!
//! MPI's default error handler aborts the whole job on a transport failure,
//! which is the teardown policy the engine wants anyway. The checks here
//! cover what MPI does not: payload sizes and protocol misuse.

use ::mpi::collective::SystemOperation;
use ::mpi::datatype::Equivalence;
use ::mpi::point_to_point::send_receive_into_with_tags;
use ::mpi::topology::SimpleCommunicator;
use ::mpi::traits::{Communicator as MpiCommunicator, Root};

use super::{Communicator, Tag, ROOT};
use crate::error::{LifeError, Result};

/// Ranks are the processes of an MPI communicator.
pub struct MpiComm {
    world: SimpleCommunicator,
    rank: usize,
    size: usize,
}

impl MpiComm {
    pub fn new(world: SimpleCommunicator) -> Self {
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Self { world, rank, size }
    }

    /// Tear down every process in the job.
    pub fn abort(&self, code: i32) -> ! {
        self.world.abort(code)
    }
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send_receive(
        &self,
        send: &[u8],
        dest: usize,
        recv: &mut [u8],
        source: usize,
        tag: Tag,
    ) -> Result<()> {
        if dest >= self.size || source >= self.size {
            return Err(LifeError::communication(
                self.rank,
                format!("peer {dest}/{source} is outside a group of {}", self.size),
            ));
        }
        let expected = recv.len();
        let status = send_receive_into_with_tags(
            send,
            &self.world.process_at_rank(dest as i32),
            tag as i32,
            recv,
            &self.world.process_at_rank(source as i32),
            tag as i32,
        );
        let received = status.count(u8::equivalent_datatype()) as usize;
        if received != expected {
            return Err(LifeError::communication(
                self.rank,
                format!(
                    "{tag:?} from rank {source} carried {received} bytes, expected {expected}"
                ),
            ));
        }
        Ok(())
    }

    fn scatter(&self, send: Option<&[u8]>, recv: &mut [u8]) -> Result<()> {
        let root = self.world.process_at_rank(ROOT as i32);

        // The root's buffer is checked before anyone enters the collective,
        // and the verdict is broadcast so a bad buffer fails every rank.
        let mut verdict = [0u8];
        let mut problem = None;
        if self.rank == ROOT {
            problem = match send {
                None => Some("root called scatter without data".to_string()),
                Some(send) if send.len() != recv.len() * self.size => Some(format!(
                    "scatter buffer holds {} bytes, {} ranks x {} expected",
                    send.len(),
                    self.size,
                    recv.len()
                )),
                Some(_) => None,
            };
            verdict[0] = u8::from(problem.is_none());
        }
        root.broadcast_into(&mut verdict[..]);
        if verdict[0] != 1 {
            let reason =
                problem.unwrap_or_else(|| "root rejected its scatter buffer".to_string());
            return Err(LifeError::communication(self.rank, reason));
        }

        match send {
            Some(send) if self.rank == ROOT => root.scatter_into_root(send, recv),
            _ => root.scatter_into(recv),
        }
        Ok(())
    }

    fn gather(&self, send: &[u8]) -> Result<Option<Vec<u8>>> {
        let root = self.world.process_at_rank(ROOT as i32);
        if self.rank == ROOT {
            let mut all = vec![0u8; send.len() * self.size];
            root.gather_into_root(send, &mut all[..]);
            Ok(Some(all))
        } else {
            root.gather_into(send);
            Ok(None)
        }
    }

    fn broadcast(&self, buf: &mut [u8]) -> Result<()> {
        self.world.process_at_rank(ROOT as i32).broadcast_into(buf);
        Ok(())
    }

    fn reduce_max(&self, local: f64) -> Result<Option<f64>> {
        let root = self.world.process_at_rank(ROOT as i32);
        if self.rank == ROOT {
            let mut max = 0.0f64;
            root.reduce_into_root(&local, &mut max, SystemOperation::max());
            Ok(Some(max))
        } else {
            root.reduce_into(&local, SystemOperation::max());
            Ok(None)
        }
    }

    fn barrier(&self) -> Result<()> {
        self.world.barrier();
        Ok(())
    }
}
