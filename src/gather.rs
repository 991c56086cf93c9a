//! Synchronisation point: snapshot gather and the continue broadcast.
//!
//! At every sync point each rank hands its owned rows to the reporting
//! rank, which stacks them in rank order into a full [`Grid`]. The
//! reporting rank then decides whether the run goes on and broadcasts a
//! [`Control`] carrying that decision and the generation it applies to.
//! Every rank adopts the broadcast value as is; a rank whose own
//! generation counter disagrees with it treats the run as broken.

use tracing::{debug, info};

use crate::comm::Communicator;
use crate::error::{LifeError, Result};
use crate::grid::Grid;
use crate::partition::{Band, Partition};

/// Lifecycle of the generation loop on one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Running,
    /// A stop was broadcast; the current generation's cycle is complete and
    /// no further generation may start.
    Stopping,
    Stopped,
}

/// The value broadcast by the reporting rank at a sync point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    /// Generation just completed by every rank.
    pub generation: u64,
    pub keep_running: bool,
}

impl Control {
    /// Encoded size: one flag byte and a little-endian `u64`.
    pub const WIRE_LEN: usize = 9;

    pub fn encode(&self) -> [u8; Self::WIRE_LEN] {
        let mut bytes = [0u8; Self::WIRE_LEN];
        bytes[0] = u8::from(self.keep_running);
        bytes[1..].copy_from_slice(&self.generation.to_le_bytes());
        bytes
    }

    pub fn decode(rank: usize, bytes: &[u8; Self::WIRE_LEN]) -> Result<Self> {
        let keep_running = match bytes[0] {
            0 => false,
            1 => true,
            other => {
                return Err(LifeError::protocol(
                    rank,
                    format!("continue flag byte {other} is neither 0 nor 1"),
                ))
            }
        };
        let mut generation = [0u8; 8];
        generation.copy_from_slice(&bytes[1..]);
        Ok(Self {
            generation: u64::from_le_bytes(generation),
            keep_running,
        })
    }
}

/// Assemble the global grid on the reporting rank.
///
/// Collective: every rank must call it at the same sync point. Returns
/// `Some` on the reporting rank only.
pub fn gather_snapshot<C: Communicator>(
    comm: &C,
    partition: &Partition,
    band: &Band,
) -> Result<Option<Grid>> {
    let Some(cells) = comm.gather(band.owned())? else {
        return Ok(None);
    };
    let expected = partition.rows() * partition.cols();
    if cells.len() != expected {
        return Err(LifeError::communication(
            comm.rank(),
            format!("gathered {} cells, grid has {expected}", cells.len()),
        ));
    }
    Grid::from_cells(partition.rows(), partition.cols(), cells).map(Some)
}

/// Broadcast the reporting rank's decision and check it against this
/// rank's generation counter.
///
/// The reporting rank passes `Some(control)`, everyone else `None`.
pub fn broadcast_control<C: Communicator>(
    comm: &C,
    proposal: Option<Control>,
    local_generation: u64,
) -> Result<Control> {
    let mut bytes = [0u8; Control::WIRE_LEN];
    if comm.is_root() {
        let control = proposal.ok_or_else(|| {
            LifeError::protocol(
                comm.rank(),
                "reporting rank reached a sync point without a decision",
            )
        })?;
        bytes = control.encode();
    }
    comm.broadcast(&mut bytes)?;

    let control = Control::decode(comm.rank(), &bytes)?;
    if control.generation != local_generation {
        return Err(LifeError::protocol(
            comm.rank(),
            format!(
                "broadcast is for generation {}, this rank is at {local_generation}",
                control.generation
            ),
        ));
    }
    debug!(
        rank = comm.rank(),
        generation = control.generation,
        keep_running = control.keep_running,
        "adopted continue flag"
    );
    Ok(control)
}

/// Running → Stopping → Stopped, driven only by broadcast [`Control`]s.
#[derive(Debug, Clone)]
pub struct Termination {
    rank: usize,
    state: EngineState,
    last_sync: Option<u64>,
}

impl Termination {
    pub fn new(rank: usize) -> Self {
        Self {
            rank,
            state: EngineState::Running,
            last_sync: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Fail unless another generation may start.
    pub fn ensure_running(&self, next_generation: u64) -> Result<()> {
        if self.state != EngineState::Running {
            return Err(LifeError::protocol(
                self.rank,
                format!(
                    "generation {next_generation} requested while {:?}",
                    self.state
                ),
            ));
        }
        Ok(())
    }

    /// Adopt a broadcast decision.
    pub fn apply(&mut self, control: Control) -> Result<EngineState> {
        if self.state != EngineState::Running {
            return Err(LifeError::protocol(
                self.rank,
                format!(
                    "decision for generation {} arrived while {:?}",
                    control.generation, self.state
                ),
            ));
        }
        if let Some(last) = self.last_sync {
            if control.generation <= last {
                return Err(LifeError::protocol(
                    self.rank,
                    format!(
                        "decision for generation {} follows one for generation {last}",
                        control.generation
                    ),
                ));
            }
        }
        self.last_sync = Some(control.generation);
        if !control.keep_running {
            info!(rank = self.rank, generation = control.generation, "stop broadcast received");
            self.state = EngineState::Stopping;
        }
        Ok(self.state)
    }

    /// Complete the stop once the current cycle is done.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            EngineState::Stopping => {
                self.state = EngineState::Stopped;
                Ok(())
            }
            state => Err(LifeError::protocol(
                self.rank,
                format!("cannot stop from {state:?} without a broadcast stop"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::local::run_group;

    #[test]
    fn test_control_wire_format() {
        let control = Control {
            generation: 0x0102,
            keep_running: true,
        };
        let bytes = control.encode();
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[1], 0x02);
        assert_eq!(Control::decode(0, &bytes).unwrap(), control);

        let mut bad = bytes;
        bad[0] = 7;
        assert!(matches!(
            Control::decode(0, &bad),
            Err(LifeError::TerminationProtocolViolation { .. })
        ));
    }

    #[test]
    fn test_termination_state_machine() {
        let mut t = Termination::new(0);
        assert_eq!(t.state(), EngineState::Running);
        assert!(t.finish().is_err());

        let go = Control {
            generation: 1,
            keep_running: true,
        };
        assert_eq!(t.apply(go).unwrap(), EngineState::Running);
        // Same generation twice means a broadcast was repeated or misordered.
        assert!(t.clone().apply(go).is_err());

        let stop = Control {
            generation: 2,
            keep_running: false,
        };
        assert_eq!(t.apply(stop).unwrap(), EngineState::Stopping);
        assert!(t.ensure_running(3).is_err());
        assert!(t.apply(Control { generation: 3, ..go }).is_err());

        t.finish().unwrap();
        assert_eq!(t.state(), EngineState::Stopped);
    }

    #[test]
    fn test_broadcast_rejects_generation_mismatch() {
        let results = run_group(3, |comm| {
            let proposal = Control {
                generation: 5,
                keep_running: true,
            };
            // Rank 2 believes it is one generation behind.
            let local = if comm.rank() == 2 { 4 } else { 5 };
            broadcast_control(&comm, comm.is_root().then_some(proposal), local)
        })
        .unwrap();

        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(
            results[2],
            Err(LifeError::TerminationProtocolViolation { rank: 2, .. })
        ));
    }

    #[test]
    fn test_gather_snapshot_stacks_rank_blocks() {
        let results = run_group(3, |comm| {
            let p = Partition::new(6, 2, 3, comm.rank())?;
            let mut band = Band::new(&p);
            band.owned_mut().fill(u8::from(comm.rank() == 1));
            gather_snapshot(&comm, &p, &band)
        })
        .unwrap();

        let grid = results[0].as_ref().unwrap().as_ref().unwrap();
        assert_eq!(grid.cells(), &[0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0]);
        assert!(results[1].as_ref().unwrap().is_none());
    }
}
