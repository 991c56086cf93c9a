//! The generation loop.
//!
//! Each rank owns one [`Engine`]. A generation is: refresh the ghost rows,
//! step the owned rows. Every `output_every` generations all ranks meet at
//! a sync point where the reporting rank gathers a snapshot, consults the
//! stop signal and broadcasts the decision. A stop decided at generation g
//! ends the loop on every rank right after g's sync point, so no rank ever
//! starts generation g + 1.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::comm::Communicator;
use crate::config::RunConfig;
use crate::error::Result;
use crate::gather::{broadcast_control, gather_snapshot, Control, EngineState, Termination};
use crate::grid::Grid;
use crate::halo::exchange_ghost_rows;
use crate::partition::{scatter_band, Band, Partition};
use crate::report::SnapshotSink;
use crate::stencil::{self, Scratch};

/// The external stop condition. Consulted on the reporting rank only, once
/// per sync point, with the snapshot just gathered.
pub trait StopSignal {
    /// `false` ends the run after the current generation.
    fn keep_running(&mut self, generation: u64, snapshot: &Grid) -> bool;
}

impl<S: StopSignal + ?Sized> StopSignal for &mut S {
    fn keep_running(&mut self, generation: u64, snapshot: &Grid) -> bool {
        (**self).keep_running(generation, snapshot)
    }
}

/// Never asks to stop. What non-reporting ranks pass, and what the
/// reporting rank passes when the configured generation count is the only
/// limit.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverStop;

impl StopSignal for NeverStop {
    fn keep_running(&mut self, _generation: u64, _snapshot: &Grid) -> bool {
        true
    }
}

/// Stop once `generation` reaches the limit.
#[derive(Debug, Clone, Copy)]
pub struct GenerationLimit(pub u64);

impl StopSignal for GenerationLimit {
    fn keep_running(&mut self, generation: u64, _snapshot: &Grid) -> bool {
        generation < self.0
    }
}

/// Stop signal backed by a closure.
pub struct FnStop<F>(pub F);

impl<F: FnMut(u64, &Grid) -> bool> StopSignal for FnStop<F> {
    fn keep_running(&mut self, generation: u64, snapshot: &Grid) -> bool {
        (self.0)(generation, snapshot)
    }
}

/// What a finished run reports.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Generations executed by this rank.
    pub generations: u64,
    /// This rank's wall time.
    pub elapsed: Duration,
    /// Slowest rank's wall time in seconds, on the reporting rank only.
    pub max_elapsed: Option<f64>,
    /// Live cells in the last snapshot, on the reporting rank only.
    pub final_live: Option<usize>,
}

/// One rank's share of the simulation.
pub struct Engine<C: Communicator> {
    comm: C,
    config: RunConfig,
    partition: Partition,
    band: Band,
    scratch: Scratch,
    generation: u64,
    termination: Termination,
}

impl<C: Communicator> Engine<C> {
    /// Validate, allocate and scatter.
    ///
    /// `grid` is the starting pattern and is only read on the reporting
    /// rank, where it must be present. Configuration is checked before any
    /// allocation and before the scatter, so a bad configuration fails on
    /// every rank without a message being sent.
    pub fn new(comm: C, config: RunConfig, grid: Option<&Grid>) -> Result<Self> {
        config.validate()?;
        let partition = Partition::for_comm(config.rows, config.cols, &comm)?;
        let band = scatter_band(&comm, &partition, grid)?;
        let scratch = Scratch::for_band(&band);
        let termination = Termination::new(comm.rank());

        if comm.is_root() {
            info!(
                rows = config.rows,
                cols = config.cols,
                ranks = comm.size(),
                rows_per_rank = partition.local_rows(),
                "engine initialised"
            );
        }

        Ok(Self {
            comm,
            config,
            partition,
            band,
            scratch,
            generation: 0,
            termination,
        })
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn band(&self) -> &Band {
        &self.band
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Generations completed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> EngineState {
        self.termination.state()
    }

    /// Halo exchange then stencil step. Collective.
    pub fn step_generation(&mut self) -> Result<()> {
        self.termination.ensure_running(self.generation + 1)?;

        exchange_ghost_rows(&self.comm, &self.partition, &mut self.band)?;
        stencil::step(&mut self.band, &mut self.scratch);
        self.generation += 1;
        Ok(())
    }

    /// Gather the current state onto the reporting rank. Collective.
    pub fn gather(&self) -> Result<Option<Grid>> {
        gather_snapshot(&self.comm, &self.partition, &self.band)
    }

    /// Gather, decide on the reporting rank, broadcast, adopt. Collective.
    ///
    /// Returns the state after adopting the broadcast decision and, on the
    /// reporting rank, the snapshot that was handed to `sink`.
    pub fn sync_point<S, K>(
        &mut self,
        stop: &mut S,
        sink: &mut K,
    ) -> Result<(EngineState, Option<Grid>)>
    where
        S: StopSignal + ?Sized,
        K: SnapshotSink + ?Sized,
    {
        let snapshot = self.gather()?;

        let proposal = match &snapshot {
            Some(grid) => {
                sink.accept(self.generation, grid)?;
                let within_limit = self.config.generations.map_or(true, |g| self.generation < g);
                let keep_running = within_limit && stop.keep_running(self.generation, grid);
                Some(Control {
                    generation: self.generation,
                    keep_running,
                })
            }
            None => None,
        };

        let control = broadcast_control(&self.comm, proposal, self.generation)?;
        let state = self.termination.apply(control)?;
        Ok((state, snapshot))
    }

    /// Run until the reporting rank broadcasts a stop.
    ///
    /// `stop` and `sink` are only used on the reporting rank.
    pub fn run<S, K>(&mut self, stop: &mut S, sink: &mut K) -> Result<RunSummary>
    where
        S: StopSignal + ?Sized,
        K: SnapshotSink + ?Sized,
    {
        self.comm.barrier()?;
        let started = Instant::now();
        let mut final_live = None;

        loop {
            let t_step = Instant::now();
            self.step_generation()?;
            let step_time = t_step.elapsed();

            if self.generation % self.config.output_every != 0 {
                continue;
            }

            let t_sync = Instant::now();
            let (state, snapshot) = self.sync_point(stop, sink)?;
            if let Some(grid) = &snapshot {
                final_live = Some(grid.live_count());
                debug!(
                    generation = self.generation,
                    live = grid.live_count(),
                    step_us = step_time.as_micros() as u64,
                    sync_us = t_sync.elapsed().as_micros() as u64,
                    "sync point"
                );
            }

            if state == EngineState::Stopping {
                self.termination.finish()?;
                break;
            }
        }

        let elapsed = started.elapsed();
        let max_elapsed = self.comm.reduce_max(elapsed.as_secs_f64())?;
        if let Some(max) = max_elapsed {
            info!(
                generations = self.generation,
                seconds = max,
                "run complete"
            );
        }

        Ok(RunSummary {
            generations: self.generation,
            elapsed,
            max_elapsed,
            final_live,
        })
    }

    /// Give the communicator back, e.g. to run a follow-up collective.
    pub fn into_comm(self) -> C {
        self.comm
    }
}
