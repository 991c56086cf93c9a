//! # Game of Life in row bands
//!
//! Conway's Game of Life (B3/S23) on a torus, with the grid cut into
//! contiguous row bands, one per rank. Ranks never share memory: each owns
//! its band exclusively and everything that crosses a band edge is a
//! message through a [`Communicator`].
//!
//! Per generation every rank
//! 1. refreshes its two ghost rows from its ring neighbours ([`halo`]),
//! 2. steps its owned rows ([`stencil`]),
//!
//! and every `output_every` generations all ranks meet at a sync point
//! ([`gather`]) where the reporting rank assembles the full grid and
//! broadcasts whether to continue.
//!
//! ```
//! use game_of_life_bands::prelude::*;
//!
//! let grid = find_pattern("blinker").unwrap().to_pattern().to_grid().unwrap();
//! let config = RunConfig::new(5, 5).with_generations(2);
//! let results = run_group(1, |comm| {
//!     let mut engine = Engine::new(comm, config, Some(&grid))?;
//!     let mut sink = CollectSink::new();
//!     engine.run(&mut NeverStop, &mut sink)?;
//!     Ok::<_, LifeError>(sink)
//! })
//! .unwrap();
//! let sink = results.into_iter().next().unwrap().unwrap();
//! assert_eq!(sink.last().unwrap().1, grid);
//! ```

pub mod comm;
pub mod config;
pub mod engine;
pub mod error;
pub mod gather;
pub mod grid;
pub mod halo;
pub mod partition;
pub mod pattern;
pub mod report;
pub mod stencil;

pub use comm::{Communicator, ROOT};
pub use engine::Engine;
pub use error::{LifeError, Result};
pub use grid::Grid;

pub mod prelude {
    pub use crate::comm::local::{run_group, LocalComm, LocalGroup};
    pub use crate::comm::{Communicator, ROOT};
    pub use crate::config::{share_run_config, InputFile, RunConfig};
    pub use crate::engine::{Engine, FnStop, GenerationLimit, NeverStop, RunSummary, StopSignal};
    pub use crate::error::{LifeError, Result};
    pub use crate::gather::{Control, EngineState};
    pub use crate::grid::Grid;
    pub use crate::partition::{Band, Partition};
    pub use crate::pattern::{find_pattern, Pattern};
    pub use crate::report::{CollectSink, NullSink, SnapshotSink, TextSink};
}
