//! Snapshot sinks.
//!
//! The engine hands every gathered [`Grid`] to a [`SnapshotSink`] on the
//! reporting rank. Turning cells into pixels is the caller's business; the
//! sinks here cover the text output file, in-memory collection and
//! discarding.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::grid::Grid;

/// Consumer of gathered snapshots. Only called on the reporting rank, and
/// only with complete grids.
pub trait SnapshotSink {
    fn accept(&mut self, generation: u64, grid: &Grid) -> Result<()>;
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for &mut S {
    fn accept(&mut self, generation: u64, grid: &Grid) -> Result<()> {
        (**self).accept(generation, grid)
    }
}

/// Writes each snapshot as `Generation g:` followed by one line of `0`/`1`
/// per row.
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SnapshotSink for TextSink<W> {
    fn accept(&mut self, generation: u64, grid: &Grid) -> Result<()> {
        writeln!(self.writer, "Generation {generation}:")?;
        write!(self.writer, "{grid}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every snapshot in memory.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub frames: Vec<(u64, Grid)>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&(u64, Grid)> {
        self.frames.last()
    }
}

impl SnapshotSink for CollectSink {
    fn accept(&mut self, generation: u64, grid: &Grid) -> Result<()> {
        self.frames.push((generation, grid.clone()));
        Ok(())
    }
}

/// Drops every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn accept(&mut self, _generation: u64, _grid: &Grid) -> Result<()> {
        Ok(())
    }
}

/// Append the run's wall time (seconds, slowest rank) as one line.
pub fn append_timing(path: impl AsRef<Path>, seconds: f64) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{seconds}")?;
    file.flush()?;
    Ok(())
}
