//! Run configuration and the input file format.
//!
//! Only the reporting rank reads input. It broadcasts the run header so
//! every rank validates the same numbers, and a failure on the reporting
//! rank is broadcast too so the whole group stops before allocating bands.
//!
//! Input file:
//!
//! ```text
//! N G O          (square N x N grid)   or   R C G O
//! 0110...        R lines of C characters, 0 dead / 1 alive
//! ```
//!
//! G is the number of generations to run and O how often to output a
//! snapshot; G must be divisible by O.

use std::fs;
use std::path::Path;

use tracing::{error, info};

use crate::comm::Communicator;
use crate::error::{LifeError, Result};
use crate::grid::{cell_count, Grid};

/// Global parameters every rank must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub rows: usize,
    pub cols: usize,
    /// Generations to run, or `None` to run until the stop signal fires.
    pub generations: Option<u64>,
    /// Gather a snapshot and take the continue decision every this many
    /// generations.
    pub output_every: u64,
}

impl RunConfig {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            generations: None,
            output_every: 1,
        }
    }

    pub fn with_generations(mut self, generations: u64) -> Self {
        self.generations = Some(generations);
        self
    }

    pub fn with_output_every(mut self, output_every: u64) -> Self {
        self.output_every = output_every;
        self
    }

    /// Check the parameters that do not depend on the process count.
    pub fn validate(&self) -> Result<()> {
        cell_count(self.rows, self.cols)?;
        if self.output_every == 0 {
            return Err(LifeError::Configuration(
                "output interval must be > 0".to_string(),
            ));
        }
        if let Some(generations) = self.generations {
            if generations == 0 {
                return Err(LifeError::Configuration(
                    "number of generations must be > 0".to_string(),
                ));
            }
            if generations % self.output_every != 0 {
                return Err(LifeError::Configuration(format!(
                    "{generations} generations is not a multiple of the output interval {}",
                    self.output_every
                )));
            }
        }
        Ok(())
    }

    const WIRE_LEN: usize = 1 + 4 * 8;

    fn encode(&self) -> [u8; Self::WIRE_LEN] {
        let mut bytes = [0u8; Self::WIRE_LEN];
        bytes[0] = 1;
        let fields = [
            self.rows as u64,
            self.cols as u64,
            self.generations.unwrap_or(0),
            self.output_every,
        ];
        for (i, field) in fields.iter().enumerate() {
            bytes[1 + i * 8..9 + i * 8].copy_from_slice(&field.to_le_bytes());
        }
        bytes
    }

    fn decode(bytes: &[u8; Self::WIRE_LEN]) -> Option<Self> {
        if bytes[0] != 1 {
            return None;
        }
        let field = |i: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[1 + i * 8..9 + i * 8]);
            u64::from_le_bytes(b)
        };
        Some(Self {
            rows: field(0) as usize,
            cols: field(1) as usize,
            generations: Some(field(2)).filter(|&g| g > 0),
            output_every: field(3),
        })
    }
}

/// Hand the reporting rank's configuration to every rank.
///
/// The reporting rank passes `Some(config)` when it loaded its input and
/// `None` when it failed to; in the latter case every rank returns a
/// configuration error. Other ranks pass `None`.
pub fn share_run_config<C: Communicator>(
    comm: &C,
    config: Option<&RunConfig>,
) -> Result<RunConfig> {
    let mut bytes = [0u8; RunConfig::WIRE_LEN];
    if comm.is_root() {
        if let Some(config) = config {
            bytes = config.encode();
        }
    }
    comm.broadcast(&mut bytes)?;

    let config = RunConfig::decode(&bytes).ok_or_else(|| {
        LifeError::Configuration(
            "the reporting rank could not load the run configuration".to_string(),
        )
    })?;
    config.validate()?;
    Ok(config)
}

/// A parsed input file: run header plus starting grid.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub config: RunConfig,
    pub grid: Grid,
}

impl InputFile {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            error!(path = %path.display(), "could not open input file");
            LifeError::Io(e)
        })?;
        let input = Self::parse(&text)?;
        info!(
            path = %path.display(),
            rows = input.config.rows,
            cols = input.config.cols,
            live = input.grid.live_count(),
            "loaded input file"
        );
        Ok(input)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let header = lines
            .next()
            .ok_or_else(|| LifeError::Pattern("input file is empty".to_string()))?;

        let numbers = header
            .split_whitespace()
            .map(|token| {
                token.parse::<u64>().map_err(|_| {
                    LifeError::Pattern(format!(
                        "header token {token:?} is not a non-negative integer"
                    ))
                })
            })
            .collect::<Result<Vec<u64>>>()?;
        let (rows, cols, generations, output_every) = match numbers[..] {
            [n, g, o] => (n, n, g, o),
            [r, c, g, o] => (r, c, g, o),
            _ => {
                return Err(LifeError::Pattern(format!(
                    "header must be `N G O` or `R C G O`, got {header:?}"
                )))
            }
        };

        let dimension = |value: u64| {
            usize::try_from(value).map_err(|_| {
                LifeError::Configuration(format!("grid dimension {value} is too large"))
            })
        };
        let config = RunConfig {
            rows: dimension(rows)?,
            cols: dimension(cols)?,
            generations: Some(generations),
            output_every,
        };
        config.validate()?;

        // Grown from the rows actually present, never sized from the header.
        let mut cells = Vec::new();
        let mut row = 0;
        for line in lines {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            if row == config.rows {
                return Err(LifeError::Pattern(format!(
                    "more than {} grid rows in input",
                    config.rows
                )));
            }
            if line.len() != config.cols {
                return Err(LifeError::Pattern(format!(
                    "row {row} has {} cells, expected {}",
                    line.len(),
                    config.cols
                )));
            }
            for (col, ch) in line.chars().enumerate() {
                match ch {
                    '0' => cells.push(0),
                    '1' => cells.push(1),
                    other => {
                        return Err(LifeError::Pattern(format!(
                            "row {row} column {col}: expected 0 or 1, got {other:?}"
                        )))
                    }
                }
            }
            row += 1;
        }
        if row != config.rows {
            return Err(LifeError::Pattern(format!(
                "input has {row} grid rows, header says {}",
                config.rows
            )));
        }

        let grid = Grid::from_cells(config.rows, config.cols, cells)?;
        Ok(Self { config, grid })
    }
}
