//! Sparse starting patterns.
//!
//! A pattern is a grid size plus the coordinates of the cells that start
//! alive. The reporting rank turns it into a dense [`Grid`] once, right
//! before the scatter.

use crate::error::{LifeError, Result};
use crate::grid::Grid;

/// Initial cell pattern: dimensions and live `(row, col)` coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<(usize, usize)>,
}

impl Pattern {
    pub fn new(rows: usize, cols: usize, cells: Vec<(usize, usize)>) -> Self {
        Self { rows, cols, cells }
    }

    /// Rasterise into a dense grid. Out-of-range coordinates are an error
    /// rather than being wrapped silently.
    pub fn to_grid(&self) -> Result<Grid> {
        let mut grid = Grid::new(self.rows, self.cols)?;
        for &(r, c) in &self.cells {
            if r >= self.rows || c >= self.cols {
                return Err(LifeError::Pattern(format!(
                    "cell ({r}, {c}) lies outside the {}x{} grid",
                    self.rows, self.cols
                )));
            }
            grid.set(r, c, true);
        }
        Ok(grid)
    }
}

/// A built-in pattern with the grid size it is meant to run on.
pub struct NamedPattern {
    pub name: &'static str,
    pub dims: (usize, usize),
    pub cells: &'static [(usize, usize)],
}

impl NamedPattern {
    pub fn to_pattern(&self) -> Pattern {
        Pattern::new(self.dims.0, self.dims.1, self.cells.to_vec())
    }
}

pub const PATTERNS: &[NamedPattern] = &[
    NamedPattern {
        name: "blinker",
        dims: (5, 5),
        cells: &[(2, 1), (2, 2), (2, 3)],
    },
    NamedPattern {
        name: "toad",
        dims: (6, 6),
        cells: &[(2, 2), (2, 3), (2, 4), (3, 3), (3, 4), (3, 5)],
    },
    NamedPattern {
        name: "acorn",
        dims: (100, 100),
        cells: &[(51, 52), (52, 54), (53, 51), (53, 52), (53, 55), (53, 56), (53, 57)],
    },
    NamedPattern {
        name: "beacon",
        dims: (6, 6),
        cells: &[(1, 3), (1, 4), (2, 3), (2, 4), (3, 1), (3, 2), (4, 1), (4, 2)],
    },
    NamedPattern {
        name: "boat",
        dims: (5, 5),
        cells: &[(1, 1), (1, 2), (2, 1), (2, 3), (3, 2)],
    },
    NamedPattern {
        name: "glider",
        dims: (100, 90),
        cells: &[(1, 1), (2, 2), (2, 3), (3, 1), (3, 2)],
    },
    NamedPattern {
        name: "glider_gun",
        dims: (400, 400),
        cells: &[
            (51, 76), (52, 74), (52, 76), (53, 64), (53, 65), (53, 72), (53, 73), (53, 86),
            (53, 87), (54, 63), (54, 67), (54, 72), (54, 73), (54, 86), (54, 87), (55, 52),
            (55, 53), (55, 62), (55, 68), (55, 72), (55, 73), (56, 52), (56, 53), (56, 62),
            (56, 66), (56, 68), (56, 69), (56, 74), (56, 76), (57, 62), (57, 68), (57, 76),
            (58, 63), (58, 67), (59, 64), (59, 65),
        ],
    },
    NamedPattern {
        name: "space_ship",
        dims: (25, 25),
        cells: &[
            (11, 13), (11, 14), (12, 11), (12, 12), (12, 14), (12, 15), (13, 11), (13, 12),
            (13, 13), (13, 14), (14, 12), (14, 13),
        ],
    },
    NamedPattern {
        name: "die_hard",
        dims: (100, 100),
        cells: &[(51, 57), (52, 51), (52, 52), (53, 52), (53, 56), (53, 57), (53, 58)],
    },
    NamedPattern {
        name: "pulsar",
        dims: (17, 17),
        cells: &[
            (2, 4), (2, 5), (2, 6), (7, 4), (7, 5), (7, 6), (9, 4), (9, 5), (9, 6), (14, 4),
            (14, 5), (14, 6), (2, 10), (2, 11), (2, 12), (7, 10), (7, 11), (7, 12), (9, 10),
            (9, 11), (9, 12), (14, 10), (14, 11), (14, 12), (4, 2), (5, 2), (6, 2), (4, 7),
            (5, 7), (6, 7), (4, 9), (5, 9), (6, 9), (4, 14), (5, 14), (6, 14), (10, 2),
            (11, 2), (12, 2), (10, 7), (11, 7), (12, 7), (10, 9), (11, 9), (12, 9), (10, 14),
            (11, 14), (12, 14),
        ],
    },
    NamedPattern {
        name: "floraison",
        dims: (40, 40),
        cells: &[
            (19, 18), (19, 19), (19, 20), (20, 17), (20, 19), (20, 21), (21, 18), (21, 19),
            (21, 20),
        ],
    },
    NamedPattern {
        name: "block_switch_engine",
        dims: (400, 400),
        cells: &[
            (201, 202), (201, 203), (202, 202), (202, 203), (211, 203), (212, 204),
            (212, 202), (214, 204), (214, 201), (215, 201), (215, 202), (216, 201),
        ],
    },
    NamedPattern {
        name: "u",
        dims: (200, 200),
        cells: &[
            (101, 101), (102, 102), (103, 102), (103, 101), (104, 103), (105, 103),
            (105, 102), (105, 101), (105, 105), (103, 105), (102, 105), (101, 105),
            (101, 104),
        ],
    },
    NamedPattern {
        name: "flat",
        dims: (200, 400),
        cells: &[
            (80, 200), (81, 200), (82, 200), (83, 200), (84, 200), (85, 200), (86, 200),
            (87, 200), (89, 200), (90, 200), (91, 200), (92, 200), (93, 200), (97, 200),
            (98, 200), (99, 200), (106, 200), (107, 200), (108, 200), (109, 200), (110, 200),
            (111, 200), (112, 200), (114, 200), (115, 200), (116, 200), (117, 200),
            (118, 200),
        ],
    },
];

/// Look up a built-in pattern by name.
pub fn find_pattern(name: &str) -> Option<&'static NamedPattern> {
    PATTERNS.iter().find(|p| p.name == name)
}

/// Names of all built-in patterns, for CLI help and error messages.
pub fn pattern_names() -> Vec<&'static str> {
    PATTERNS.iter().map(|p| p.name).collect()
}
