// patterns.rs - Named seed patterns and a seeded random fill

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::grid::Grid;

/// A pattern as `(row, col)` offsets from its top-left corner.
pub struct Pattern {
    pub name: &'static str,
    pub cells: &'static [(usize, usize)],
}

pub const PATTERNS: &[Pattern] = &[
    Pattern {
        name: "Glider",
        cells: &[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)],
    },
    Pattern {
        name: "Blinker",
        cells: &[(0, 0), (0, 1), (0, 2)],
    },
    Pattern {
        name: "Toad",
        cells: &[(0, 1), (0, 2), (0, 3), (1, 0), (1, 1), (1, 2)],
    },
    Pattern {
        name: "Beacon",
        cells: &[(0, 0), (0, 1), (1, 0), (1, 1), (2, 2), (2, 3), (3, 2), (3, 3)],
    },
    Pattern {
        name: "Pulsar",
        cells: &[
            // Top half
            (0, 2), (0, 3), (0, 4), (0, 8), (0, 9), (0, 10),
            (2, 0), (2, 5), (2, 7), (2, 12),
            (3, 0), (3, 5), (3, 7), (3, 12),
            (4, 0), (4, 5), (4, 7), (4, 12),
            (5, 2), (5, 3), (5, 4), (5, 8), (5, 9), (5, 10),
            // Bottom half (mirrored)
            (7, 2), (7, 3), (7, 4), (7, 8), (7, 9), (7, 10),
            (8, 0), (8, 5), (8, 7), (8, 12),
            (9, 0), (9, 5), (9, 7), (9, 12),
            (10, 0), (10, 5), (10, 7), (10, 12),
            (12, 2), (12, 3), (12, 4), (12, 8), (12, 9), (12, 10),
        ],
    },
    Pattern {
        name: "R-pentomino",
        cells: &[(0, 1), (0, 2), (1, 0), (1, 1), (2, 1)],
    },
    Pattern {
        name: "Gosper Glider Gun",
        cells: &[
            (4, 0), (4, 1), (5, 0), (5, 1),
            (4, 10), (5, 10), (6, 10), (3, 11), (7, 11), (2, 12), (8, 12),
            (2, 13), (8, 13), (5, 14), (3, 15), (7, 15), (4, 16), (5, 16),
            (6, 16), (5, 17), (2, 20), (3, 20), (4, 20), (2, 21), (3, 21),
            (4, 21), (1, 22), (5, 22), (0, 24), (1, 24), (5, 24), (6, 24),
            (2, 34), (3, 34), (2, 35), (3, 35),
        ],
    },
];

/// Looks a pattern up by name, ignoring case, spaces and dashes.
pub fn find(name: &str) -> Option<&'static Pattern> {
    let wanted = normalise(name);
    PATTERNS.iter().find(|pattern| normalise(pattern.name) == wanted)
}

fn normalise(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl Pattern {
    /// Rows and columns spanned by the pattern.
    pub fn extent(&self) -> (usize, usize) {
        let rows = self.cells.iter().map(|&(row, _)| row + 1).max().unwrap_or(0);
        let cols = self.cells.iter().map(|&(_, col)| col + 1).max().unwrap_or(0);
        (rows, cols)
    }

    /// Sets the pattern's cells alive with its top-left corner at
    /// `(row, col)`, wrapping around the grid edges.
    pub fn stamp(&self, grid: &mut Grid, row: usize, col: usize) {
        for &(dr, dc) in self.cells {
            grid.set((row + dr) % grid.height(), (col + dc) % grid.width(), true);
        }
    }

    /// A fresh grid with the pattern in the middle.
    pub fn centred(&self, width: usize, height: usize) -> Grid {
        let (rows, cols) = self.extent();
        let mut grid = Grid::new(width, height);
        self.stamp(&mut grid, height.saturating_sub(rows) / 2, width.saturating_sub(cols) / 2);
        grid
    }
}

/// A grid with roughly a third of its cells alive, reproducible from `seed_value`.
pub fn random(width: usize, height: usize, seed_value: u32) -> Grid {
    let mut hasher = DefaultHasher::new();
    seed_value.hash(&mut hasher);
    let mut seed = hasher.finish();

    let mut grid = Grid::new(width, height);
    for row in 0..height {
        for col in 0..width {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            grid.set(row, col, (seed >> 16) % 3 == 0);
        }
    }
    grid
}
