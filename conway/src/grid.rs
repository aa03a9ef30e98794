// grid.rs - Toroidal grid and the Life rule

use std::fmt;

/// Byte used for an alive cell when a grid is written out.
pub const ALIVE: u8 = 255;
/// Byte used for a dead cell when a grid is written out.
pub const DEAD: u8 = 0;

/// A cell coordinate. Used as a grid index and as an event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Next state of a cell given its own state and its alive neighbour count.
pub fn next_state(alive: bool, neighbours: u8) -> bool {
    match (alive, neighbours) {
        (true, 2) | (true, 3) => true,   // Survival
        (false, 3)            => true,   // Birth
        _                     => false,  // Death or stays dead
    }
}

/// Counts the alive neighbours of `middle[col]`, wrapping columns.
///
/// Rows are supplied by the caller so the same count serves the full grid
/// (rows wrapped by index) and a band (rows wrapped by halo).
pub(crate) fn neighbours_in(above: &[bool], middle: &[bool], below: &[bool], col: usize) -> u8 {
    let width = middle.len();
    let left = (col + width - 1) % width;
    let right = (col + 1) % width;

    let neighbours = [
        above[left],  above[col],  above[right],
        middle[left],              middle[right],
        below[left],  below[col],  below[right],
    ];
    neighbours.iter().filter(|&&alive| alive).count() as u8
}

/// A `width × height` boolean matrix, row-major, wrapping at every edge.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Grid {
    /// An all-dead grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, cells: vec![false; width * height] }
    }

    /// Builds a grid from row-major cells. `cells.len()` must be `width * height`.
    pub fn from_cells(width: usize, height: usize, cells: Vec<bool>) -> Self {
        assert_eq!(cells.len(), width * height, "cell count does not match {width}x{height}");
        Self { width, height, cells }
    }

    /// Builds a grid with exactly the listed cells alive.
    pub fn from_alive(width: usize, height: usize, alive: &[Cell]) -> Self {
        let mut grid = Self::new(width, height);
        for cell in alive {
            grid.set(cell.row, cell.col, true);
        }
        grid
    }

    /// Reads the column-major byte stream used for images: byte
    /// `col * height + row` holds cell `(row, col)`, non-zero meaning alive.
    pub fn from_column_major(width: usize, height: usize, bytes: &[u8]) -> Self {
        assert_eq!(bytes.len(), width * height, "byte count does not match {width}x{height}");
        let mut grid = Self::new(width, height);
        for col in 0..width {
            for row in 0..height {
                grid.set(row, col, bytes[col * height + row] != DEAD);
            }
        }
        grid
    }

    /// Inverse of [`Grid::from_column_major`], writing `ALIVE`/`DEAD` bytes.
    pub fn to_column_major(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.cells.len());
        for col in 0..self.width {
            for row in 0..self.height {
                bytes.push(if self.get(row, col) { ALIVE } else { DEAD });
            }
        }
        bytes
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.width + col]
    }

    pub fn set(&mut self, row: usize, col: usize, alive: bool) {
        self.cells[row * self.width + col] = alive;
    }

    pub fn toggle(&mut self, row: usize, col: usize) {
        let index = row * self.width + col;
        self.cells[index] = !self.cells[index];
    }

    pub fn row(&self, row: usize) -> &[bool] {
        &self.cells[row * self.width..(row + 1) * self.width]
    }

    /// Row-major cells, used when cutting bands.
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Alive neighbours of `(row, col)` on the torus, in `0..=8`.
    pub fn neighbours(&self, row: usize, col: usize) -> u8 {
        let above = (row + self.height - 1) % self.height;
        let below = (row + 1) % self.height;
        neighbours_in(self.row(above), self.row(row), self.row(below), col)
    }

    /// One sequential turn. The parallel engine must agree with this exactly.
    pub fn step(&self) -> Grid {
        let mut cells = Vec::with_capacity(self.cells.len());
        for row in 0..self.height {
            for col in 0..self.width {
                cells.push(next_state(self.get(row, col), self.neighbours(row, col)));
            }
        }
        Grid { width: self.width, height: self.height, cells }
    }

    /// Alive cells in row-major order.
    pub fn alive_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(index, _)| Cell::new(index / self.width, index % self.width))
            .collect()
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|alive| **alive).count()
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {}x{}", self.width, self.height)?;
        for row in 0..self.height {
            let line: String = self.row(row).iter().map(|&alive| if alive { '#' } else { '.' }).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
