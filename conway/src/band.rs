// band.rs - Cutting the grid into halo'd row bands and stitching them back

use std::ops::Range;

use crate::grid::Grid;

/// Rows handed to one worker for one turn.
///
/// The first and last rows are halo rows copied from the neighbouring band
/// (or the opposite edge of the torus). `offset` is the global row of the
/// first non-halo row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    pub index: usize,
    pub offset: usize,
    width: usize,
    cells: Vec<bool>,
}

impl Band {
    pub fn width(&self) -> usize {
        self.width
    }

    /// Row count including both halo rows.
    pub fn rows(&self) -> usize {
        self.cells.len() / self.width
    }

    pub fn interior_rows(&self) -> usize {
        self.rows() - 2
    }

    /// A band-local row; row 0 and `rows() - 1` are halo rows.
    pub fn row(&self, local: usize) -> &[bool] {
        &self.cells[local * self.width..(local + 1) * self.width]
    }
}

/// A worker's output: the next generation of its band's non-halo rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandResult {
    pub index: usize,
    pub offset: usize,
    pub width: usize,
    pub cells: Vec<bool>,
    pub alive: usize,
}

#[cfg(test)]
impl From<Band> for BandResult {
    /// Drops the halo rows without evolving anything.
    fn from(band: Band) -> Self {
        let width = band.width;
        let rows = band.rows();
        let cells = band.cells[width..(rows - 1) * width].to_vec();
        let alive = cells.iter().filter(|alive| **alive).count();
        Self { index: band.index, offset: band.offset, width, cells, alive }
    }
}

/// Non-halo row ranges for `threads` bands over `height` rows.
///
/// Every band gets `height / threads` rows and the last band also takes the
/// remainder, so the ranges always cover `0..height` exactly once.
pub fn band_bounds(height: usize, threads: usize) -> Vec<Range<usize>> {
    let chunk = height / threads;
    (0..threads)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == threads { height } else { start + chunk };
            start..end
        })
        .collect()
}

/// Cuts `grid` into `threads` bands, each with a wrapped halo row on both sides.
///
/// `threads` must be in `1..=grid.height()`; [`crate::Params::validate`]
/// guarantees this for a run.
pub fn make_bands(grid: &Grid, threads: usize) -> Vec<Band> {
    let (width, height) = (grid.width(), grid.height());
    band_bounds(height, threads)
        .into_iter()
        .enumerate()
        .map(|(index, rows)| {
            let above = (rows.start + height - 1) % height;
            let below = rows.end % height;

            let mut cells = Vec::with_capacity((rows.len() + 2) * width);
            cells.extend_from_slice(grid.row(above));
            cells.extend_from_slice(&grid.cells()[rows.start * width..rows.end * width]);
            cells.extend_from_slice(grid.row(below));

            Band { index, offset: rows.start, width, cells }
        })
        .collect()
}

/// Stitches worker output back into a full grid, in band order.
///
/// Results may arrive in any order; they are sorted by band index first.
pub fn merge_bands(mut results: Vec<BandResult>) -> Grid {
    results.sort_by_key(|result| result.index);

    let width = results.first().map_or(0, |result| result.width);
    let mut cells = Vec::with_capacity(results.iter().map(|result| result.cells.len()).sum());
    for result in results {
        debug_assert_eq!(result.offset * width, cells.len(), "band {} is out of place", result.index);
        cells.extend(result.cells);
    }

    let height = if width == 0 { 0 } else { cells.len() / width };
    Grid::from_cells(width, height, cells)
}
