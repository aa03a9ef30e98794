// worker.rs - One band's next generation

use std::future::Future;

use tokio::sync::mpsc;

use crate::band::{Band, BandResult};
use crate::event::Event;
use crate::grid::{neighbours_in, next_state, Cell};

/// A point where a worker may be held up between rows.
///
/// The worker only ever awaits this; what makes it wait (a pause slot, a
/// test harness, nothing at all) is up to the implementor.
pub trait Checkpoint: Send {
    fn wait(&mut self) -> impl Future<Output = ()> + Send;
}

/// Never waits.
impl Checkpoint for () {
    async fn wait(&mut self) {}
}

/// Computes the next generation of `band`'s non-halo rows.
///
/// Every cell that changes state is reported as a `CellFlipped` carrying its
/// global row. The checkpoint is awaited before each row, and the task yields
/// after each row so other workers and the distributor keep moving.
pub async fn compute_band<C: Checkpoint>(
    band: Band,
    completed_turns: usize,
    events: &mpsc::Sender<Event>,
    checkpoint: &mut C,
) -> BandResult {
    let width = band.width();
    let mut cells = Vec::with_capacity(band.interior_rows() * width);
    let mut alive = 0;

    for local in 1..band.rows() - 1 {
        checkpoint.wait().await;

        let (above, middle, below) = (band.row(local - 1), band.row(local), band.row(local + 1));
        for col in 0..width {
            let next = next_state(middle[col], neighbours_in(above, middle, below, col));
            if next != middle[col] {
                let cell = Cell::new(band.offset + local - 1, col);
                // A closed stream means nobody is listening; the turn still completes.
                let _ = events.send(Event::CellFlipped { completed_turns, cell }).await;
            }
            alive += usize::from(next);
            cells.push(next);
        }

        tokio::task::yield_now().await; // Cooperative yielding between rows
    }

    BandResult { index: band.index, offset: band.offset, width, cells, alive }
}
