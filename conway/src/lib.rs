// lib.rs - Parallel Conway's Game of Life on a torus
//
// The grid is cut into one halo'd row band per worker every turn. Workers run
// as tokio tasks, report every cell they flip, and can be held mid-turn by a
// pause. A ticker reports the alive cell count on the side.

pub mod band;
pub mod control;
pub mod distributor;
pub mod error;
pub mod event;
pub mod grid;
pub mod io;
pub mod params;
pub mod patterns;
pub mod ticker;
pub mod worker;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use control::Command;
pub use distributor::run;
pub use error::{Error, Result};
pub use event::{Event, State};
pub use grid::{Cell, Grid};
pub use io::{ImageStore, MemoryStore, PgmStore, SeededStore};
pub use params::Params;

/// Capacity of the event stream before producers wait for the consumer.
pub const EVENT_BUFFER: usize = 1024;
/// Capacity of the command input.
pub const COMMAND_BUFFER: usize = 16;

/// A game running in the background.
pub struct Session {
    /// Ends after `StateChange { new_state: Quitting }`.
    pub events: mpsc::Receiver<Event>,
    pub commands: mpsc::Sender<Command>,
    pub handle: JoinHandle<Result<()>>,
}

/// Starts [`run`] on the current tokio runtime.
pub fn spawn<S: ImageStore>(params: Params, store: S) -> Session {
    let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
    let (commands, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let handle = tokio::spawn(run(params, store, events_tx, commands_rx));
    Session { events, commands, handle }
}
