// event.rs - Everything the engine reports to whoever is watching

use std::fmt;

use crate::grid::Cell;

/// Execution state announced through [`Event::StateChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Executing,
    Paused,
    Quitting,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Executing => "Executing",
            State::Paused => "Paused",
            State::Quitting => "Quitting",
        })
    }
}

/// Events on the engine's output stream.
///
/// `completed_turns` is always the number of turns finished when the event
/// was produced, so a `CellFlipped` made while computing turn `n` carries `n`
/// and the `TurnComplete` that follows carries `n + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A cell changed state. Also sent at turn 0 for every initially alive cell.
    CellFlipped { completed_turns: usize, cell: Cell },
    TurnComplete { completed_turns: usize },
    /// Sent once, just before the run terminates.
    FinalTurnComplete { completed_turns: usize, alive: Vec<Cell> },
    /// Periodic report from the ticker; may lag the turn counter slightly.
    AliveCellsCount { completed_turns: usize, cells_count: usize },
    ImageOutputComplete { completed_turns: usize, filename: String },
    StateChange { completed_turns: usize, new_state: State },
}

impl Event {
    pub fn completed_turns(&self) -> usize {
        match self {
            Event::CellFlipped { completed_turns, .. }
            | Event::TurnComplete { completed_turns }
            | Event::FinalTurnComplete { completed_turns, .. }
            | Event::AliveCellsCount { completed_turns, .. }
            | Event::ImageOutputComplete { completed_turns, .. }
            | Event::StateChange { completed_turns, .. } => *completed_turns,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::CellFlipped { completed_turns, cell } => {
                write!(f, "Completed Turns {completed_turns:<8} Cell flipped at {cell}")
            }
            Event::TurnComplete { completed_turns } => {
                write!(f, "Completed Turns {completed_turns:<8} Turn complete")
            }
            Event::FinalTurnComplete { completed_turns, alive } => {
                write!(f, "Completed Turns {completed_turns:<8} Final turn complete, {} alive", alive.len())
            }
            Event::AliveCellsCount { completed_turns, cells_count } => {
                write!(f, "Completed Turns {completed_turns:<8} Alive cells {cells_count:<8}")
            }
            Event::ImageOutputComplete { completed_turns, filename } => {
                write!(f, "Completed Turns {completed_turns:<8} File {filename} output complete")
            }
            Event::StateChange { completed_turns, new_state } => {
                write!(f, "Completed Turns {completed_turns:<8} {new_state}")
            }
        }
    }
}
