// control.rs - Commands, the pause/resume transition table and per-worker pause slots

use tokio::sync::watch;
use tracing::trace;

use crate::worker::Checkpoint;

/// A control command from outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Save,
    Quit,
    Pause,
    Resume,
}

impl Command {
    /// Key bindings: `s` saves, `q` quits, `p` pauses (and resumes when paused).
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            's' => Some(Command::Save),
            'q' => Some(Command::Quit),
            'p' => Some(Command::Pause),
            _ => None,
        }
    }
}

/// Where the distributor's state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Paused,
    Draining,
    Terminated,
}

/// What the distributor should do about a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Save,
    Pause,
    Resume,
    Quit,
    Ignore,
}

/// The control transition table.
///
/// `Pause` while paused resumes, so a single key toggles. Nothing is
/// accepted once the run is draining.
pub fn transition(phase: Phase, command: Command) -> Action {
    match (phase, command) {
        (Phase::Running | Phase::Paused, Command::Save) => Action::Save,
        (Phase::Running | Phase::Paused, Command::Quit) => Action::Quit,
        (Phase::Running, Command::Pause)                => Action::Pause,
        (Phase::Running, Command::Resume)               => Action::Ignore,
        (Phase::Paused, Command::Pause | Command::Resume) => Action::Resume,
        (Phase::Draining | Phase::Terminated, _)        => Action::Ignore,
    }
}

/// Value held in a pause slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Running,
    Paused,
}

/// One pause slot per band, shared by every turn of a run.
///
/// Each slot holds the latest signal only, so repeated pause/resume cycles
/// can never queue up stale tokens or block the distributor.
pub struct ControlSlots {
    slots: Vec<watch::Sender<Signal>>,
}

impl ControlSlots {
    pub fn new(threads: usize) -> Self {
        Self {
            slots: (0..threads).map(|_| watch::channel(Signal::Running).0).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The checkpoint handed to the worker for `band`.
    pub fn checkpoint(&self, band: usize) -> SlotCheckpoint {
        SlotCheckpoint { band, signal: self.slots[band].subscribe() }
    }

    pub fn pause_all(&self) {
        self.set_all(Signal::Paused);
    }

    pub fn resume_all(&self) {
        self.set_all(Signal::Running);
    }

    fn set_all(&self, signal: Signal) {
        for slot in &self.slots {
            // Succeeds whether or not a worker is currently subscribed.
            slot.send_replace(signal);
        }
    }
}

/// A worker's view of its pause slot.
pub struct SlotCheckpoint {
    band: usize,
    signal: watch::Receiver<Signal>,
}

impl Checkpoint for SlotCheckpoint {
    async fn wait(&mut self) {
        let mut stopped = false;
        loop {
            let signal = *self.signal.borrow_and_update();
            if signal == Signal::Running {
                break;
            }
            if !stopped {
                trace!(band = self.band, "worker stopped");
                stopped = true;
            }
            // The slots are gone with the distributor; nobody can resume us.
            if self.signal.changed().await.is_err() {
                break;
            }
        }
        if stopped {
            trace!(band = self.band, "worker resumed");
        }
    }
}
