// ticker.rs - Periodic alive cell reports, independent of the turn loop

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::event::Event;

/// The distributor's latest published turn count and alive count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed_turns: usize,
    pub alive: usize,
}

/// A running ticker task. Stopping it waits for the task to finish, so no
/// `AliveCellsCount` can be sent after [`Ticker::stop`] returns.
pub struct Ticker {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Starts reporting every `period`, first one period from now.
    pub fn start(
        period: Duration,
        progress: watch::Receiver<Progress>,
        events: mpsc::Sender<Event>,
    ) -> Self {
        let (stop, mut stopped) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    // Also fires if the `Ticker` is dropped without being stopped.
                    _ = &mut stopped => break,
                    _ = interval.tick() => {
                        let Progress { completed_turns, alive } = *progress.borrow();
                        let report = Event::AliveCellsCount { completed_turns, cells_count: alive };
                        if events.send(report).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        debug!(?period, "ticker started");
        Self { stop, handle }
    }

    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(err) = self.handle.await {
            warn!(%err, "ticker task failed");
        }
        debug!("ticker stopped");
    }
}
