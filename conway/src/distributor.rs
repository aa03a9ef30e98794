// distributor.rs - The turn loop: fan bands out to workers, gather them back, obey commands

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

use crate::band::{make_bands, merge_bands, BandResult};
use crate::control::{transition, Action, Command, ControlSlots, Phase};
use crate::error::Result;
use crate::event::{Event, State};
use crate::grid::Grid;
use crate::io::{ImageStore, IoHandle};
use crate::params::Params;
use crate::ticker::{Progress, Ticker};
use crate::worker::compute_band;

/// Runs a whole game: load the initial world, play `params.turns` turns and
/// drain.
///
/// The event stream ends when this returns. Invalid parameters and a missing
/// or malformed initial image are reported before any event is sent.
pub async fn run<S: ImageStore>(
    params: Params,
    store: S,
    events: mpsc::Sender<Event>,
    commands: mpsc::Receiver<Command>,
) -> Result<()> {
    params.validate()?;

    let (io, io_task) = IoHandle::spawn(store);
    let (width, height) = (params.image_width, params.image_height);
    let bytes = io.read(&params.input_name(), width, height).await?;
    let world = Grid::from_column_major(width, height, &bytes);

    let mut distributor = Distributor::new(params, world, events, commands, io);
    let outcome = distributor.execute().instrument(info_span!("distributor")).await;

    // Drops the last event sender and io handle.
    drop(distributor);
    if let Err(err) = io_task.await {
        warn!(%err, "io task failed");
    }
    outcome
}

/// A failed worker ends the turn; the rest are stopped before any further
/// event can be sent.
async fn collect(
    workers: &mut JoinSet<BandResult>,
    joined: Result<BandResult, JoinError>,
) -> Result<BandResult> {
    match joined {
        Ok(result) => Ok(result),
        Err(err) => {
            workers.shutdown().await;
            Err(err.into())
        }
    }
}

struct Distributor {
    params: Params,
    world: Grid,
    completed_turns: usize,
    phase: Phase,
    events: mpsc::Sender<Event>,
    commands: mpsc::Receiver<Command>,
    commands_open: bool,
    io: IoHandle,
    slots: ControlSlots,
    progress: watch::Sender<Progress>,
    ticker: Option<Ticker>,
}

impl Distributor {
    fn new(
        params: Params,
        world: Grid,
        events: mpsc::Sender<Event>,
        commands: mpsc::Receiver<Command>,
        io: IoHandle,
    ) -> Self {
        let progress = Progress { completed_turns: 0, alive: world.alive_count() };
        Self {
            slots: ControlSlots::new(params.threads),
            progress: watch::channel(progress).0,
            params,
            world,
            completed_turns: 0,
            phase: Phase::Running,
            events,
            commands,
            commands_open: true,
            io,
            ticker: None,
        }
    }

    async fn execute(&mut self) -> Result<()> {
        info!(
            turns = self.params.turns,
            threads = self.params.threads,
            width = self.params.image_width,
            height = self.params.image_height,
            "starting"
        );

        for cell in self.world.alive_cells() {
            self.emit(Event::CellFlipped { completed_turns: 0, cell }).await;
        }
        self.start_ticker();

        match self.play().await {
            Ok(()) => {
                let drained = self.drain().await;
                info!(completed_turns = self.completed_turns, "finished");
                drained
            }
            Err(err) => {
                error!(%err, completed_turns = self.completed_turns, "run aborted");
                self.terminate().await;
                Err(err)
            }
        }
    }

    /// Plays turns until they run out or a quit is accepted.
    async fn play(&mut self) -> Result<()> {
        while self.completed_turns < self.params.turns {
            if let Some(command) = self.poll_command() {
                self.handle(command).await?;
            }

            while self.phase == Phase::Paused {
                match self.commands.recv().await {
                    Some(command) => self.handle(command).await?,
                    None => self.controls_closed(),
                }
            }
            if self.phase == Phase::Draining {
                return Ok(());
            }

            self.turn().await?;
            if self.phase == Phase::Draining {
                return Ok(());
            }
        }
        Ok(())
    }

    /// At most one command, without blocking.
    fn poll_command(&mut self) -> Option<Command> {
        if !self.commands_open {
            return None;
        }
        match self.commands.try_recv() {
            Ok(command) => Some(command),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.controls_closed();
                None
            }
        }
    }

    /// Nobody can resume a paused run once the control input is gone.
    fn controls_closed(&mut self) {
        self.commands_open = false;
        if self.phase == Phase::Paused {
            warn!("control input closed while paused, quitting");
            self.quit();
        } else {
            debug!("control input closed");
        }
    }

    /// One turn: a worker per band, a barrier, a merge.
    ///
    /// Commands are still served while the workers run, so a pause holds them
    /// at their next row.
    async fn turn(&mut self) -> Result<()> {
        let turn = self.completed_turns;
        let threads = self.params.threads;

        let mut workers = JoinSet::new();
        for band in make_bands(&self.world, threads) {
            let events = self.events.clone();
            let mut checkpoint = self.slots.checkpoint(band.index);
            workers.spawn(async move { compute_band(band, turn, &events, &mut checkpoint).await });
        }

        let mut results = Vec::with_capacity(threads);
        while results.len() < threads {
            tokio::select! {
                joined = workers.join_next() => match joined {
                    Some(joined) => results.push(collect(&mut workers, joined).await?),
                    None => break,
                },
                command = self.commands.recv(), if self.commands_open => match command {
                    Some(command) => self.handle(command).await?,
                    None => self.controls_closed(),
                },
            }
        }

        let alive: usize = results.iter().map(|result| result.alive).sum();
        self.world = merge_bands(results);
        self.completed_turns += 1;

        let completed_turns = self.completed_turns;
        self.emit(Event::TurnComplete { completed_turns }).await;
        self.progress.send_replace(Progress { completed_turns, alive });
        trace!(completed_turns, alive, "turn complete");
        Ok(())
    }

    async fn handle(&mut self, command: Command) -> Result<()> {
        match transition(self.phase, command) {
            Action::Save => self.save().await?,
            Action::Pause => self.pause().await,
            Action::Resume => self.resume().await,
            Action::Quit => self.quit(),
            Action::Ignore => debug!(?command, phase = ?self.phase, "command ignored"),
        }
        Ok(())
    }

    async fn save(&mut self) -> Result<()> {
        let completed_turns = self.completed_turns;
        let filename = self.params.output_name(completed_turns);
        let (width, height) = (self.params.image_width, self.params.image_height);

        self.io.write(&filename, width, height, self.world.to_column_major()).await?;
        debug!(%filename, "snapshot written");
        self.emit(Event::ImageOutputComplete { completed_turns, filename }).await;
        Ok(())
    }

    async fn pause(&mut self) {
        self.slots.pause_all();
        self.stop_ticker().await;
        self.phase = Phase::Paused;
        debug!(completed_turns = self.completed_turns, "paused");
        self.emit_state(State::Paused).await;
    }

    async fn resume(&mut self) {
        self.slots.resume_all();
        self.start_ticker();
        self.phase = Phase::Running;
        debug!(completed_turns = self.completed_turns, "resumed");
        self.emit_state(State::Executing).await;
    }

    /// Stops accepting commands. Any paused workers are released so the
    /// current turn can reach its barrier before draining.
    fn quit(&mut self) {
        self.slots.resume_all();
        self.phase = Phase::Draining;
        debug!(completed_turns = self.completed_turns, "quit requested");
    }

    /// Final snapshot, final report, wait for io, terminate.
    async fn drain(&mut self) -> Result<()> {
        self.phase = Phase::Draining;
        self.stop_ticker().await;

        let saved = self.save().await;
        self.emit(Event::FinalTurnComplete {
            completed_turns: self.completed_turns,
            alive: self.world.alive_cells(),
        })
        .await;

        // Make sure the io has finished any output before exiting.
        let idle = self.io.check_idle().await;
        self.terminate().await;
        saved.and(idle)
    }

    /// The only way out: after this no more events are sent.
    async fn terminate(&mut self) {
        self.stop_ticker().await;
        self.emit_state(State::Quitting).await;
        self.phase = Phase::Terminated;
    }

    fn start_ticker(&mut self) {
        if self.ticker.is_none() {
            self.ticker = Some(Ticker::start(
                self.params.ticker_period,
                self.progress.subscribe(),
                self.events.clone(),
            ));
        }
    }

    async fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop().await;
        }
    }

    async fn emit_state(&self, new_state: State) {
        self.emit(Event::StateChange { completed_turns: self.completed_turns, new_state }).await;
    }

    async fn emit(&self, event: Event) {
        if self.events.send(event).await.is_err() {
            trace!("event stream has no consumer");
        }
    }
}
