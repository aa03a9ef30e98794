use std::time::Duration;

use conway::{patterns, Cell, Command, Error, Event, Grid, ImageStore, MemoryStore, Params, State};

/// Collects every event of a run that nobody steers.
async fn run_to_end(params: Params, world: &Grid) -> (Vec<Event>, MemoryStore, conway::Result<()>) {
    let store = MemoryStore::new();
    store.insert_grid(params.input_name(), world);

    let mut session = conway::spawn(params, store.clone());
    let mut events = Vec::new();
    while let Some(event) = session.events.recv().await {
        events.push(event);
    }
    let outcome = session.handle.await.expect("distributor task panicked");
    (events, store, outcome)
}

fn evolve(world: &Grid, turns: usize) -> Grid {
    let mut grid = world.clone();
    for _ in 0..turns {
        grid = grid.step();
    }
    grid
}

fn final_grid(params: &Params, events: &[Event]) -> Grid {
    let finals: Vec<&Vec<Cell>> = events
        .iter()
        .filter_map(|event| match event {
            Event::FinalTurnComplete { alive, .. } => Some(alive),
            _ => None,
        })
        .collect();
    assert_eq!(finals.len(), 1, "expected exactly one FinalTurnComplete");
    Grid::from_alive(params.image_width, params.image_height, finals[0])
}

fn saved_grid(params: &Params, store: &MemoryStore, completed_turns: usize) -> Grid {
    let bytes = store
        .get(&params.output_name(completed_turns))
        .unwrap_or_else(|| panic!("no snapshot after {completed_turns} turns in {:?}", store.names()));
    Grid::from_column_major(params.image_width, params.image_height, &bytes)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn thread_count_does_not_change_the_result() {
    let world = patterns::random(48, 48, 2024);
    let expected = evolve(&world, 25);

    for threads in [1, 2, 3, 4, 5, 7, 8, 16, 48] {
        let params = Params::new(25, threads, 48, 48);
        let (events, store, outcome) = run_to_end(params, &world).await;
        outcome.unwrap();

        assert_eq!(final_grid(&params, &events), expected, "{threads} threads");
        assert_eq!(saved_grid(&params, &store, 25), expected, "{threads} threads");
    }
}

#[tokio::test]
async fn zero_turns_reports_the_initial_world() {
    let world = patterns::random(16, 16, 3);
    let params = Params::new(0, 4, 16, 16);
    let (events, store, outcome) = run_to_end(params, &world).await;
    outcome.unwrap();

    let flips = events.iter().filter(|event| matches!(event, Event::CellFlipped { .. })).count();
    assert_eq!(flips, world.alive_count());
    assert_eq!(final_grid(&params, &events), world);
    assert_eq!(saved_grid(&params, &store, 0), world);
    assert!(!events.iter().any(|event| matches!(event, Event::TurnComplete { .. })));
    assert_eq!(
        events.last(),
        Some(&Event::StateChange { completed_turns: 0, new_state: State::Quitting })
    );
}

#[tokio::test]
async fn blinker_has_period_two() {
    let world = patterns::find("Blinker").unwrap().centred(8, 8);

    let params = Params::new(1, 2, 8, 8);
    let (events, _, outcome) = run_to_end(params, &world).await;
    outcome.unwrap();
    assert_ne!(final_grid(&params, &events), world);

    let params = Params::new(2, 2, 8, 8);
    let (events, _, outcome) = run_to_end(params, &world).await;
    outcome.unwrap();
    assert_eq!(final_grid(&params, &events), world);
}

#[tokio::test]
async fn events_follow_the_turn_structure() {
    let world = patterns::find("Glider").unwrap().centred(10, 10);
    let params = Params::new(3, 2, 10, 10);
    let (events, _, outcome) = run_to_end(params, &world).await;
    outcome.unwrap();

    // Flips for turn n come before TurnComplete { n + 1 }.
    let mut completed = 0;
    for event in &events {
        match event {
            Event::CellFlipped { completed_turns, .. } => assert_eq!(*completed_turns, completed),
            Event::TurnComplete { completed_turns } => {
                completed += 1;
                assert_eq!(*completed_turns, completed);
            }
            _ => {}
        }
    }
    assert_eq!(completed, 3);

    let tail: Vec<&Event> = events.iter().rev().take(3).collect();
    assert!(matches!(tail[2], Event::ImageOutputComplete { completed_turns: 3, filename } if filename == "10x10x3"));
    assert!(matches!(tail[1], Event::FinalTurnComplete { completed_turns: 3, .. }));
    assert_eq!(tail[0], &Event::StateChange { completed_turns: 3, new_state: State::Quitting });
}

#[tokio::test]
async fn flips_replay_onto_the_final_world() {
    let world = patterns::random(20, 20, 77);
    let params = Params::new(10, 3, 20, 20);
    let (events, _, outcome) = run_to_end(params, &world).await;
    outcome.unwrap();

    let mut replayed = Grid::new(20, 20);
    for event in &events {
        if let Event::CellFlipped { cell, .. } = event {
            replayed.toggle(cell.row, cell.col);
        }
    }
    assert_eq!(replayed, evolve(&world, 10));
}

#[tokio::test]
async fn pause_and_resume_do_not_change_the_result() {
    let world = patterns::random(64, 64, 99);
    let params = Params::new(300, 4, 64, 64).with_ticker_period(Duration::from_millis(5));
    let store = MemoryStore::new();
    store.insert_grid(params.input_name(), &world);

    let mut session = conway::spawn(params, store.clone());
    let mut events = Vec::new();
    let mut paused_at = None;
    let mut resumed = false;
    let mut ticks_while_paused = 0;
    let mut turns_while_paused = 0;

    while let Some(event) = session.events.recv().await {
        match &event {
            Event::TurnComplete { completed_turns: 5 } if paused_at.is_none() => {
                session.commands.send(Command::Pause).await.unwrap();
            }
            Event::StateChange { completed_turns, new_state: State::Paused } => {
                paused_at = Some(*completed_turns);
                tokio::time::sleep(Duration::from_millis(40)).await;
                session.commands.send(Command::Save).await.unwrap();
            }
            Event::ImageOutputComplete { .. } if paused_at.is_some() && !resumed => {
                session.commands.send(Command::Pause).await.unwrap();
            }
            Event::StateChange { new_state: State::Executing, .. } => resumed = true,
            Event::AliveCellsCount { .. } if paused_at.is_some() && !resumed => ticks_while_paused += 1,
            Event::TurnComplete { .. } if paused_at.is_some() && !resumed => turns_while_paused += 1,
            _ => {}
        }
        events.push(event);
    }
    session.handle.await.unwrap().unwrap();

    let paused_at = paused_at.expect("the run never paused");
    assert!(resumed, "the run never resumed");
    assert_eq!(ticks_while_paused, 0, "the ticker kept running while paused");
    // Only the turn already in flight may complete while paused.
    assert!(turns_while_paused <= 1, "{turns_while_paused} turns completed while paused");
    assert!(store.get(&params.output_name(paused_at)).is_some() || turns_while_paused == 1);

    assert_eq!(final_grid(&params, &events), evolve(&world, 300));
}

#[tokio::test]
async fn save_writes_a_snapshot_of_the_current_turn() {
    let world = patterns::random(32, 32, 5);
    let params = Params::new(50, 2, 32, 32);
    let store = MemoryStore::new();
    store.insert_grid(params.input_name(), &world);

    let mut session = conway::spawn(params, store.clone());
    let mut saved = None;
    let mut requested = false;
    while let Some(event) = session.events.recv().await {
        match event {
            Event::TurnComplete { completed_turns: 3 } if !requested => {
                requested = true;
                session.commands.send(Command::Save).await.unwrap();
            }
            Event::ImageOutputComplete { completed_turns, filename } if saved.is_none() => {
                saved = Some((completed_turns, filename));
            }
            _ => {}
        }
    }
    session.handle.await.unwrap().unwrap();

    let (completed_turns, filename) = saved.expect("no snapshot was taken");
    assert_eq!(filename, params.output_name(completed_turns));
    assert_eq!(saved_grid(&params, &store, completed_turns), evolve(&world, completed_turns));
    assert_eq!(saved_grid(&params, &store, 50), evolve(&world, 50));
}

#[tokio::test]
async fn quit_stops_early_and_closes_the_stream() {
    let world = patterns::find("Gosper Glider Gun").unwrap().centred(64, 64);
    let params = Params::new(1_000_000, 4, 64, 64);
    let store = MemoryStore::new();
    store.insert_grid(params.input_name(), &world);

    let mut session = conway::spawn(params, store.clone());
    let mut events = Vec::new();
    while let Some(event) = session.events.recv().await {
        if let Event::TurnComplete { completed_turns: 2 } = event {
            session.commands.send(Command::Quit).await.unwrap();
        }
        events.push(event);
    }
    session.handle.await.unwrap().unwrap();

    let Some(Event::StateChange { completed_turns, new_state: State::Quitting }) = events.last().cloned() else {
        panic!("last event was {:?}", events.last());
    };
    assert!(completed_turns < 1_000_000);
    assert_eq!(final_grid(&params, &events), evolve(&world, completed_turns));
    assert_eq!(saved_grid(&params, &store, completed_turns), evolve(&world, completed_turns));
    assert_eq!(
        events.iter().filter(|event| matches!(event, Event::StateChange { new_state: State::Quitting, .. })).count(),
        1
    );
    assert!(session.events.recv().await.is_none());
}

#[tokio::test]
async fn quit_while_paused_terminates() {
    let world = patterns::find("Gosper Glider Gun").unwrap().centred(64, 64);
    let params = Params::new(1_000_000, 8, 64, 64);
    let store = MemoryStore::new();
    store.insert_grid(params.input_name(), &world);

    let mut session = conway::spawn(params, store);
    let mut states = Vec::new();
    while let Some(event) = session.events.recv().await {
        match event {
            Event::TurnComplete { completed_turns: 1 } => {
                session.commands.send(Command::Pause).await.unwrap();
            }
            Event::StateChange { new_state, .. } => {
                states.push(new_state);
                if new_state == State::Paused {
                    session.commands.send(Command::Quit).await.unwrap();
                }
            }
            _ => {}
        }
    }
    session.handle.await.unwrap().unwrap();
    assert_eq!(states, vec![State::Paused, State::Quitting]);
}

#[tokio::test]
async fn closing_the_controls_while_paused_terminates() {
    let world = patterns::find("Gosper Glider Gun").unwrap().centred(64, 64);
    let params = Params::new(1_000_000, 2, 64, 64);
    let store = MemoryStore::new();
    store.insert_grid(params.input_name(), &world);

    let conway::Session { mut events, commands, handle } = conway::spawn(params, store);
    let mut commands = Some(commands);
    let mut states = Vec::new();
    while let Some(event) = events.recv().await {
        match event {
            Event::TurnComplete { completed_turns: 1 } => {
                if let Some(commands) = &commands {
                    commands.send(Command::Pause).await.unwrap();
                }
            }
            Event::StateChange { new_state, .. } => {
                states.push(new_state);
                // Nobody is left to resume the run.
                commands = None;
            }
            _ => {}
        }
    }
    handle.await.unwrap().unwrap();
    assert_eq!(states, vec![State::Paused, State::Quitting]);
}

#[tokio::test]
async fn ticker_reports_alive_cells() {
    let world = patterns::find("Blinker").unwrap().centred(16, 16);
    let params = Params::new(1_000_000, 2, 16, 16).with_ticker_period(Duration::from_millis(20));
    let store = MemoryStore::new();
    store.insert_grid(params.input_name(), &world);

    let mut session = conway::spawn(params, store);
    let mut reports = 0;
    while let Some(event) = session.events.recv().await {
        if let Event::AliveCellsCount { cells_count, .. } = event {
            assert_eq!(cells_count, 3);
            reports += 1;
            if reports == 2 {
                session.commands.send(Command::Quit).await.unwrap();
            }
        }
    }
    session.handle.await.unwrap().unwrap();
    assert!(reports >= 2);
}

#[tokio::test]
async fn invalid_params_are_rejected_before_any_event() {
    let world = Grid::new(8, 8);
    let (events, _, outcome) = run_to_end(Params::new(10, 9, 8, 8), &world).await;
    assert!(events.is_empty());
    assert!(matches!(outcome, Err(Error::InvalidParams { .. })));
}

#[tokio::test]
async fn missing_image_is_reported_before_any_event() {
    let params = Params::new(10, 2, 8, 8);
    let mut session = conway::spawn(params, MemoryStore::new());
    assert!(session.events.recv().await.is_none());
    assert!(matches!(session.handle.await.unwrap(), Err(Error::ImageNotFound(name)) if name == "8x8"));
}

/// Serves images from memory but refuses every write.
struct ReadOnly(MemoryStore);

impl ImageStore for ReadOnly {
    fn load(&mut self, name: &str, width: usize, height: usize) -> conway::Result<Vec<u8>> {
        self.0.load(name, width, height)
    }

    fn store(&mut self, name: &str, _: usize, _: usize, _: &[u8]) -> conway::Result<()> {
        Err(Error::Pgm { name: name.to_owned(), reason: "read-only".to_owned() })
    }
}

fn is_image_output(event: &Event) -> bool {
    matches!(event, Event::ImageOutputComplete { .. })
}

#[tokio::test]
async fn a_failed_final_write_is_not_reported_as_complete() {
    let world = patterns::find("Blinker").unwrap().centred(4, 4);
    let params = Params::new(0, 1, 4, 4);
    let store = MemoryStore::new();
    store.insert_grid(params.input_name(), &world);

    let mut session = conway::spawn(params, ReadOnly(store));
    let mut events = Vec::new();
    while let Some(event) = session.events.recv().await {
        events.push(event);
    }

    assert!(!events.iter().any(is_image_output), "{events:?}");
    assert_eq!(final_grid(&params, &events), world);
    assert_eq!(
        events.last(),
        Some(&Event::StateChange { completed_turns: 0, new_state: State::Quitting })
    );
    assert!(matches!(session.handle.await.unwrap(), Err(Error::Pgm { name, .. }) if name == "4x4x0"));
}

#[tokio::test]
async fn a_failed_save_ends_the_run() {
    let world = patterns::find("Blinker").unwrap().centred(16, 16);
    let params = Params::new(1_000_000, 2, 16, 16);
    let store = MemoryStore::new();
    store.insert_grid(params.input_name(), &world);

    let mut session = conway::spawn(params, ReadOnly(store));
    let mut events = Vec::new();
    while let Some(event) = session.events.recv().await {
        if let Event::TurnComplete { completed_turns: 2 } = event {
            session.commands.send(Command::Save).await.unwrap();
        }
        events.push(event);
    }

    assert!(!events.iter().any(is_image_output), "{:?}", events.last());
    let Some(Event::StateChange { completed_turns, new_state: State::Quitting }) = events.last().cloned() else {
        panic!("last event was {:?}", events.last());
    };
    assert!(completed_turns < 1_000_000);
    assert!(matches!(session.handle.await.unwrap(), Err(Error::Pgm { .. })));
}

/// Hands out fewer bytes than any grid needs.
struct Truncated;

impl ImageStore for Truncated {
    fn load(&mut self, _: &str, _: usize, _: usize) -> conway::Result<Vec<u8>> {
        Ok(vec![0; 3])
    }

    fn store(&mut self, _: &str, _: usize, _: usize, _: &[u8]) -> conway::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn a_short_image_is_reported_before_any_event() {
    let params = Params::new(10, 2, 8, 8);
    let mut session = conway::spawn(params, Truncated);
    assert!(session.events.recv().await.is_none());
    assert!(matches!(session.handle.await.unwrap(), Err(Error::ImageSize { .. })));
}
