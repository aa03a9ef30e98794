// ui.rs - egui viewer
// Mirrors the engine's grid from CellFlipped events and sends key presses back as commands.

use anyhow::{anyhow, Result};
use conway::{Command, Event, Grid, ImageStore, Params, Session, State};
use eframe::egui;
use egui::{Color32, Key, Rect, Vec2};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info};

/// Upper bound on events applied per frame so the window stays responsive.
const EVENTS_PER_FRAME: usize = 250_000;

pub fn run(runtime: Runtime, params: Params, store: Box<dyn ImageStore>) -> Result<()> {
    let session = {
        let _guard = runtime.enter();
        conway::spawn(params, store)
    };
    let viewer = Viewer::new(runtime, params, session);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 950.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Parallel Conway's Game of Life",
        options,
        Box::new(|_cc| Box::new(viewer)),
    )
    .map_err(|err| anyhow!("viewer failed: {err}"))
}

struct Viewer {
    runtime: Runtime,
    session: Session,
    finished: bool,
    outcome: Option<String>,

    grid: Grid,
    completed_turns: usize,
    reported_alive: Option<usize>,
    state: State,
    last_image: Option<String>,

    live_color: Color32,
    dead_color: Color32,
}

impl Viewer {
    fn new(runtime: Runtime, params: Params, session: Session) -> Self {
        Self {
            runtime,
            session,
            finished: false,
            outcome: None,
            grid: Grid::new(params.image_width, params.image_height),
            completed_turns: 0,
            reported_alive: None,
            state: State::Executing,
            last_image: None,
            live_color: Color32::from_rgb(0, 200, 0),
            dead_color: Color32::from_rgb(40, 40, 40),
        }
    }

    fn drain_events(&mut self) {
        for _ in 0..EVENTS_PER_FRAME {
            match self.session.events.try_recv() {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.finish();
                    return;
                }
            }
        }
    }

    fn apply(&mut self, event: Event) {
        self.completed_turns = self.completed_turns.max(event.completed_turns());
        match event {
            Event::CellFlipped { cell, .. } => self.grid.toggle(cell.row, cell.col),
            Event::TurnComplete { .. } => {}
            Event::FinalTurnComplete { completed_turns, alive } => {
                info!(completed_turns, alive = alive.len(), "final turn complete");
            }
            Event::AliveCellsCount { cells_count, .. } => self.reported_alive = Some(cells_count),
            Event::ImageOutputComplete { filename, .. } => self.last_image = Some(filename),
            Event::StateChange { new_state, .. } => self.state = new_state,
        }
    }

    /// The stream is closed; collect how the run ended.
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let outcome = match self.runtime.block_on(&mut self.session.handle) {
            Ok(Ok(())) => "finished".to_owned(),
            Ok(Err(err)) => format!("failed: {err}"),
            Err(err) => format!("crashed: {err}"),
        };
        if outcome == "finished" {
            info!("run finished");
        } else {
            error!("run {outcome}");
        }
        self.outcome = Some(outcome);
    }

    fn send(&self, command: Command) {
        if let Err(err) = self.session.commands.try_send(command) {
            debug!(?command, %err, "command dropped");
        }
    }

    fn draw_grid(&self, ui: &mut egui::Ui) {
        let available = ui.available_size();
        let (width, height) = (self.grid.width(), self.grid.height());
        let box_size = (available.x / width as f32).min(available.y / height as f32).max(1.0);
        let total_size = Vec2::new(box_size * width as f32, box_size * height as f32);

        let (response, painter) = ui.allocate_painter(total_size, egui::Sense::hover());
        let start_pos = response.rect.min;
        painter.rect_filled(response.rect, 0.0, self.dead_color);

        // Only alive cells are drawn over the background
        for cell in self.grid.alive_cells() {
            let x = start_pos.x + cell.col as f32 * box_size;
            let y = start_pos.y + cell.row as f32 * box_size;
            let rect = Rect::from_min_size(egui::pos2(x, y), Vec2::splat(box_size));
            painter.rect_filled(rect, 0.0, self.live_color);
        }
    }
}

impl eframe::App for Viewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        let pressed: Vec<Command> = ctx.input(|input| {
            [(Key::P, Command::Pause), (Key::S, Command::Save), (Key::Q, Command::Quit)]
                .into_iter()
                .filter(|(key, _)| input.key_pressed(*key))
                .map(|(_, command)| command)
                .collect()
        });
        for command in pressed {
            self.send(command);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Parallel Conway's Game of Life");

            // Controls
            ui.horizontal(|ui| {
                let running = !self.finished;
                let button_text = if self.state == State::Paused { "▶ Resume" } else { "⏸ Pause" };
                if ui.add_enabled(running, egui::Button::new(button_text)).clicked() {
                    self.send(Command::Pause);
                }
                if ui.add_enabled(running, egui::Button::new("💾 Save")).clicked() {
                    self.send(Command::Save);
                }
                if ui.add_enabled(running, egui::Button::new("⏹ Quit")).clicked() {
                    self.send(Command::Quit);
                }

                ui.separator();
                ui.label(format!("Turn: {}", self.completed_turns));
                ui.separator();
                ui.label(match &self.outcome {
                    Some(outcome) => outcome.clone(),
                    None => self.state.to_string(),
                });
            });

            ui.separator();

            ui.horizontal(|ui| {
                ui.label("Live:");
                ui.color_edit_button_srgba(&mut self.live_color);
                ui.label("Dead:");
                ui.color_edit_button_srgba(&mut self.dead_color);

                ui.separator();
                if let Some(filename) = &self.last_image {
                    ui.label(format!("Last image: {filename}"));
                }
            });

            ui.separator();

            // Statistics
            let live_cells = self.grid.alive_count();
            let total = (self.grid.width() * self.grid.height()) as f32;
            ui.horizontal(|ui| {
                ui.label(format!("Live cells: {live_cells}"));
                if let Some(reported) = self.reported_alive {
                    ui.label(format!("Last report: {reported}"));
                }
                ui.label(format!("Population: {:.1}%", live_cells as f32 / total * 100.0));
            });

            ui.separator();
            self.draw_grid(ui);
        });

        // Keep polling the event stream while the run is alive
        if !self.finished {
            ctx.request_repaint();
        }
    }
}
