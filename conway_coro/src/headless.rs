// headless.rs - Terminal front end: keys from stdin, events to the log

use std::io::BufRead;

use anyhow::Result;
use conway::{Command, Event, ImageStore, Params};
use tokio::sync::mpsc;
use tracing::{info, trace};

pub async fn run(params: Params, store: Box<dyn ImageStore>) -> Result<()> {
    let mut session = conway::spawn(params, store);
    forward_stdin(session.commands.clone());

    while let Some(event) = session.events.recv().await {
        match event {
            Event::CellFlipped { .. } | Event::TurnComplete { .. } => trace!("{event}"),
            event => info!("{event}"),
        }
    }

    session.handle.await??;
    Ok(())
}

/// Each line typed is read as a sequence of single-key commands. Runs on its
/// own thread since it blocks on stdin until the terminal closes.
fn forward_stdin(commands: mpsc::Sender<Command>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            for command in line.chars().filter_map(Command::from_key) {
                if commands.blocking_send(command).is_err() {
                    return;
                }
            }
        }
    });
}
