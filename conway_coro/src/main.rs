// main.rs - Parallel Game of Life with a live viewer
// Starts the engine, forwards key presses as commands and shows its events.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use conway::{patterns, ImageStore, Params, PgmStore, SeededStore};
use tracing_subscriber::EnvFilter;

mod headless;  // Event log on the terminal
mod ui;        // egui window

#[derive(Parser, Debug)]
#[command(name = "conway_coro", about = "Parallel Game of Life. Keys: p pause/resume, s save, q quit")]
struct Args {
    /// Number of turns to play
    #[arg(short, long, default_value_t = 10_000_000)]
    turns: usize,

    /// Number of workers, one band of rows each
    #[arg(short = 'n', long, default_value_t = 8)]
    threads: usize,

    #[arg(long, default_value_t = 512)]
    width: usize,

    #[arg(long, default_value_t = 512)]
    height: usize,

    /// Milliseconds between alive cell reports
    #[arg(long, default_value_t = 2000)]
    ticker_ms: u64,

    /// Directory holding `{width}x{height}.pgm`
    #[arg(long, default_value = "images")]
    images: PathBuf,

    /// Directory snapshots are written to
    #[arg(long, default_value = "out")]
    out: PathBuf,

    /// Start from a built-in pattern (or `random`) instead of an image
    #[arg(long)]
    pattern: Option<String>,

    /// Seed for `--pattern random`
    #[arg(long, default_value_t = 0)]
    seed: u32,

    /// Log events instead of opening a window
    #[arg(long)]
    headless: bool,
}

impl Args {
    fn params(&self) -> Params {
        Params::new(self.turns, self.threads, self.width, self.height)
            .with_ticker_period(Duration::from_millis(self.ticker_ms))
    }

    fn store(&self, params: &Params) -> Result<Box<dyn ImageStore>> {
        let disk = PgmStore::new(&self.images, &self.out);
        let Some(name) = &self.pattern else {
            return Ok(Box::new(disk));
        };

        let seed = if name.eq_ignore_ascii_case("random") {
            patterns::random(self.width, self.height, self.seed)
        } else {
            match patterns::find(name) {
                Some(pattern) => pattern.centred(self.width, self.height),
                None => {
                    let known: Vec<&str> = patterns::PATTERNS.iter().map(|p| p.name).collect();
                    bail!("unknown pattern {name:?}, expected random or one of {known:?}");
                }
            }
        };
        Ok(Box::new(SeededStore::new(params.input_name(), seed, disk)))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let params = args.params();
    params.validate()?;
    let store = args.store(&params)?;

    let runtime = tokio::runtime::Runtime::new()?;
    if args.headless {
        runtime.block_on(headless::run(params, store))
    } else {
        ui::run(runtime, params, store)
    }
}
