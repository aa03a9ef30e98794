// params.rs - Run configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// How often the ticker reports the alive cell count unless told otherwise.
pub const DEFAULT_TICKER_PERIOD: Duration = Duration::from_secs(2);

/// Details of how to run the Game of Life and which image to load.
///
/// Immutable for the life of a run. `threads` is also the number of bands
/// the grid is cut into each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    pub turns: usize,
    pub threads: usize,
    pub image_width: usize,
    pub image_height: usize,
    pub ticker_period: Duration,
}

impl Params {
    pub fn new(turns: usize, threads: usize, image_width: usize, image_height: usize) -> Self {
        Self {
            turns,
            threads,
            image_width,
            image_height,
            ticker_period: DEFAULT_TICKER_PERIOD,
        }
    }

    pub fn with_ticker_period(mut self, period: Duration) -> Self {
        self.ticker_period = period;
        self
    }

    /// Rejects configurations that cannot be partitioned or reported on.
    ///
    /// Zero turns is valid: the run drains straight away with the initial
    /// world. Thread counts that do not divide the height are valid too, the
    /// last band takes the remainder rows.
    pub fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(Error::invalid(format!(
                "image dimensions must be positive, got {}x{}",
                self.image_width, self.image_height
            )));
        }
        if self.threads == 0 {
            return Err(Error::invalid("at least one thread is required"));
        }
        if self.threads > self.image_height {
            return Err(Error::invalid(format!(
                "{} threads cannot share {} rows",
                self.threads, self.image_height
            )));
        }
        if self.ticker_period.is_zero() {
            return Err(Error::invalid("ticker period must be positive"));
        }
        Ok(())
    }

    /// Name of the image the initial world is loaded from.
    pub fn input_name(&self) -> String {
        format!("{}x{}", self.image_width, self.image_height)
    }

    /// Name of a snapshot taken after `completed_turns` turns.
    pub fn output_name(&self, completed_turns: usize) -> String {
        format!("{}x{}x{}", self.image_width, self.image_height, completed_turns)
    }
}
