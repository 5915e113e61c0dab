#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic pacer that drives the periodic upward grid scroll.

use std::time::Duration;

use spire_core::{Command, Event};

/// Configuration parameters required to construct the scrolling system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    scroll_interval: Duration,
    rows_per_scroll: u32,
}

impl Config {
    /// Creates a new configuration using the provided cadence and step size.
    #[must_use]
    pub const fn new(scroll_interval: Duration, rows_per_scroll: u32) -> Self {
        Self {
            scroll_interval,
            rows_per_scroll,
        }
    }
}

/// Pure system that emits a scroll command each time its cadence elapses.
#[derive(Debug)]
pub struct Scrolling {
    scroll_interval: Duration,
    rows_per_scroll: u32,
    accumulator: Duration,
}

impl Scrolling {
    /// Creates a new scrolling system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            scroll_interval: config.scroll_interval,
            rows_per_scroll: config.rows_per_scroll,
            accumulator: Duration::ZERO,
        }
    }

    /// Consumes events to emit scroll commands on cadence.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        if self.scroll_interval.is_zero() || self.rows_per_scroll == 0 {
            return;
        }

        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                self.accumulator = self.accumulator.saturating_add(*dt);
            }
        }

        while self.accumulator >= self.scroll_interval {
            self.accumulator -= self.scroll_interval;
            out.push(Command::ScrollGrid {
                rows: self.rows_per_scroll,
            });
        }
    }
}
