#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system that emits invader spawn commands.

use std::time::Duration;

use spire_core::{Archetype, CellCoord, Command, Event, Faction};

const RNG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const RNG_INCREMENT: u64 = 1;

/// Invader mix cycled through as waves spawn.
const WAVE_ARCHETYPES: [Archetype; 4] = [
    Archetype::Golem,
    Archetype::Slime,
    Archetype::Ghost,
    Archetype::Queen,
];

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    spawn_interval: Duration,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided spawn cadence and seed.
    #[must_use]
    pub const fn new(spawn_interval: Duration, rng_seed: u64) -> Self {
        Self {
            spawn_interval,
            rng_seed,
        }
    }
}

/// Pure system that deterministically emits invader spawn commands.
#[derive(Debug)]
pub struct Spawning {
    spawn_interval: Duration,
    accumulator: Duration,
    rng_state: u64,
    archetype_index: usize,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            spawn_interval: config.spawn_interval,
            accumulator: Duration::ZERO,
            rng_state: config.rng_seed,
            archetype_index: 0,
        }
    }

    /// Consumes events and entrance cells to emit spawn commands.
    pub fn handle(&mut self, events: &[Event], entrances: &[CellCoord], out: &mut Vec<Command>) {
        if self.spawn_interval.is_zero() || entrances.is_empty() {
            return;
        }

        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }

        if accumulated.is_zero() {
            return;
        }

        self.accumulator = self.accumulator.saturating_add(accumulated);
        let spawn_attempts = self.resolve_spawn_attempts();

        for _ in 0..spawn_attempts {
            let cell = self.select_entrance(entrances);
            let archetype = self.next_archetype();
            out.push(Command::SpawnAgent {
                archetype,
                faction: Faction::Enemy,
                cell,
            });
        }
    }

    fn resolve_spawn_attempts(&mut self) -> usize {
        if self.spawn_interval.is_zero() {
            return 0;
        }

        let mut attempts = 0;
        while self.accumulator >= self.spawn_interval {
            self.accumulator -= self.spawn_interval;
            attempts += 1;
        }
        attempts
    }

    fn select_entrance(&mut self, entrances: &[CellCoord]) -> CellCoord {
        debug_assert!(!entrances.is_empty(), "select_entrance requires entrances");
        let value = self.advance_rng();
        let index = (value % entrances.len() as u64) as usize;
        entrances[index]
    }

    fn advance_rng(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(RNG_MULTIPLIER)
            .wrapping_add(RNG_INCREMENT);
        self.rng_state
    }

    fn next_archetype(&mut self) -> Archetype {
        let archetype = WAVE_ARCHETYPES[self.archetype_index % WAVE_ARCHETYPES.len()];
        self.archetype_index = (self.archetype_index + 1) % WAVE_ARCHETYPES.len();
        archetype
    }
}
