#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic analytics system that tallies the event stream.
//!
//! Adapters feed every event batch through [`Analytics::record`] and read
//! aggregate totals back whenever they need to report. This is the engine's
//! whole observability surface; there is no logging framework underneath.

use spire_core::Event;

/// Aggregate counters accumulated over a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimulationReport {
    /// Number of `TimeAdvanced` events observed.
    pub ticks: u64,
    /// Total rows the grid has scrolled upward.
    pub rows_scrolled: u64,
    /// Cells cleared by mining.
    pub cells_mined: u64,
    /// Resource pickups that appeared on the grid.
    pub pickups_spawned: u64,
    /// Resource pickups collected by creatures.
    pub pickups_collected: u64,
    /// Resources delivered into table reservoirs.
    pub resources_delivered: u64,
    /// Tables that completed a resource pair.
    pub pairs_completed: u64,
    /// Creatures that entered the world.
    pub agents_spawned: u64,
    /// Creatures whose health reached zero.
    pub agents_died: u64,
    /// Strikes that landed on creatures or the player.
    pub strikes_landed: u64,
    /// Creatures returned through an entrance after a scroll.
    pub agents_displaced: u64,
}

/// Pure system that folds world events into aggregate counters.
#[derive(Debug, Default)]
pub struct Analytics {
    report: SimulationReport,
}

impl Analytics {
    /// Creates a new analytics system with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a batch of world events into the running totals.
    pub fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::TimeAdvanced { .. } => self.report.ticks += 1,
                Event::GridScrolled { rows, .. } => {
                    self.report.rows_scrolled += u64::from(*rows);
                }
                Event::CellMined { .. } => self.report.cells_mined += 1,
                Event::PickupSpawned { .. } => self.report.pickups_spawned += 1,
                Event::PickupCollected { .. } => self.report.pickups_collected += 1,
                Event::ResourceDelivered { .. } => self.report.resources_delivered += 1,
                Event::TableReady { .. } => self.report.pairs_completed += 1,
                Event::AgentSpawned { .. } => self.report.agents_spawned += 1,
                Event::AgentDied { .. } => self.report.agents_died += 1,
                Event::AgentStruck { .. } | Event::PlayerStruck { .. } => {
                    self.report.strikes_landed += 1;
                }
                Event::AgentDisplaced { .. } => self.report.agents_displaced += 1,
                _ => {}
            }
        }
    }

    /// Current aggregate totals.
    #[must_use]
    pub fn report(&self) -> SimulationReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spire_core::{
        AgentId, Archetype, CellCoord, Faction, Health, ResourceKind, TableId, WorldPoint,
    };
    use std::time::Duration;

    #[test]
    fn counters_accumulate_across_batches() {
        let mut analytics = Analytics::new();

        analytics.record(&[
            Event::TimeAdvanced {
                dt: Duration::from_millis(100),
            },
            Event::CellMined {
                cell: CellCoord::new(1, 1),
                resource: Some(ResourceKind::Gold),
            },
            Event::PickupSpawned {
                pickup: spire_core::PickupId::new(0),
                kind: ResourceKind::Gold,
                cell: CellCoord::new(1, 1),
            },
        ]);
        analytics.record(&[
            Event::GridScrolled {
                move_by: WorldPoint::new(0.0, 2.0, 0.0),
                duration: Duration::from_millis(600),
                rows: 2,
            },
            Event::AgentSpawned {
                agent: AgentId::new(0),
                archetype: Archetype::Golem,
                faction: Faction::Enemy,
                cell: CellCoord::new(0, 0),
            },
            Event::AgentStruck {
                attacker: AgentId::new(0),
                target: AgentId::new(1),
                damage: 4,
                remaining: Health::new(2),
            },
            Event::TableReady {
                table: TableId::new(0),
                first: ResourceKind::Gold,
                second: ResourceKind::Gold,
            },
        ]);

        let report = analytics.report();
        assert_eq!(report.ticks, 1);
        assert_eq!(report.cells_mined, 1);
        assert_eq!(report.pickups_spawned, 1);
        assert_eq!(report.rows_scrolled, 2);
        assert_eq!(report.agents_spawned, 1);
        assert_eq!(report.strikes_landed, 1);
        assert_eq!(report.pairs_completed, 1);
    }

    #[test]
    fn unrelated_events_leave_counters_untouched() {
        let mut analytics = Analytics::new();
        analytics.record(&[Event::PlayerMoved {
            from: CellCoord::new(0, 0),
            to: CellCoord::new(1, 0),
        }]);
        assert_eq!(analytics.report(), SimulationReport::default());
    }
}
