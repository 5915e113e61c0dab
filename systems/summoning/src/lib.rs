#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure summoning system that turns completed resource pairs into creatures.
//!
//! When the world announces a ready table, the pair is folded through the
//! fixed resource lookup and a spawn command is emitted at the first open
//! cell adjacent to the table. A table with no open neighbor keeps its
//! summon pending and retries on later calls until ground frees up.

use spire_core::{
    Archetype, CellCoord, Command, Direction, Event, Faction, OccupancyView, PlayerSnapshot,
    TableId, TableView, TerrainView,
};

/// Pure system that reacts to ready tables by emitting spawn commands.
#[derive(Debug, Default)]
pub struct Summoning {
    pending: Vec<PendingSummon>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingSummon {
    table: TableId,
    archetype: Archetype,
}

impl Summoning {
    /// Creates a new summoning system with no queued summons.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of summons still waiting for an open cell.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Consumes world events and immutable views to emit spawn commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        tables: &TableView,
        terrain: &TerrainView<'_>,
        occupancy: OccupancyView<'_>,
        player: Option<PlayerSnapshot>,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            if let Event::TableReady {
                table,
                first,
                second,
            } = event
            {
                self.pending.push(PendingSummon {
                    table: *table,
                    archetype: Archetype::from_resource_pair(*first, *second),
                });
            }
        }

        if self.pending.is_empty() {
            return;
        }

        let player_cell = player.map(|snapshot| snapshot.cell);
        self.pending.retain(|summon| {
            // A table lost to scrolling takes its unfinished summon with it.
            let Some(snapshot) = tables.iter().find(|table| table.id == summon.table) else {
                return false;
            };

            match open_neighbor(snapshot.cell, terrain, occupancy, player_cell) {
                Some(cell) => {
                    out.push(Command::SpawnAgent {
                        archetype: summon.archetype,
                        faction: Faction::Summon,
                        cell,
                    });
                    false
                }
                None => true,
            }
        });
    }
}

/// First open, unoccupied cardinal neighbor in fixed probe order.
fn open_neighbor(
    cell: CellCoord,
    terrain: &TerrainView<'_>,
    occupancy: OccupancyView<'_>,
    player_cell: Option<CellCoord>,
) -> Option<CellCoord> {
    Direction::ALL
        .iter()
        .filter_map(|direction| cell.stepped(*direction))
        .find(|candidate| {
            terrain.is_open(*candidate)
                && occupancy.is_free(*candidate)
                && player_cell != Some(*candidate)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spire_core::{AgentId, BlockingKind, ResourceKind, TableSnapshot};

    fn table_view(cell: CellCoord) -> TableView {
        TableView::from_snapshots(vec![TableSnapshot {
            id: TableId::new(0),
            cell,
            held: Vec::new(),
        }])
    }

    fn ready_event() -> Event {
        Event::TableReady {
            table: TableId::new(0),
            first: ResourceKind::Gold,
            second: ResourceKind::Gold,
        }
    }

    #[test]
    fn ready_pair_spawns_adjacent_to_the_table() {
        let mut summoning = Summoning::new();
        let terrain = TerrainView::from_owned(vec![BlockingKind::None; 9], 3, 3);
        let occupancy_cells: Vec<Option<AgentId>> = vec![None; 9];
        let occupancy = OccupancyView::new(&occupancy_cells, 3, 3);
        let mut out = Vec::new();

        summoning.handle(
            &[ready_event()],
            &table_view(CellCoord::new(1, 1)),
            &terrain,
            occupancy,
            None,
            &mut out,
        );

        // Gold + gold resolves to the third outcome, and the probe order
        // lands on the northern neighbor first.
        assert_eq!(
            out,
            vec![Command::SpawnAgent {
                archetype: Archetype::Golem,
                faction: Faction::Summon,
                cell: CellCoord::new(1, 0),
            }]
        );
        assert_eq!(summoning.pending_count(), 0);
    }

    #[test]
    fn sealed_tables_defer_until_ground_frees_up() {
        let mut summoning = Summoning::new();
        // Corner table at (0,0) with both neighbors occupied.
        let mut occupancy_cells: Vec<Option<AgentId>> = vec![None; 9];
        occupancy_cells[1] = Some(AgentId::new(7));
        occupancy_cells[3] = Some(AgentId::new(8));
        let terrain = TerrainView::from_owned(vec![BlockingKind::None; 9], 3, 3);
        let mut out = Vec::new();

        {
            let occupancy = OccupancyView::new(&occupancy_cells, 3, 3);
            summoning.handle(
                &[ready_event()],
                &table_view(CellCoord::new(0, 0)),
                &terrain,
                occupancy,
                None,
                &mut out,
            );
        }
        assert!(out.is_empty());
        assert_eq!(summoning.pending_count(), 1);

        // One blocker leaves; the retry succeeds without a fresh event.
        occupancy_cells[1] = None;
        let occupancy = OccupancyView::new(&occupancy_cells, 3, 3);
        summoning.handle(
            &[],
            &table_view(CellCoord::new(0, 0)),
            &terrain,
            occupancy,
            None,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(summoning.pending_count(), 0);
    }

    #[test]
    fn summons_for_lost_tables_are_dropped() {
        let mut summoning = Summoning::new();
        let terrain = TerrainView::from_owned(vec![BlockingKind::None; 9], 3, 3);
        let occupancy_cells: Vec<Option<AgentId>> = vec![None; 9];
        let occupancy = OccupancyView::new(&occupancy_cells, 3, 3);
        let mut out = Vec::new();

        summoning.handle(
            &[ready_event()],
            &TableView::default(),
            &terrain,
            occupancy,
            None,
            &mut out,
        );

        assert!(out.is_empty());
        assert_eq!(summoning.pending_count(), 0);
    }

    #[test]
    fn spawn_cell_avoids_the_player() {
        let mut summoning = Summoning::new();
        let terrain = TerrainView::from_owned(vec![BlockingKind::None; 9], 3, 3);
        let occupancy_cells: Vec<Option<AgentId>> = vec![None; 9];
        let occupancy = OccupancyView::new(&occupancy_cells, 3, 3);
        let player = PlayerSnapshot {
            cell: CellCoord::new(1, 0),
            health: spire_core::Health::new(20),
        };
        let mut out = Vec::new();

        summoning.handle(
            &[ready_event()],
            &table_view(CellCoord::new(1, 1)),
            &terrain,
            occupancy,
            Some(player),
            &mut out,
        );

        // The probe skips the player's cell and settles on the next one.
        assert_eq!(
            out,
            vec![Command::SpawnAgent {
                archetype: Archetype::Golem,
                faction: Faction::Summon,
                cell: CellCoord::new(2, 1),
            }]
        );
    }
}
