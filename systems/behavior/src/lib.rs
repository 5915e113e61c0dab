#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-archetype creature state machines.
//!
//! The behavior system is a pure planner: each tick it reads the world's
//! immutable views and answers with at most one action command per creature.
//! The world remains the sole authority on whether the action is legal; an
//! action that has become stale by the time it is applied simply fizzles.
//!
//! Path search failures are never fatal here. A blocked or out-of-bounds
//! endpoint downgrades to "no target this tick" and the creature falls back
//! to its roaming policy.

use spire_core::{
    AgentId, AgentSnapshot, AgentState, AgentView, ArchetypeProfile, BlockingKind, CellCoord,
    CombatStyle, Command, Direction, Event, Faction, PathMode, PickupView, PlayerSnapshot,
    OccupancyView, ResourceKind, RoamStyle, TableView, TargetRef, TerrainView,
};
use spire_system_pathfinding as pathfinding;

const RNG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const RNG_INCREMENT: u64 = 1;

/// Configuration parameters required to construct the behavior system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided roaming seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Pure system that drives every creature's state machine.
#[derive(Debug)]
pub struct Behavior {
    rng_state: u64,
    /// Highest faction-priority rank each creature has sighted during its
    /// current engagement; lower-ranked sightings never overwrite it.
    priorities: Vec<(AgentId, u8)>,
}

impl Behavior {
    /// Creates a new behavior system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng_state: config.rng_seed,
            priorities: Vec::new(),
        }
    }

    /// Consumes world events and immutable views to emit action commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        agents: &AgentView,
        pickups: &PickupView,
        tables: &TableView,
        player: Option<PlayerSnapshot>,
        terrain: &TerrainView<'_>,
        occupancy: OccupancyView<'_>,
        entrances: &[CellCoord],
        seams: &[CellCoord],
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::AgentDied { agent } | Event::AgentRemoved { agent } => {
                    self.forget(*agent);
                }
                _ => {}
            }
        }

        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return;
        }

        for snapshot in agents.iter() {
            if matches!(
                snapshot.state,
                AgentState::Dead | AgentState::ReturningToGrid
            ) {
                continue;
            }
            self.drive(
                snapshot, agents, pickups, tables, player, terrain, occupancy, entrances, seams,
                out,
            );
        }
    }

    fn drive(
        &mut self,
        agent: &AgentSnapshot,
        agents: &AgentView,
        pickups: &PickupView,
        tables: &TableView,
        player: Option<PlayerSnapshot>,
        terrain: &TerrainView<'_>,
        occupancy: OccupancyView<'_>,
        entrances: &[CellCoord],
        seams: &[CellCoord],
        out: &mut Vec<Command>,
    ) {
        let profile = agent.archetype.profile();

        if let Some(target) = agent.engaged {
            match resolve_target_cell(target, agents, player) {
                None => {
                    self.forget(agent.id);
                    out.push(Command::Disengage { agent: agent.id });
                    return;
                }
                Some(cell) => {
                    if in_attack_range(agent, &profile, cell, terrain) {
                        if agent.ready_to_attack {
                            out.push(Command::Strike {
                                attacker: agent.id,
                                target,
                            });
                        }
                        return;
                    }
                    // Contact was lost; close the distance or give up.
                    if agent.path_head.is_none() {
                        match plan_path(terrain, agent.cell, cell, profile.traversal) {
                            Some(path) => {
                                out.push(Command::SetAgentPath {
                                    agent: agent.id,
                                    path,
                                });
                            }
                            None => {
                                self.forget(agent.id);
                                out.push(Command::Disengage { agent: agent.id });
                            }
                        }
                        return;
                    }
                }
            }
        }

        // Sight runs ahead of path-following so a pursuit flips into combat
        // the moment the quarry comes into reach, instead of marching into
        // its cell.
        if agent.engaged.is_none() && profile.combat != CombatStyle::Pacifist {
            if let Some((target, cell, faction)) =
                self.select_target(agent, &profile, agents, player)
            {
                if in_attack_range(agent, &profile, cell, terrain) {
                    self.remember(agent.id, faction.priority());
                    out.push(Command::EngageTarget {
                        agent: agent.id,
                        target,
                    });
                    return;
                }
                if agent.path_head.is_none() {
                    if let Some(path) = plan_path(terrain, agent.cell, cell, profile.traversal) {
                        self.remember(agent.id, faction.priority());
                        out.push(Command::SetAgentPath {
                            agent: agent.id,
                            path,
                        });
                        return;
                    }
                }
            }
        }

        if let Some(next) = agent.path_head {
            self.follow_path(agent, &profile, next, terrain, occupancy, out);
            return;
        }

        // Idle wall-breakers dig for buried resources instead of patrolling.
        if profile.combat == CombatStyle::Breacher {
            let seam = seams
                .iter()
                .copied()
                .min_by_key(|cell| (agent.cell.manhattan_distance(*cell), cell.column(), cell.row()));
            if let Some(seam) = seam {
                if let Some(path) = plan_path(terrain, agent.cell, seam, PathMode::Breach) {
                    out.push(Command::SetAgentPath {
                        agent: agent.id,
                        path,
                    });
                    return;
                }
            }
        }

        if !agent.ready_to_move {
            return;
        }

        match profile.roam {
            RoamStyle::RandomWalk => self.random_step(agent, terrain, occupancy, out),
            RoamStyle::WallHug => {
                match wall_hug_probe(agent, &profile, terrain, occupancy) {
                    Some(direction) if direction == agent.facing => {
                        out.push(Command::StepAgent {
                            agent: agent.id,
                            direction,
                        });
                    }
                    Some(direction) => out.push(Command::FaceAgent {
                        agent: agent.id,
                        direction,
                    }),
                    None => {}
                }
            }
            RoamStyle::Ferry => self.ferry(
                agent, &profile, agents, pickups, tables, terrain, occupancy, entrances, out,
            ),
        }
    }

    fn follow_path(
        &mut self,
        agent: &AgentSnapshot,
        profile: &ArchetypeProfile,
        next: CellCoord,
        terrain: &TerrainView<'_>,
        occupancy: OccupancyView<'_>,
        out: &mut Vec<Command>,
    ) {
        if !agent.ready_to_move {
            return;
        }

        let Some(direction) = Direction::between(agent.cell, next) else {
            // The queue no longer lines up with where the creature stands.
            out.push(Command::SetAgentPath {
                agent: agent.id,
                path: Vec::new(),
            });
            return;
        };

        if terrain.blocking(next) == Some(BlockingKind::Full) {
            if profile.combat == CombatStyle::Breacher {
                out.push(Command::MineCell { cell: next });
            } else if profile.traversal == PathMode::Phasing {
                out.push(Command::StepAgent {
                    agent: agent.id,
                    direction,
                });
            } else {
                // A wall grew across the route since planning; drop it.
                out.push(Command::SetAgentPath {
                    agent: agent.id,
                    path: Vec::new(),
                });
            }
            return;
        }

        if !occupancy.is_free(next) {
            return;
        }

        out.push(Command::StepAgent {
            agent: agent.id,
            direction,
        });
    }

    /// Picks the best visible hostile: highest faction priority first, then
    /// nearest, then lowest id. Candidates ranked below the remembered
    /// engagement priority are ignored entirely.
    fn select_target(
        &self,
        agent: &AgentSnapshot,
        profile: &ArchetypeProfile,
        agents: &AgentView,
        player: Option<PlayerSnapshot>,
    ) -> Option<(TargetRef, CellCoord, Faction)> {
        let hostile = agent.faction.hostile_mask();
        let floor = self.remembered(agent.id).unwrap_or(0);

        let mut best: Option<(TargetRef, CellCoord, Faction, u32)> = None;
        let mut consider = |target: TargetRef, cell: CellCoord, faction: Faction| {
            if !hostile.contains(faction.mask()) || faction.priority() < floor {
                return;
            }
            if !in_sight_cone(agent, profile, cell) {
                return;
            }
            let distance = agent.cell.manhattan_distance(cell);
            let better = match &best {
                None => true,
                Some((_, _, current, current_distance)) => {
                    (faction.priority(), std::cmp::Reverse(distance))
                        > (current.priority(), std::cmp::Reverse(*current_distance))
                }
            };
            if better {
                best = Some((target, cell, faction, distance));
            }
        };

        for candidate in agents.iter() {
            if candidate.id == agent.id || candidate.state == AgentState::Dead {
                continue;
            }
            consider(
                TargetRef::Agent(candidate.id),
                candidate.cell,
                candidate.faction,
            );
        }
        if let Some(player) = player {
            consider(TargetRef::Player, player.cell, Faction::Player);
        }

        best.map(|(target, cell, faction, _)| (target, cell, faction))
    }

    fn random_step(
        &mut self,
        agent: &AgentSnapshot,
        terrain: &TerrainView<'_>,
        occupancy: OccupancyView<'_>,
        out: &mut Vec<Command>,
    ) {
        let profile = agent.archetype.profile();
        let mut legal: Vec<Direction> = Vec::with_capacity(4);
        for direction in Direction::ALL {
            let Some(cell) = agent.cell.stepped(direction) else {
                continue;
            };
            let walkable = match profile.traversal {
                PathMode::Phasing => terrain.contains(cell),
                _ => terrain.is_open(cell),
            };
            if walkable && occupancy.is_free(cell) {
                legal.push(direction);
            }
        }

        if legal.is_empty() {
            return;
        }
        let pick = (self.advance_rng() % legal.len() as u64) as usize;
        out.push(Command::StepAgent {
            agent: agent.id,
            direction: legal[pick],
        });
    }

    fn ferry(
        &mut self,
        agent: &AgentSnapshot,
        profile: &ArchetypeProfile,
        agents: &AgentView,
        pickups: &PickupView,
        tables: &TableView,
        terrain: &TerrainView<'_>,
        occupancy: OccupancyView<'_>,
        entrances: &[CellCoord],
        out: &mut Vec<Command>,
    ) {
        // Threat check first: a sighted invader sends the hauler to the
        // surface regardless of what it carries.
        let threatened = agents.iter().any(|other| {
            other.state != AgentState::Dead
                && agent.faction.hostile_mask().contains(other.faction.mask())
                && agent.cell.manhattan_distance(other.cell) <= profile.sight_range
        });
        if threatened {
            let refuge = entrances
                .iter()
                .copied()
                .min_by_key(|cell| (agent.cell.manhattan_distance(*cell), cell.column()));
            if let Some(refuge) = refuge {
                if refuge != agent.cell {
                    if let Some(path) = plan_path(terrain, agent.cell, refuge, profile.traversal) {
                        out.push(Command::SetAgentPath {
                            agent: agent.id,
                            path,
                        });
                    }
                }
            }
            return;
        }

        if agent.carrying.is_some() {
            let Some(table) = tables
                .iter()
                .filter(|table| table.has_capacity())
                .min_by_key(|table| (agent.cell.manhattan_distance(table.cell), table.id))
            else {
                return;
            };
            if agent.cell.is_adjacent_to(table.cell) {
                out.push(Command::DeliverResource {
                    agent: agent.id,
                    table: table.id,
                });
                return;
            }
            let berth = Direction::ALL
                .iter()
                .filter_map(|direction| table.cell.stepped(*direction))
                .filter(|cell| terrain.is_open(*cell) && occupancy.is_free(*cell))
                .min_by_key(|cell| (agent.cell.manhattan_distance(*cell), cell.column(), cell.row()));
            if let Some(berth) = berth {
                if let Some(path) = plan_path(terrain, agent.cell, berth, profile.traversal) {
                    out.push(Command::SetAgentPath {
                        agent: agent.id,
                        path,
                    });
                }
            }
            return;
        }

        let gold = pickups
            .iter()
            .filter(|pickup| pickup.kind == ResourceKind::Gold)
            .min_by_key(|pickup| (agent.cell.manhattan_distance(pickup.cell), pickup.id));
        match gold {
            Some(pickup) if pickup.cell == agent.cell => {
                out.push(Command::PickUpResource {
                    agent: agent.id,
                    pickup: pickup.id,
                });
            }
            Some(pickup) => {
                if let Some(path) = plan_path(terrain, agent.cell, pickup.cell, profile.traversal) {
                    out.push(Command::SetAgentPath {
                        agent: agent.id,
                        path,
                    });
                }
            }
            None => self.random_step(agent, terrain, occupancy, out),
        }
    }

    fn advance_rng(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(RNG_MULTIPLIER)
            .wrapping_add(RNG_INCREMENT);
        self.rng_state
    }

    fn remembered(&self, agent: AgentId) -> Option<u8> {
        self.priorities
            .iter()
            .find(|(id, _)| *id == agent)
            .map(|(_, priority)| *priority)
    }

    fn remember(&mut self, agent: AgentId, priority: u8) {
        match self.priorities.iter_mut().find(|(id, _)| *id == agent) {
            Some(entry) => entry.1 = entry.1.max(priority),
            None => self.priorities.push((agent, priority)),
        }
    }

    fn forget(&mut self, agent: AgentId) {
        self.priorities.retain(|(id, _)| *id != agent);
    }
}

fn resolve_target_cell(
    target: TargetRef,
    agents: &AgentView,
    player: Option<PlayerSnapshot>,
) -> Option<CellCoord> {
    match target {
        TargetRef::Agent(id) => agents
            .get(id)
            .filter(|snapshot| snapshot.state != AgentState::Dead)
            .map(|snapshot| snapshot.cell),
        TargetRef::Player => player.map(|snapshot| snapshot.cell),
    }
}

fn in_attack_range(
    agent: &AgentSnapshot,
    profile: &ArchetypeProfile,
    target_cell: CellCoord,
    terrain: &TerrainView<'_>,
) -> bool {
    match profile.combat {
        CombatStyle::Melee | CombatStyle::Attach | CombatStyle::Breacher => {
            agent.cell.is_adjacent_to(target_cell)
        }
        CombatStyle::Ranged => {
            agent.cell.manhattan_distance(target_cell) <= profile.sight_range
                && pathfinding::straight_sighted(terrain, agent.cell, target_cell)
        }
        CombatStyle::Pacifist => false,
    }
}

/// Reports whether a candidate falls inside the creature's sight cone: the
/// facing half-plane, clipped to the archetype's sight radius.
fn in_sight_cone(agent: &AgentSnapshot, profile: &ArchetypeProfile, candidate: CellCoord) -> bool {
    let distance = agent.cell.manhattan_distance(candidate);
    if distance == 0 || distance > profile.sight_range {
        return false;
    }

    let dx = i64::from(candidate.column()) - i64::from(agent.cell.column());
    let dy = i64::from(candidate.row()) - i64::from(agent.cell.row());
    let (fx, fy) = match agent.facing {
        Direction::North => (0, -1),
        Direction::East => (1, 0),
        Direction::South => (0, 1),
        Direction::West => (-1, 0),
    };
    dx * fx + dy * fy >= 0
}

/// Hug-the-wall probe: right turn first, then forward, then left, then
/// reverse; the first open, unoccupied cell decides the direction.
fn wall_hug_probe(
    agent: &AgentSnapshot,
    profile: &ArchetypeProfile,
    terrain: &TerrainView<'_>,
    occupancy: OccupancyView<'_>,
) -> Option<Direction> {
    let order = [
        agent.facing.turned_right(),
        agent.facing,
        agent.facing.turned_left(),
        agent.facing.reversed(),
    ];
    order.into_iter().find(|direction| {
        agent.cell.stepped(*direction).is_some_and(|cell| {
            let walkable = match profile.traversal {
                PathMode::Phasing => terrain.contains(cell),
                _ => terrain.is_open(cell),
            };
            walkable && occupancy.is_free(cell)
        })
    })
}

/// Plans a path and flattens every failure into `None`: out-of-bounds and
/// blocked endpoints are expected, recoverable conditions here.
fn plan_path(
    terrain: &TerrainView<'_>,
    from: CellCoord,
    to: CellCoord,
    mode: PathMode,
) -> Option<Vec<CellCoord>> {
    pathfinding::shortest_path(terrain, from, to, mode)
        .ok()
        .flatten()
        .filter(|path| !path.is_exhausted())
        .map(pathfinding::CellPath::into_vec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spire_core::{Archetype, Health};

    fn snapshot(
        id: u32,
        archetype: Archetype,
        faction: Faction,
        cell: CellCoord,
        facing: Direction,
    ) -> AgentSnapshot {
        AgentSnapshot {
            id: AgentId::new(id),
            archetype,
            faction,
            cell,
            facing,
            health: archetype.profile().max_health,
            state: AgentState::Roaming,
            carrying: None,
            engaged: None,
            path_head: None,
            ready_to_move: true,
            ready_to_attack: true,
        }
    }

    fn open_terrain(columns: u32, rows: u32) -> TerrainView<'static> {
        TerrainView::from_owned(
            vec![BlockingKind::None; (columns * rows) as usize],
            columns,
            rows,
        )
    }

    #[test]
    fn sight_cone_rejects_candidates_behind_the_facing() {
        let queen = snapshot(
            1,
            Archetype::Queen,
            Faction::Enemy,
            CellCoord::new(3, 3),
            Direction::South,
        );
        let profile = queen.archetype.profile();

        assert!(in_sight_cone(&queen, &profile, CellCoord::new(3, 5)));
        assert!(in_sight_cone(&queen, &profile, CellCoord::new(5, 3)));
        assert!(!in_sight_cone(&queen, &profile, CellCoord::new(3, 1)));
        assert!(!in_sight_cone(&queen, &profile, CellCoord::new(3, 3)));
    }

    #[test]
    fn sight_cone_respects_the_radius() {
        let golem = snapshot(
            1,
            Archetype::Golem,
            Faction::Enemy,
            CellCoord::new(0, 0),
            Direction::South,
        );
        let profile = golem.archetype.profile();

        assert!(in_sight_cone(&golem, &profile, CellCoord::new(0, 4)));
        assert!(!in_sight_cone(&golem, &profile, CellCoord::new(0, 5)));
    }

    #[test]
    fn wall_hug_prefers_the_right_hand_turn() {
        let golem = snapshot(
            1,
            Archetype::Golem,
            Faction::Summon,
            CellCoord::new(1, 1),
            Direction::North,
        );
        let profile = golem.archetype.profile();
        let occupancy_cells: Vec<Option<AgentId>> = vec![None; 9];
        let occupancy = OccupancyView::new(&occupancy_cells, 3, 3);

        // Fully open: facing north, the right-hand probe points east.
        let open = open_terrain(3, 3);
        assert_eq!(
            wall_hug_probe(&golem, &profile, &open, occupancy),
            Some(Direction::East)
        );

        // Wall to the east: forward wins next.
        let mut cells = vec![BlockingKind::None; 9];
        cells[1 * 3 + 2] = BlockingKind::Full;
        let walled = TerrainView::from_owned(cells, 3, 3);
        assert_eq!(
            wall_hug_probe(&golem, &profile, &walled, occupancy),
            Some(Direction::North)
        );
    }

    #[test]
    fn wall_hug_reverses_out_of_a_dead_end() {
        let golem = snapshot(
            1,
            Archetype::Golem,
            Faction::Summon,
            CellCoord::new(1, 0),
            Direction::North,
        );
        let profile = golem.archetype.profile();
        let occupancy_cells: Vec<Option<AgentId>> = vec![None; 9];
        let occupancy = OccupancyView::new(&occupancy_cells, 3, 3);

        // Pocket open only below the creature.
        let mut cells = vec![BlockingKind::Full; 9];
        cells[0 * 3 + 1] = BlockingKind::None;
        cells[1 * 3 + 1] = BlockingKind::None;
        let pocket = TerrainView::from_owned(cells, 3, 3);

        assert_eq!(
            wall_hug_probe(&golem, &profile, &pocket, occupancy),
            Some(Direction::South)
        );
    }

    #[test]
    fn target_selection_prefers_priority_over_distance() {
        let behavior = Behavior::new(Config::new(1));
        let queen = snapshot(
            1,
            Archetype::Queen,
            Faction::Enemy,
            CellCoord::new(2, 2),
            Direction::South,
        );
        let profile = queen.archetype.profile();
        // The summon is closer than the player, yet ranks below it.
        let summon = snapshot(
            2,
            Archetype::Ghost,
            Faction::Summon,
            CellCoord::new(2, 3),
            Direction::North,
        );
        let view = AgentView::from_snapshots(vec![queen, summon]);
        let player = PlayerSnapshot {
            cell: CellCoord::new(2, 6),
            health: Health::new(20),
        };
        let picked = behavior
            .select_target(&queen, &profile, &view, Some(player))
            .expect("candidates visible");

        assert_eq!(picked.0, TargetRef::Player);
        assert_eq!(picked.2, Faction::Player);
    }

    #[test]
    fn remembered_priority_filters_lower_ranked_sightings() {
        let mut behavior = Behavior::new(Config::new(1));
        let queen = snapshot(
            1,
            Archetype::Queen,
            Faction::Enemy,
            CellCoord::new(2, 2),
            Direction::South,
        );
        let profile = queen.archetype.profile();
        behavior.remember(queen.id, Faction::Player.priority());

        let summon = snapshot(
            2,
            Archetype::Ghost,
            Faction::Summon,
            CellCoord::new(2, 3),
            Direction::North,
        );
        let view = AgentView::from_snapshots(vec![queen, summon]);

        // Only the lower-priority summon is visible; the engagement memory
        // keeps the queen holding out for a player-ranked target.
        assert!(behavior
            .select_target(&queen, &profile, &view, None)
            .is_none());

        behavior.forget(queen.id);
        assert!(behavior
            .select_target(&queen, &profile, &view, None)
            .is_some());
    }

    #[test]
    fn priority_memory_never_downgrades() {
        let mut behavior = Behavior::new(Config::new(1));
        let id = AgentId::new(9);

        behavior.remember(id, 2);
        behavior.remember(id, 1);
        assert_eq!(behavior.remembered(id), Some(2));

        behavior.forget(id);
        assert_eq!(behavior.remembered(id), None);
    }

    #[test]
    fn plan_path_downgrades_errors_to_none() {
        let terrain = open_terrain(4, 4);
        // Out of bounds is an error at the search layer, a shrug here.
        assert!(plan_path(
            &terrain,
            CellCoord::new(0, 0),
            CellCoord::new(9, 9),
            PathMode::Standard
        )
        .is_none());

        // Walled-off goals yield no path rather than an error.
        let mut cells = vec![BlockingKind::None; 16];
        for row in 0..4 {
            cells[(row * 4 + 2) as usize] = BlockingKind::Full;
        }
        let sealed = TerrainView::from_owned(cells, 4, 4);
        assert!(plan_path(
            &sealed,
            CellCoord::new(0, 0),
            CellCoord::new(3, 0),
            PathMode::Standard
        )
        .is_none());
    }
}
