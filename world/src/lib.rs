#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Spire Alchemist.
//!
//! The world owns the block grid, the creature roster, resource pickups,
//! summoning tables, and the player. All mutation flows through [`apply`];
//! systems observe the results through the read-only views in [`query`].

mod generation;
mod registry;

use std::time::Duration;

use spire_core::{
    AgentId, AgentState, Archetype, BlockId, BlockMaterial, BlockingKind, CellCoord, CombatStyle,
    Command, Direction, Event, Faction, Health, MineRejection, PathMode, PickupId, ResourceKind,
    TableId, TableRejection, TargetRef, TerrainView, WorldPoint, WELCOME_BANNER,
};
use spire_system_pathfinding as pathfinding;

pub use generation::{
    BlockCatalog, GridError, CRYSTAL_BLOCK, GOLD_BLOCK, OPEN_BLOCK, SLIME_BLOCK, STONE_BLOCK,
    TABLE_BLOCK,
};
use generation::Lcg;
pub use registry::Registry;

const DEFAULT_GRID_COLUMNS: u32 = 9;
const DEFAULT_GRID_ROWS: u32 = 12;
const DEFAULT_CELL_SIZE: f32 = 1.0;
const DEFAULT_WORLD_SEED: u64 = 0x6a09_e667_f3bc_c908;

const PLAYER_MAX_HEALTH: Health = Health::new(20);

/// How long a dead creature's roster entry lingers before reclamation.
const REMOVAL_GRACE: Duration = Duration::from_millis(1200);

/// Duration adapters should spend animating one scroll step.
const SCROLL_ANIMATION: Duration = Duration::from_millis(600);

/// Parameters required to generate a world.
#[derive(Clone, Copy, Debug)]
pub struct GridConfig {
    columns: u32,
    rows: u32,
    cell_size: f32,
    seed: u64,
}

impl GridConfig {
    /// Creates a new grid configuration.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, cell_size: f32, seed: u64) -> Self {
        Self {
            columns,
            rows,
            cell_size,
            seed,
        }
    }

    /// Number of columns in the configured grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the configured grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_GRID_COLUMNS,
            rows: DEFAULT_GRID_ROWS,
            cell_size: DEFAULT_CELL_SIZE,
            seed: DEFAULT_WORLD_SEED,
        }
    }
}

/// Single cell of the spire's block grid.
#[derive(Clone, Copy, Debug)]
pub struct GridCell {
    coord: CellCoord,
    position: WorldPoint,
    depth: u32,
    block: BlockId,
}

impl GridCell {
    /// Grid coordinate of the cell.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Continuous world-space position of the cell's center.
    #[must_use]
    pub const fn position(&self) -> WorldPoint {
        self.position
    }

    /// Absolute depth below the original surface, used for spawn weighting.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Catalog id of the block currently occupying the cell.
    #[must_use]
    pub const fn block(&self) -> BlockId {
        self.block
    }
}

/// Represents the authoritative Spire Alchemist world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    catalog: BlockCatalog,
    grid: Grid,
    occupancy: OccupancyGrid,
    agents: Vec<Agent>,
    pickups: Vec<Pickup>,
    tables: Vec<Table>,
    player: Option<Player>,
    registry: Registry,
    rng: Lcg,
    next_agent_id: u32,
    next_pickup_id: u32,
    next_table_id: u32,
    tick_index: u64,
}

impl World {
    /// Generates a world with the standard block catalog.
    ///
    /// # Errors
    ///
    /// [`GridError`] when the configuration is degenerate; this is fatal and
    /// should abort level load with the diagnostic.
    pub fn generate(config: GridConfig) -> Result<Self, GridError> {
        Self::with_catalog(config, BlockCatalog::standard())
    }

    /// Generates a world with an explicit block catalog.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidDimensions`] for a zero-sized grid and
    /// [`GridError::NoTemplateForDepth`] when the catalog leaves a depth
    /// without a spawnable template.
    pub fn with_catalog(config: GridConfig, catalog: BlockCatalog) -> Result<Self, GridError> {
        catalog.validate()?;
        let mut rng = Lcg::new(config.seed);
        let grid = Grid::generate(config, &catalog, &mut rng)?;
        let occupancy = OccupancyGrid::new(config.columns, config.rows);
        Ok(Self {
            banner: WELCOME_BANNER,
            catalog,
            grid,
            occupancy,
            agents: Vec::new(),
            pickups: Vec::new(),
            tables: Vec::new(),
            player: None,
            registry: Registry::new(),
            rng,
            next_agent_id: 0,
            next_pickup_id: 0,
            next_table_id: 0,
            tick_index: 0,
        })
    }

    fn agent_index(&self, agent: AgentId) -> Option<usize> {
        self.agents.iter().position(|entry| entry.id == agent)
    }

    fn living_agent_index(&self, agent: AgentId) -> Option<usize> {
        self.agents
            .iter()
            .position(|entry| entry.id == agent && entry.state != AgentState::Dead)
    }

    fn cell_is_enterable(&self, cell: CellCoord, traversal: PathMode) -> bool {
        let open = match traversal {
            PathMode::Phasing => self.grid.contains(cell),
            PathMode::Standard | PathMode::Breach => self.grid.is_open(cell),
        };
        open && self.occupancy.can_enter(cell)
            && self.player.as_ref().map_or(true, |player| player.cell != cell)
    }

    fn advance_clock(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TimeAdvanced { dt });

        let positions: Vec<(AgentId, CellCoord)> = self
            .agents
            .iter()
            .filter(|agent| agent.state != AgentState::Dead && !agent.pending_return)
            .map(|agent| (agent.id, agent.cell))
            .collect();
        let player_cell = self.player.as_ref().map(|player| player.cell);

        for agent in &mut self.agents {
            if agent.state == AgentState::Dead || agent.pending_return {
                continue;
            }

            agent.move_accumulator = agent.move_accumulator.saturating_add(dt);

            let Some(target) = agent.engaged else {
                continue;
            };
            let profile = agent.archetype.profile();
            let target_cell = match target {
                TargetRef::Agent(id) => positions
                    .iter()
                    .find(|(other, _)| *other == id)
                    .map(|(_, cell)| *cell),
                TargetRef::Player => player_cell,
            };

            // Attachment demands unbroken contact; losing adjacency restarts
            // the damage clock from zero.
            let contact_holds = target_cell
                .map_or(false, |cell| agent.cell.is_adjacent_to(cell));
            if profile.combat == CombatStyle::Attach && !contact_holds {
                agent.attack_accumulator = Duration::ZERO;
            } else {
                agent.attack_accumulator = agent.attack_accumulator.saturating_add(dt);
            }
        }

        self.reclaim_dead(dt, out_events);
        self.place_returners(out_events);
    }

    fn reclaim_dead(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let mut reclaimed: Vec<AgentId> = Vec::new();
        for agent in &mut self.agents {
            if let Some(remaining) = agent.removal_in {
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    reclaimed.push(agent.id);
                } else {
                    agent.removal_in = Some(remaining);
                }
            }
        }

        for agent in reclaimed {
            if let Some(index) = self.agent_index(agent) {
                let _ = self.agents.remove(index);
                out_events.push(Event::AgentRemoved { agent });
            }
        }
    }

    /// Settles every displaced entity onto a free entrance cell, the player
    /// first. Entities that find no open entrance stay suspended and retry
    /// on the next tick.
    fn place_returners(&mut self, out_events: &mut Vec<Event>) {
        if self.player.as_ref().map_or(false, |player| player.pending_return) {
            if let Some(cell) = self.free_entrance_cell() {
                if let Some(player) = self.player.as_mut() {
                    player.cell = cell;
                    player.pending_return = false;
                    out_events.push(Event::PlayerDisplaced { to: cell });
                }
            }
        }

        let pending: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|agent| agent.pending_return && agent.state != AgentState::Dead)
            .map(|agent| agent.id)
            .collect();

        for agent_id in pending {
            let Some(cell) = self.free_entrance_cell() else {
                break;
            };
            if let Some(index) = self.agent_index(agent_id) {
                let agent = &mut self.agents[index];
                agent.cell = cell;
                agent.pending_return = false;
                agent.state = AgentState::Roaming;
                agent.reset_transient_state();
                self.occupancy.occupy(agent_id, cell);
                out_events.push(Event::AgentDisplaced {
                    agent: agent_id,
                    to: cell,
                });
            }
        }
    }

    fn free_entrance_cell(&self) -> Option<CellCoord> {
        let player_cell = self.player.as_ref().and_then(|player| {
            (!player.pending_return).then_some(player.cell)
        });
        (0..self.grid.columns)
            .map(|column| CellCoord::new(column, 0))
            .find(|cell| {
                self.grid.is_open(*cell)
                    && self.occupancy.can_enter(*cell)
                    && player_cell != Some(*cell)
            })
    }

    fn scroll(&mut self, steps: u32, out_events: &mut Vec<Event>) {
        if steps == 0 {
            return;
        }

        self.grid.scroll_up(steps, &self.catalog, &mut self.rng);

        let mut expired_pickups: Vec<PickupId> = Vec::new();
        self.pickups.retain_mut(|pickup| {
            if pickup.cell.row() < steps {
                expired_pickups.push(pickup.id);
                false
            } else {
                pickup.cell = CellCoord::new(pickup.cell.column(), pickup.cell.row() - steps);
                true
            }
        });
        for pickup in expired_pickups {
            let _ = self.registry.unregister_pickup(pickup);
            out_events.push(Event::PickupExpired { pickup });
        }

        let mut lost_tables: Vec<TableId> = Vec::new();
        self.tables.retain_mut(|table| {
            if table.cell.row() < steps {
                lost_tables.push(table.id);
                false
            } else {
                table.cell = CellCoord::new(table.cell.column(), table.cell.row() - steps);
                true
            }
        });
        for table in lost_tables {
            let _ = self.registry.unregister_table(table);
            out_events.push(Event::TableRemoved { table });
        }

        for agent in &mut self.agents {
            if agent.state == AgentState::Dead {
                continue;
            }
            if agent.cell.row() < steps {
                agent.pending_return = true;
                agent.state = AgentState::ReturningToGrid;
                agent.reset_transient_state();
            } else {
                agent.cell = CellCoord::new(agent.cell.column(), agent.cell.row() - steps);
            }
        }

        if let Some(player) = self.player.as_mut() {
            if player.cell.row() < steps {
                player.pending_return = true;
            } else {
                player.cell = CellCoord::new(player.cell.column(), player.cell.row() - steps);
            }
        }

        self.occupancy.fill_with(&self.agents);

        out_events.push(Event::GridScrolled {
            move_by: WorldPoint::new(0.0, steps as f32 * self.grid.cell_size, 0.0),
            duration: SCROLL_ANIMATION,
            rows: steps,
        });

        self.place_returners(out_events);
    }

    fn mine(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        let Some(grid_cell) = self.grid.cell_at_opt(cell) else {
            out_events.push(Event::MineRejected {
                cell,
                reason: MineRejection::OutOfBounds,
            });
            return;
        };

        let template = self.catalog.template(grid_cell.block);
        if template.material == BlockMaterial::None {
            out_events.push(Event::MineRejected {
                cell,
                reason: MineRejection::AlreadyOpen,
            });
            return;
        }
        if !template.destructible {
            out_events.push(Event::MineRejected {
                cell,
                reason: MineRejection::NotDestructible,
            });
            return;
        }

        let resource = template.resource;
        self.grid.set_block(cell, OPEN_BLOCK, &self.catalog);
        out_events.push(Event::CellMined { cell, resource });

        if let Some(kind) = resource {
            let pickup = PickupId::new(self.next_pickup_id);
            self.next_pickup_id += 1;
            self.pickups.push(Pickup {
                id: pickup,
                kind,
                cell,
            });
            let _ = self.registry.register_pickup(pickup);
            out_events.push(Event::PickupSpawned { pickup, kind, cell });
        }
    }

    fn place_table(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        if !self.grid.contains(cell) {
            out_events.push(Event::TablePlacementRejected {
                cell,
                reason: TableRejection::OutOfBounds,
            });
            return;
        }
        if !self.grid.is_open(cell) {
            out_events.push(Event::TablePlacementRejected {
                cell,
                reason: TableRejection::Blocked,
            });
            return;
        }
        let occupied = !self.occupancy.can_enter(cell)
            || self.player.as_ref().map_or(false, |player| player.cell == cell)
            || self.pickups.iter().any(|pickup| pickup.cell == cell);
        if occupied {
            out_events.push(Event::TablePlacementRejected {
                cell,
                reason: TableRejection::Occupied,
            });
            return;
        }

        let table = TableId::new(self.next_table_id);
        self.next_table_id += 1;
        self.grid.set_block(cell, TABLE_BLOCK, &self.catalog);
        self.tables.push(Table {
            id: table,
            cell,
            held: Vec::new(),
        });
        let _ = self.registry.register_table(table);
        out_events.push(Event::TablePlaced { table, cell });
    }

    fn remove_table(&mut self, table: TableId, out_events: &mut Vec<Event>) {
        let Some(index) = self.tables.iter().position(|entry| entry.id == table) else {
            return;
        };
        let entry = self.tables.remove(index);
        self.grid.set_block(entry.cell, OPEN_BLOCK, &self.catalog);
        let _ = self.registry.unregister_table(table);
        out_events.push(Event::TableRemoved { table });
    }

    fn spawn_agent(
        &mut self,
        archetype: Archetype,
        faction: Faction,
        cell: CellCoord,
        out_events: &mut Vec<Event>,
    ) {
        let traversal = archetype.profile().traversal;
        if !self.cell_is_enterable(cell, traversal) {
            return;
        }

        let agent = AgentId::new(self.next_agent_id);
        self.next_agent_id += 1;
        self.agents.push(Agent::spawned(agent, archetype, faction, cell));
        self.occupancy.occupy(agent, cell);
        let _ = self.registry.register_agent(agent);
        out_events.push(Event::AgentSpawned {
            agent,
            archetype,
            faction,
            cell,
        });
    }

    fn spawn_player(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        if self.player.is_some() {
            return;
        }
        if !self.grid.is_open(cell) || !self.occupancy.can_enter(cell) {
            return;
        }

        self.player = Some(Player {
            cell,
            health: PLAYER_MAX_HEALTH,
            pending_return: false,
        });
        self.registry.set_player_present(true);
        out_events.push(Event::PlayerSpawned { cell });
    }

    fn step_player(&mut self, direction: Direction, out_events: &mut Vec<Event>) {
        let Some(from) = self
            .player
            .as_ref()
            .filter(|player| !player.pending_return)
            .map(|player| player.cell)
        else {
            return;
        };
        let Some(to) = from.stepped(direction) else {
            return;
        };
        if !self.grid.is_open(to) || !self.occupancy.can_enter(to) {
            return;
        }

        if let Some(player) = self.player.as_mut() {
            player.cell = to;
        }
        out_events.push(Event::PlayerMoved { from, to });
    }

    fn set_agent_path(&mut self, agent: AgentId, path: Vec<CellCoord>, out_events: &mut Vec<Event>) {
        let Some(index) = self.living_agent_index(agent) else {
            return;
        };
        if self.agents[index].pending_return {
            return;
        }

        if path.is_empty() {
            let entry = &mut self.agents[index];
            entry.path.clear();
            if entry.state == AgentState::Pursuing {
                entry.state = AgentState::Roaming;
            }
            return;
        }

        let legal = path.iter().all(|cell| self.grid.contains(*cell))
            && self.agents[index].cell.is_adjacent_to(path[0]);
        if !legal {
            out_events.push(Event::AgentPathRejected { agent });
            return;
        }

        let entry = &mut self.agents[index];
        entry.path = pathfinding::CellPath::from_cells(path);
        entry.state = AgentState::Pursuing;
    }

    fn step_agent(&mut self, agent: AgentId, direction: Direction, out_events: &mut Vec<Event>) {
        let Some(index) = self.living_agent_index(agent) else {
            return;
        };
        let (from, ready, traversal) = {
            let entry = &self.agents[index];
            if entry.pending_return {
                return;
            }
            (
                entry.cell,
                entry.ready_to_move(),
                entry.archetype.profile().traversal,
            )
        };
        if !ready {
            return;
        }
        let Some(to) = from.stepped(direction) else {
            return;
        };
        if !self.cell_is_enterable(to, traversal) {
            return;
        }

        let move_interval = self.agents[index].archetype.profile().move_interval;
        let entry = &mut self.agents[index];
        entry.facing = direction;
        entry.cell = to;
        entry.move_accumulator = entry.move_accumulator.saturating_sub(move_interval);
        match entry.path.peek_next() {
            Some(head) if head == to => {
                let _ = entry.path.pop_next();
            }
            Some(_) => entry.path.clear(),
            None => {}
        }
        if entry.path.is_exhausted() && entry.state == AgentState::Pursuing {
            entry.state = AgentState::Roaming;
        }

        self.occupancy.vacate(from);
        self.occupancy.occupy(agent, to);
        out_events.push(Event::AgentAdvanced { agent, from, to });
    }

    fn face_agent(&mut self, agent: AgentId, direction: Direction) {
        if let Some(index) = self.living_agent_index(agent) {
            let entry = &mut self.agents[index];
            if !entry.pending_return {
                entry.facing = direction;
            }
        }
    }

    fn engage_target(&mut self, agent: AgentId, target: TargetRef) {
        let target_exists = match target {
            TargetRef::Agent(id) => self.living_agent_index(id).is_some(),
            TargetRef::Player => self.player.is_some(),
        };
        if !target_exists {
            return;
        }
        if matches!(target, TargetRef::Agent(id) if id == agent) {
            return;
        }

        if let Some(index) = self.living_agent_index(agent) {
            let entry = &mut self.agents[index];
            if entry.pending_return {
                return;
            }
            entry.engaged = Some(target);
            entry.state = AgentState::InCombat;
            entry.attack_accumulator = Duration::ZERO;
        }
    }

    fn disengage(&mut self, agent: AgentId) {
        if let Some(index) = self.living_agent_index(agent) {
            let entry = &mut self.agents[index];
            entry.engaged = None;
            entry.attack_accumulator = Duration::ZERO;
            if entry.state == AgentState::InCombat {
                entry.state = AgentState::Roaming;
            }
        }
    }

    fn strike(&mut self, attacker: AgentId, target: TargetRef, out_events: &mut Vec<Event>) {
        let Some(attacker_index) = self.living_agent_index(attacker) else {
            return;
        };
        let (attacker_cell, profile, engaged, ready) = {
            let entry = &self.agents[attacker_index];
            (
                entry.cell,
                entry.archetype.profile(),
                entry.engaged,
                entry.ready_to_attack(),
            )
        };
        if engaged != Some(target) || !ready || profile.damage == 0 {
            return;
        }

        let target_cell = match target {
            TargetRef::Agent(id) => {
                let Some(index) = self.living_agent_index(id) else {
                    return;
                };
                self.agents[index].cell
            }
            TargetRef::Player => {
                let Some(player) = self.player.as_ref() else {
                    return;
                };
                player.cell
            }
        };

        let in_range = match profile.combat {
            CombatStyle::Melee | CombatStyle::Attach | CombatStyle::Breacher => {
                attacker_cell.is_adjacent_to(target_cell)
            }
            CombatStyle::Ranged => {
                attacker_cell.manhattan_distance(target_cell) <= profile.sight_range
                    && pathfinding::straight_sighted(
                        &self.grid.terrain_view(),
                        attacker_cell,
                        target_cell,
                    )
            }
            CombatStyle::Pacifist => false,
        };
        if !in_range {
            return;
        }

        self.agents[attacker_index].attack_accumulator = Duration::ZERO;

        match target {
            TargetRef::Agent(id) => {
                let Some(index) = self.living_agent_index(id) else {
                    return;
                };
                let remaining = self.agents[index].health.reduced_by(profile.damage);
                self.agents[index].health = remaining;
                out_events.push(Event::AgentStruck {
                    attacker,
                    target: id,
                    damage: profile.damage,
                    remaining,
                });
                if remaining.is_depleted() {
                    self.kill_agent(index, out_events);
                }
            }
            TargetRef::Player => {
                let Some(player) = self.player.as_mut() else {
                    return;
                };
                let remaining = player.health.reduced_by(profile.damage);
                player.health = remaining;
                out_events.push(Event::PlayerStruck {
                    attacker,
                    damage: profile.damage,
                    remaining,
                });
                if remaining.is_depleted() {
                    self.player = None;
                    self.registry.set_player_present(false);
                    out_events.push(Event::PlayerDied);
                }
            }
        }
    }

    fn kill_agent(&mut self, index: usize, out_events: &mut Vec<Event>) {
        let entry = &mut self.agents[index];
        if entry.state == AgentState::Dead {
            return;
        }
        entry.state = AgentState::Dead;
        entry.removal_in = Some(REMOVAL_GRACE);
        entry.reset_transient_state();
        let id = entry.id;
        let cell = entry.cell;
        self.occupancy.vacate(cell);
        let _ = self.registry.unregister_agent(id);
        out_events.push(Event::AgentDied { agent: id });
    }

    fn pick_up_resource(&mut self, agent: AgentId, pickup: PickupId, out_events: &mut Vec<Event>) {
        let Some(agent_index) = self.living_agent_index(agent) else {
            return;
        };
        if self.agents[agent_index].carrying.is_some() || self.agents[agent_index].pending_return {
            return;
        }
        let Some(pickup_index) = self.pickups.iter().position(|entry| entry.id == pickup) else {
            return;
        };
        if self.pickups[pickup_index].cell != self.agents[agent_index].cell {
            return;
        }

        let entry = self.pickups.remove(pickup_index);
        let _ = self.registry.unregister_pickup(pickup);
        self.agents[agent_index].carrying = Some(entry.kind);
        out_events.push(Event::PickupCollected { pickup, agent });
    }

    fn deliver_resource(&mut self, agent: AgentId, table: TableId, out_events: &mut Vec<Event>) {
        let Some(agent_index) = self.living_agent_index(agent) else {
            return;
        };
        let Some(kind) = self.agents[agent_index].carrying else {
            return;
        };
        let Some(table_index) = self.tables.iter().position(|entry| entry.id == table) else {
            return;
        };
        let entry = &self.tables[table_index];
        if !entry.cell.is_adjacent_to(self.agents[agent_index].cell) || entry.held.len() >= 2 {
            return;
        }

        self.agents[agent_index].carrying = None;
        self.tables[table_index].held.push(kind);
        out_events.push(Event::ResourceDelivered { table, kind });

        if self.tables[table_index].held.len() == 2 {
            let first = self.tables[table_index].held[0];
            let second = self.tables[table_index].held[1];
            self.tables[table_index].held.clear();
            out_events.push(Event::TableReady {
                table,
                first,
                second,
            });
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.advance_clock(dt, out_events),
        Command::ScrollGrid { rows } => world.scroll(rows, out_events),
        Command::MineCell { cell } => world.mine(cell, out_events),
        Command::PlaceTable { cell } => world.place_table(cell, out_events),
        Command::RemoveTable { table } => world.remove_table(table, out_events),
        Command::SpawnAgent {
            archetype,
            faction,
            cell,
        } => world.spawn_agent(archetype, faction, cell, out_events),
        Command::SpawnPlayer { cell } => world.spawn_player(cell, out_events),
        Command::StepPlayer { direction } => world.step_player(direction, out_events),
        Command::SetAgentPath { agent, path } => world.set_agent_path(agent, path, out_events),
        Command::StepAgent { agent, direction } => world.step_agent(agent, direction, out_events),
        Command::FaceAgent { agent, direction } => world.face_agent(agent, direction),
        Command::EngageTarget { agent, target } => world.engage_target(agent, target),
        Command::Disengage { agent } => world.disengage(agent),
        Command::Strike { attacker, target } => world.strike(attacker, target, out_events),
        Command::PickUpResource { agent, pickup } => {
            world.pick_up_resource(agent, pickup, out_events);
        }
        Command::DeliverResource { agent, table } => {
            world.deliver_resource(agent, table, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{pathfinding, GridCell, GridError, World};
    use spire_core::{
        AgentSnapshot, AgentView, CellCoord, OccupancyView, PickupSnapshot, PickupView,
        PlayerSnapshot, ResourceKind, TableId, TableSnapshot, TableView, TerrainView, WorldPoint,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Grid dimensions as `(columns, rows)`.
    #[must_use]
    pub fn grid_dimensions(world: &World) -> (u32, u32) {
        (world.grid.columns, world.grid.rows)
    }

    /// Absolute depth of the current surface row.
    #[must_use]
    pub fn ground_depth(world: &World) -> u32 {
        world.grid.ground_depth
    }

    /// Total world-space distance the grid has scrolled upward.
    #[must_use]
    pub fn scroll_offset(world: &World) -> f32 {
        world.grid.scroll_offset
    }

    /// Cell at the provided coordinate.
    ///
    /// # Errors
    ///
    /// [`GridError::OutOfBounds`] when the coordinate leaves the grid.
    pub fn cell_at(world: &World, cell: CellCoord) -> Result<&GridCell, GridError> {
        world.grid.cell_at_opt(cell).ok_or(GridError::OutOfBounds {
            column: cell.column(),
            row: cell.row(),
        })
    }

    /// Non-failing cell lookup used by speculative neighbor checks.
    #[must_use]
    pub fn cell_at_opt(world: &World, cell: CellCoord) -> Option<&GridCell> {
        world.grid.cell_at_opt(cell)
    }

    /// Cell whose center lies nearest the provided world-space position.
    ///
    /// Linear scan over every cell; grids stay small enough that this is
    /// acceptable.
    #[must_use]
    pub fn nearest_cell(world: &World, position: WorldPoint) -> Option<&GridCell> {
        world.grid.cells.iter().min_by(|a, b| {
            a.position
                .distance_squared(position)
                .total_cmp(&b.position.distance_squared(position))
        })
    }

    /// Read-only walkability view over the whole grid.
    #[must_use]
    pub fn terrain_view(world: &World) -> TerrainView<'_> {
        world.grid.terrain_view()
    }

    /// Read-only view of creature occupancy.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        OccupancyView::new(
            world.occupancy.cells(),
            world.grid.columns,
            world.grid.rows,
        )
    }

    /// Captures a read-only view of every creature on the roster.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        let snapshots: Vec<AgentSnapshot> = world
            .agents
            .iter()
            .map(|agent| AgentSnapshot {
                id: agent.id,
                archetype: agent.archetype,
                faction: agent.faction,
                cell: agent.cell,
                facing: agent.facing,
                health: agent.health,
                state: agent.state,
                carrying: agent.carrying,
                engaged: agent.engaged,
                path_head: agent.path.peek_next(),
                ready_to_move: agent.ready_to_move(),
                ready_to_attack: agent.ready_to_attack(),
            })
            .collect();
        AgentView::from_snapshots(snapshots)
    }

    /// Captures a read-only view of every pickup on the grid.
    #[must_use]
    pub fn pickup_view(world: &World) -> PickupView {
        let snapshots: Vec<PickupSnapshot> = world
            .pickups
            .iter()
            .map(|pickup| PickupSnapshot {
                id: pickup.id,
                kind: pickup.kind,
                cell: pickup.cell,
            })
            .collect();
        PickupView::from_snapshots(snapshots)
    }

    /// Captures a read-only view of every summoning table.
    #[must_use]
    pub fn table_view(world: &World) -> TableView {
        let snapshots: Vec<TableSnapshot> = world
            .tables
            .iter()
            .map(|table| TableSnapshot {
                id: table.id,
                cell: table.cell,
                held: table.held.clone(),
            })
            .collect();
        TableView::from_snapshots(snapshots)
    }

    /// Identifier of the table occupying the provided cell, if any.
    #[must_use]
    pub fn table_at(world: &World, cell: CellCoord) -> Option<TableId> {
        world
            .tables
            .iter()
            .find(|table| table.cell == cell)
            .map(|table| table.id)
    }

    /// Snapshot of the player entity while it is alive.
    #[must_use]
    pub fn player(world: &World) -> Option<PlayerSnapshot> {
        world.player.as_ref().map(|player| PlayerSnapshot {
            cell: player.cell,
            health: player.health,
        })
    }

    /// Enumerates the open, unoccupied surface cells creatures enter through.
    #[must_use]
    pub fn entrance_cells(world: &World) -> Vec<CellCoord> {
        let player_cell = world.player.as_ref().map(|player| player.cell);
        (0..world.grid.columns)
            .map(|column| CellCoord::new(column, 0))
            .filter(|cell| {
                world.grid.is_open(*cell)
                    && world.occupancy.can_enter(*cell)
                    && player_cell != Some(*cell)
            })
            .collect()
    }

    /// Nearest pickup of the requested kind, by Manhattan distance.
    #[must_use]
    pub fn nearest_pickup(
        world: &World,
        from: CellCoord,
        kind: ResourceKind,
    ) -> Option<PickupSnapshot> {
        world
            .pickups
            .iter()
            .filter(|pickup| pickup.kind == kind)
            .min_by_key(|pickup| (pathfinding::manhattan(from, pickup.cell), pickup.id))
            .map(|pickup| PickupSnapshot {
                id: pickup.id,
                kind: pickup.kind,
                cell: pickup.cell,
            })
    }

    /// Nearest table that can still accept a resource, by Manhattan distance.
    #[must_use]
    pub fn nearest_table_with_capacity(world: &World, from: CellCoord) -> Option<TableSnapshot> {
        world
            .tables
            .iter()
            .filter(|table| table.held.len() < 2)
            .min_by_key(|table| (pathfinding::manhattan(from, table.cell), table.id))
            .map(|table| TableSnapshot {
                id: table.id,
                cell: table.cell,
                held: table.held.clone(),
            })
    }

    /// Cells still holding a resource-bearing block, in row-major order.
    ///
    /// Wall-breakers treat these as dig targets; the list shrinks as seams
    /// are mined out and grows as scrolling exposes fresh rock.
    #[must_use]
    pub fn resource_seams(world: &World) -> Vec<CellCoord> {
        world
            .grid
            .cells
            .iter()
            .filter(|cell| {
                let template = world.catalog.template(cell.block());
                template.resource.is_some()
                    && template.blocking == spire_core::BlockingKind::Full
            })
            .map(|cell| cell.coord())
            .collect()
    }

    /// Live registry counts, exposed for adapters and diagnostics.
    #[must_use]
    pub fn registry(world: &World) -> &super::Registry {
        &world.registry
    }
}

#[derive(Debug)]
struct Grid {
    columns: u32,
    rows: u32,
    cell_size: f32,
    cells: Vec<GridCell>,
    blocking: Vec<BlockingKind>,
    ground_depth: u32,
    scroll_offset: f32,
}

impl Grid {
    fn generate(config: GridConfig, catalog: &BlockCatalog, rng: &mut Lcg) -> Result<Self, GridError> {
        if config.columns == 0 || config.rows == 0 {
            return Err(GridError::InvalidDimensions {
                columns: config.columns,
                rows: config.rows,
            });
        }

        let capacity = config.columns as usize * config.rows as usize;
        let mut cells = Vec::with_capacity(capacity);
        for row in 0..config.rows {
            for column in 0..config.columns {
                let depth = row;
                let block = catalog
                    .select(depth, rng.next_unit())
                    .ok_or(GridError::NoTemplateForDepth { depth })?;
                cells.push(GridCell {
                    coord: CellCoord::new(column, row),
                    position: cell_position(column, row, config.cell_size),
                    depth,
                    block,
                });
            }
        }

        let mut grid = Self {
            columns: config.columns,
            rows: config.rows,
            cell_size: config.cell_size,
            cells,
            blocking: Vec::new(),
            ground_depth: 0,
            scroll_offset: 0.0,
        };
        grid.rebuild_blocking(catalog);
        Ok(grid)
    }

    /// Shifts every row up by `steps`, discarding the surface rows and
    /// repopulating the exposed bottom rows at their new absolute depths.
    /// Shifted cells keep their block assignments; only coordinates, world
    /// positions, and the depth bookkeeping change.
    fn scroll_up(&mut self, steps: u32, catalog: &BlockCatalog, rng: &mut Lcg) {
        self.ground_depth = self.ground_depth.saturating_add(steps);
        self.scroll_offset += steps as f32 * self.cell_size;

        let mut shifted = Vec::with_capacity(self.cells.len());
        for row in 0..self.rows {
            for column in 0..self.columns {
                let depth = self.ground_depth.saturating_add(row);
                let source_row = row.checked_add(steps).filter(|source| *source < self.rows);
                let block = match source_row {
                    Some(source) => {
                        self.cells[(source * self.columns + column) as usize].block
                    }
                    None => catalog
                        .select(depth, rng.next_unit())
                        .unwrap_or(STONE_BLOCK),
                };
                shifted.push(GridCell {
                    coord: CellCoord::new(column, row),
                    position: cell_position(column, row, self.cell_size),
                    depth,
                    block,
                });
            }
        }
        self.cells = shifted;
        self.rebuild_blocking(catalog);
    }

    fn rebuild_blocking(&mut self, catalog: &BlockCatalog) {
        self.blocking = self
            .cells
            .iter()
            .map(|cell| catalog.template(cell.block).blocking)
            .collect();
    }

    fn set_block(&mut self, cell: CellCoord, block: BlockId, catalog: &BlockCatalog) {
        if let Some(index) = self.index(cell) {
            self.cells[index].block = block;
            self.blocking[index] = catalog.template(block).blocking;
        }
    }

    fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    fn is_open(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .map_or(false, |index| self.blocking[index] == BlockingKind::None)
    }

    fn cell_at_opt(&self, cell: CellCoord) -> Option<&GridCell> {
        self.index(cell).map(|index| &self.cells[index])
    }

    fn terrain_view(&self) -> TerrainView<'_> {
        TerrainView::from_slice(&self.blocking, self.columns, self.rows)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            Some((cell.row() * self.columns + cell.column()) as usize)
        } else {
            None
        }
    }
}

fn cell_position(column: u32, row: u32, cell_size: f32) -> WorldPoint {
    WorldPoint::new(column as f32 * cell_size, -(row as f32) * cell_size, 0.0)
}

#[derive(Clone, Debug)]
struct Agent {
    id: AgentId,
    archetype: Archetype,
    faction: Faction,
    cell: CellCoord,
    facing: Direction,
    health: Health,
    state: AgentState,
    path: pathfinding::CellPath,
    move_accumulator: Duration,
    attack_accumulator: Duration,
    carrying: Option<ResourceKind>,
    engaged: Option<TargetRef>,
    removal_in: Option<Duration>,
    pending_return: bool,
}

impl Agent {
    fn spawned(id: AgentId, archetype: Archetype, faction: Faction, cell: CellCoord) -> Self {
        Self {
            id,
            archetype,
            faction,
            cell,
            facing: Direction::South,
            health: archetype.profile().max_health,
            state: AgentState::Roaming,
            path: pathfinding::CellPath::new(),
            move_accumulator: Duration::ZERO,
            attack_accumulator: Duration::ZERO,
            carrying: None,
            engaged: None,
            removal_in: None,
            pending_return: false,
        }
    }

    fn ready_to_move(&self) -> bool {
        self.move_accumulator >= self.archetype.profile().move_interval
    }

    fn ready_to_attack(&self) -> bool {
        self.attack_accumulator >= self.archetype.profile().attack_interval
    }

    /// Idempotent cleanup shared by death, displacement, and scroll: no
    /// matter why a transition fires, the path and timers come away clean.
    fn reset_transient_state(&mut self) {
        self.path.clear();
        self.engaged = None;
        self.move_accumulator = Duration::ZERO;
        self.attack_accumulator = Duration::ZERO;
    }
}

#[derive(Clone, Copy, Debug)]
struct Pickup {
    id: PickupId,
    kind: ResourceKind,
    cell: CellCoord,
}

#[derive(Clone, Debug)]
struct Table {
    id: TableId,
    cell: CellCoord,
    held: Vec<ResourceKind>,
}

#[derive(Clone, Copy, Debug)]
struct Player {
    cell: CellCoord,
    health: Health,
    pending_return: bool,
}

#[derive(Clone, Debug)]
struct OccupancyGrid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<AgentId>>,
}

impl OccupancyGrid {
    fn new(columns: u32, rows: u32) -> Self {
        let capacity = columns as usize * rows as usize;
        Self {
            columns,
            rows,
            cells: vec![None; capacity],
        }
    }

    fn fill_with(&mut self, agents: &[Agent]) {
        self.cells.fill(None);
        for agent in agents {
            if agent.state == AgentState::Dead || agent.pending_return {
                continue;
            }
            if let Some(index) = self.index(agent.cell) {
                self.cells[index] = Some(agent.id);
            }
        }
    }

    fn can_enter(&self, cell: CellCoord) -> bool {
        self.index(cell).map_or(true, |index| {
            self.cells.get(index).copied().unwrap_or(None).is_none()
        })
    }

    fn occupy(&mut self, agent: AgentId, cell: CellCoord) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = Some(agent);
            }
        }
    }

    fn vacate(&mut self, cell: CellCoord) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = None;
            }
        }
    }

    fn cells(&self) -> &[Option<AgentId>] {
        &self.cells
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            Some((cell.row() * self.columns + cell.column()) as usize)
        } else {
            None
        }
    }
}
