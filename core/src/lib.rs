#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Spire Alchemist engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::borrow::Cow;
use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to the Spire.";

/// Cost of a single straight step in pathfinding units.
pub const STEP_COST: u32 = 10;

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Row zero is the surface of the spire; rows grow downward into the rock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Reports whether two cells are cardinal neighbors.
    #[must_use]
    pub fn is_adjacent_to(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// Coordinate of the neighboring cell in the given direction.
    ///
    /// Returns `None` when the step would leave the non-negative coordinate
    /// space; upper bounds are the caller's concern.
    #[must_use]
    pub fn stepped(self, direction: Direction) -> Option<CellCoord> {
        let (column, row) = match direction {
            Direction::North => (Some(self.column), self.row.checked_sub(1)),
            Direction::East => (self.column.checked_add(1), Some(self.row)),
            Direction::South => (Some(self.column), self.row.checked_add(1)),
            Direction::West => (self.column.checked_sub(1), Some(self.row)),
        };
        match (column, row) {
            (Some(column), Some(row)) => Some(CellCoord::new(column, row)),
            _ => None,
        }
    }
}

/// Cardinal movement and facing directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing row indices, out of the rock.
    North,
    /// Toward increasing column indices.
    East,
    /// Toward increasing row indices, deeper into the rock.
    South,
    /// Toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction in clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Direction after a clockwise quarter turn.
    #[must_use]
    pub const fn turned_right(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Direction after a counter-clockwise quarter turn.
    #[must_use]
    pub const fn turned_left(self) -> Direction {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    /// Direction after a half turn.
    #[must_use]
    pub const fn reversed(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Direction of travel between two cardinal neighbors.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Direction> {
        let column_diff = from.column().abs_diff(to.column());
        let row_diff = from.row().abs_diff(to.row());
        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if to.column() > from.column() {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if to.row() > from.row() {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

/// Continuous world-space position of a cell or entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldPoint {
    x: f32,
    y: f32,
    z: f32,
}

impl WorldPoint {
    /// Creates a new world-space point.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Horizontal component.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical component; grows as the spire scrolls upward.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Depth component.
    #[must_use]
    pub const fn z(&self) -> f32 {
        self.z
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(&self, other: WorldPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Unique identifier assigned to a creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a resource pickup lying on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PickupId(u32);

impl PickupId {
    /// Creates a new pickup identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a summoning table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(u32);

impl TableId {
    /// Creates a new table identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Hit-point total carried by creatures and the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a new health value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric hit-point total.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Health remaining after absorbing the provided damage, floored at zero.
    #[must_use]
    pub const fn reduced_by(self, damage: u32) -> Health {
        Health(self.0.saturating_sub(damage))
    }

    /// Reports whether the hit-point total has reached zero.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }
}

/// Visual and gameplay material of a cell's terrain.
///
/// Distinct from [`BlockingKind`]: stone may be mined to become open without
/// the cell ever leaving the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockMaterial {
    /// Empty air; nothing to mine.
    None,
    /// Solid rock.
    Stone,
}

/// Resource embedded in a block, released as a pickup when mined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Crystal shards, the base alchemic reagent.
    Crystal,
    /// Gold nuggets.
    Gold,
    /// Living slime.
    Slime,
}

/// Per-cell walkability flag, independent of visual material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockingKind {
    /// The cell can be walked through.
    None,
    /// The cell blocks movement entirely.
    Full,
}

/// Inclusive depth band within which a block template may spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthRange {
    min: u32,
    max: u32,
}

impl DepthRange {
    /// Creates a new inclusive depth range.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Shallowest depth at which the template may spawn.
    #[must_use]
    pub const fn min(&self) -> u32 {
        self.min
    }

    /// Deepest depth at which the template may spawn.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Reports whether the provided depth lies inside the band.
    #[must_use]
    pub const fn contains(&self, depth: u32) -> bool {
        self.min <= depth && depth <= self.max
    }
}

/// Index of a block template within the world's shared catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(u16);

impl BlockId {
    /// Creates a new block template identifier.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

/// Immutable block template shared by every cell that references it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockTemplate {
    /// Terrain material assigned to cells using this template.
    pub material: BlockMaterial,
    /// Resource released when a cell using this template is mined.
    pub resource: Option<ResourceKind>,
    /// Walkability of cells using this template.
    pub blocking: BlockingKind,
    /// Whether mining may clear this template from a cell.
    pub destructible: bool,
    /// Depth band within which generation may select this template.
    pub depths: DepthRange,
    /// Relative likelihood scale fed into the spawn weight curve.
    pub weight_factor: f32,
}

impl BlockTemplate {
    /// Spawn weight of this template at the given depth.
    ///
    /// The weight follows a tent curve over the template's depth band: it
    /// peaks at the band's midpoint and falls off toward one percent of the
    /// weight factor at either edge. Depths outside the band weigh nothing.
    #[must_use]
    pub fn spawn_weight(&self, depth: u32) -> f32 {
        if !self.depths.contains(depth) {
            return 0.0;
        }

        let min = self.depths.min() as f64;
        let max = self.depths.max() as f64;
        let h = f64::from(depth);
        let span = max - min;
        if span <= 0.0 {
            return self.weight_factor.max(0.0);
        }

        let offset = ((max - h) + (min - h)).abs() / span;
        let weight = (1.0 - offset * 0.99) * f64::from(self.weight_factor);
        weight.max(0.0) as f32
    }

    /// Reports whether generation may ever select this template.
    #[must_use]
    pub fn is_spawnable(&self) -> bool {
        self.weight_factor > 0.0
    }
}

/// Allegiance tag carried by every creature and the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// The alchemist controlled by input.
    Player,
    /// Creatures summoned at alchemy tables.
    Summon,
    /// Creatures invading the spire.
    Enemy,
}

bitflags! {
    /// Set of factions used to filter sight candidates.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FactionMask: u8 {
        /// Matches the player.
        const PLAYER = 1 << 0;
        /// Matches summoned creatures.
        const SUMMON = 1 << 1;
        /// Matches invaders.
        const ENEMY = 1 << 2;
    }
}

impl Faction {
    /// Mask bit matching exactly this faction.
    #[must_use]
    pub const fn mask(self) -> FactionMask {
        match self {
            Faction::Player => FactionMask::PLAYER,
            Faction::Summon => FactionMask::SUMMON,
            Faction::Enemy => FactionMask::ENEMY,
        }
    }

    /// Factions this faction treats as enemies on sight.
    #[must_use]
    pub const fn hostile_mask(self) -> FactionMask {
        match self {
            Faction::Player | Faction::Summon => FactionMask::ENEMY,
            Faction::Enemy => FactionMask::PLAYER.union(FactionMask::SUMMON),
        }
    }

    /// Fixed target-priority rank; higher ranks are never overwritten by
    /// lower-ranked sightings during an engagement.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Faction::Player => 2,
            Faction::Summon => 1,
            Faction::Enemy => 0,
        }
    }
}

/// Neighbor legality rule applied during path search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathMode {
    /// Only non-blocking cells are traversable.
    Standard,
    /// Every in-bounds cell is traversable, walls included.
    Phasing,
    /// Non-blocking cells plus the search goal itself; endpoints may be
    /// blocked, letting the path terminate inside an obstacle.
    Breach,
}

/// Combat capability attached to an archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatStyle {
    /// Strikes an adjacent target on an attack cadence.
    Melee,
    /// Damage ticks only accrue while continuously adjacent to the target.
    Attach,
    /// Strikes along an unobstructed straight line within sight range.
    Ranged,
    /// Mines blocking cells along its path instead of fighting creatures.
    Breacher,
    /// Never attacks; flees to the surface when threatened.
    Pacifist,
}

/// Idle movement policy attached to an archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoamStyle {
    /// Uniform random walk over legal neighbor cells.
    RandomWalk,
    /// Hug-the-wall loop: try a right turn, then forward, then left, then
    /// reverse, stepping into the first open cell.
    WallHug,
    /// Ferry loop hauling gold pickups to alchemy tables.
    Ferry,
}

/// Behavior state advertised by a creature's state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentState {
    /// Idle wandering; no path or engagement held.
    Roaming,
    /// Following a computed path toward a target.
    Pursuing,
    /// Engaged with an enemy within attack parameters.
    InCombat,
    /// Suspended while returning to an entrance cell after a grid scroll.
    ReturningToGrid,
    /// Terminal state; the roster entry lingers only for the removal grace.
    Dead,
}

/// Non-owning reference to something a creature can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetRef {
    /// A creature identified by its roster id.
    Agent(AgentId),
    /// The single player entity.
    Player,
}

/// Creature archetype: a fixed behavioral parameter set.
///
/// The discriminant order doubles as the summoning-table outcome index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Clinging blob that damages whatever it stays attached to.
    Slime,
    /// Phasing spirit that ignores walls entirely.
    Ghost,
    /// Heavy bruiser that patrols along walls.
    Golem,
    /// Wall-breaker that digs straight toward its quarry.
    Gargoyle,
    /// Harmless hauler that ferries gold to alchemy tables.
    Drone,
    /// Ranged matriarch with strict target priorities.
    Queen,
}

impl Archetype {
    /// Every archetype in outcome-index order.
    pub const ALL: [Archetype; 6] = [
        Archetype::Slime,
        Archetype::Ghost,
        Archetype::Golem,
        Archetype::Gargoyle,
        Archetype::Drone,
        Archetype::Queen,
    ];

    /// Outcome index of this archetype in the summoning lookup.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Archetype::Slime => 0,
            Archetype::Ghost => 1,
            Archetype::Golem => 2,
            Archetype::Gargoyle => 3,
            Archetype::Drone => 4,
            Archetype::Queen => 5,
        }
    }

    /// Archetype produced by combining two resources at an alchemy table.
    ///
    /// The lookup is symmetric in its inputs: nine ordered combinations fold
    /// into six outcomes.
    #[must_use]
    pub const fn from_resource_pair(first: ResourceKind, second: ResourceKind) -> Archetype {
        use ResourceKind::{Crystal, Gold, Slime};
        match (first, second) {
            (Crystal, Crystal) => Archetype::Slime,
            (Crystal, Gold) | (Gold, Crystal) => Archetype::Ghost,
            (Gold, Gold) => Archetype::Golem,
            (Crystal, Slime) | (Slime, Crystal) => Archetype::Gargoyle,
            (Gold, Slime) | (Slime, Gold) => Archetype::Drone,
            (Slime, Slime) => Archetype::Queen,
        }
    }

    /// Fixed behavioral parameter set for this archetype.
    #[must_use]
    pub const fn profile(self) -> ArchetypeProfile {
        match self {
            Archetype::Slime => ArchetypeProfile {
                max_health: Health::new(6),
                damage: 2,
                sight_range: 4,
                move_interval: Duration::from_millis(600),
                attack_interval: Duration::from_millis(900),
                traversal: PathMode::Standard,
                combat: CombatStyle::Attach,
                roam: RoamStyle::RandomWalk,
            },
            Archetype::Ghost => ArchetypeProfile {
                max_health: Health::new(4),
                damage: 3,
                sight_range: 5,
                move_interval: Duration::from_millis(450),
                attack_interval: Duration::from_millis(1100),
                traversal: PathMode::Phasing,
                combat: CombatStyle::Melee,
                roam: RoamStyle::RandomWalk,
            },
            Archetype::Golem => ArchetypeProfile {
                max_health: Health::new(14),
                damage: 4,
                sight_range: 4,
                move_interval: Duration::from_millis(900),
                attack_interval: Duration::from_millis(1300),
                traversal: PathMode::Standard,
                combat: CombatStyle::Melee,
                roam: RoamStyle::WallHug,
            },
            Archetype::Gargoyle => ArchetypeProfile {
                max_health: Health::new(10),
                damage: 3,
                sight_range: 6,
                move_interval: Duration::from_millis(800),
                attack_interval: Duration::from_millis(1000),
                traversal: PathMode::Breach,
                combat: CombatStyle::Breacher,
                roam: RoamStyle::WallHug,
            },
            Archetype::Drone => ArchetypeProfile {
                max_health: Health::new(5),
                damage: 0,
                sight_range: 5,
                move_interval: Duration::from_millis(500),
                attack_interval: Duration::from_millis(1000),
                traversal: PathMode::Standard,
                combat: CombatStyle::Pacifist,
                roam: RoamStyle::Ferry,
            },
            Archetype::Queen => ArchetypeProfile {
                max_health: Health::new(8),
                damage: 3,
                sight_range: 7,
                move_interval: Duration::from_millis(700),
                attack_interval: Duration::from_millis(1200),
                traversal: PathMode::Standard,
                combat: CombatStyle::Ranged,
                roam: RoamStyle::RandomWalk,
            },
        }
    }
}

/// Fixed behavioral parameters shared by every creature of an archetype.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArchetypeProfile {
    /// Hit points a freshly spawned creature carries.
    pub max_health: Health,
    /// Damage dealt per completed strike.
    pub damage: u32,
    /// Sight radius in Manhattan cells.
    pub sight_range: u32,
    /// Simulated time required between successive steps.
    pub move_interval: Duration,
    /// Simulated time required between successive strikes.
    pub attack_interval: Duration,
    /// Neighbor legality rule used when planning paths.
    pub traversal: PathMode,
    /// Combat capability.
    pub combat: CombatStyle,
    /// Idle movement policy.
    pub roam: RoamStyle,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Scrolls the grid upward, discarding surface rows and exposing rock.
    ScrollGrid {
        /// Number of rows to shift.
        rows: u32,
    },
    /// Clears the block at a cell, releasing any embedded resource.
    MineCell {
        /// Cell whose block should be mined away.
        cell: CellCoord,
    },
    /// Places a summoning table onto an open cell, blocking it for building.
    PlaceTable {
        /// Cell the table should occupy.
        cell: CellCoord,
    },
    /// Removes an existing summoning table, reopening its cell.
    RemoveTable {
        /// Identifier of the table targeted for removal.
        table: TableId,
    },
    /// Spawns a creature at the provided cell.
    SpawnAgent {
        /// Archetype of the creature to create.
        archetype: Archetype,
        /// Allegiance assigned to the creature.
        faction: Faction,
        /// Cell the creature should occupy after spawning.
        cell: CellCoord,
    },
    /// Places the player entity onto the grid.
    SpawnPlayer {
        /// Cell the player should occupy.
        cell: CellCoord,
    },
    /// Requests that the player advance one step in a direction.
    StepPlayer {
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
    /// Replaces a creature's queued path with a freshly planned one.
    SetAgentPath {
        /// Identifier of the creature receiving the path.
        agent: AgentId,
        /// Path cells ordered nearest-first, goal last.
        path: Vec<CellCoord>,
    },
    /// Requests that a creature advance a single step in a direction.
    StepAgent {
        /// Identifier of the creature attempting to move.
        agent: AgentId,
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
    /// Rotates a creature in place without moving it.
    FaceAgent {
        /// Identifier of the creature to rotate.
        agent: AgentId,
        /// New facing direction.
        direction: Direction,
    },
    /// Locks a creature onto a combat target.
    EngageTarget {
        /// Identifier of the engaging creature.
        agent: AgentId,
        /// Target being engaged.
        target: TargetRef,
    },
    /// Clears a creature's combat target and resets its attack cadence.
    Disengage {
        /// Identifier of the disengaging creature.
        agent: AgentId,
    },
    /// Executes a strike from an attacker against its engaged target.
    Strike {
        /// Identifier of the attacking creature.
        attacker: AgentId,
        /// Target absorbing the strike.
        target: TargetRef,
    },
    /// Picks a resource off the ground into a creature's hands.
    PickUpResource {
        /// Identifier of the collecting creature.
        agent: AgentId,
        /// Pickup being collected.
        pickup: PickupId,
    },
    /// Delivers a creature's carried resource into an adjacent table.
    DeliverResource {
        /// Identifier of the delivering creature.
        agent: AgentId,
        /// Table receiving the resource.
        table: TableId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces a completed upward scroll of the grid.
    GridScrolled {
        /// World-space displacement applied to every surviving cell.
        move_by: WorldPoint,
        /// Duration an adapter should spend animating the shift.
        duration: Duration,
        /// Number of rows shifted.
        rows: u32,
    },
    /// Confirms that a cell's block was mined away.
    CellMined {
        /// Cell that was cleared.
        cell: CellCoord,
        /// Resource the block released, if it embedded one.
        resource: Option<ResourceKind>,
    },
    /// Reports that a mining request was rejected.
    MineRejected {
        /// Cell provided in the mining request.
        cell: CellCoord,
        /// Specific reason the request failed.
        reason: MineRejection,
    },
    /// Confirms that a resource pickup appeared on the grid.
    PickupSpawned {
        /// Identifier assigned to the pickup.
        pickup: PickupId,
        /// Resource the pickup carries.
        kind: ResourceKind,
        /// Cell the pickup rests on.
        cell: CellCoord,
    },
    /// Confirms that a creature collected a pickup.
    PickupCollected {
        /// Identifier of the collected pickup.
        pickup: PickupId,
        /// Creature now carrying the resource.
        agent: AgentId,
    },
    /// Reports that a pickup scrolled off the grid and was lost.
    PickupExpired {
        /// Identifier of the lost pickup.
        pickup: PickupId,
    },
    /// Confirms that a summoning table was placed.
    TablePlaced {
        /// Identifier assigned to the table.
        table: TableId,
        /// Cell the table occupies.
        cell: CellCoord,
    },
    /// Reports that a table placement request was rejected.
    TablePlacementRejected {
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: TableRejection,
    },
    /// Confirms that a summoning table was removed.
    TableRemoved {
        /// Identifier of the removed table.
        table: TableId,
    },
    /// Confirms that a resource entered a table's reservoir.
    ResourceDelivered {
        /// Table that received the resource.
        table: TableId,
        /// Resource that was delivered.
        kind: ResourceKind,
    },
    /// Announces that a table holds a complete resource pair.
    ///
    /// The reservoir empties as part of this announcement; the summoning
    /// system owns the resulting spawn.
    TableReady {
        /// Table whose reservoir filled.
        table: TableId,
        /// First delivered resource.
        first: ResourceKind,
        /// Second delivered resource.
        second: ResourceKind,
    },
    /// Confirms that a creature entered the world.
    AgentSpawned {
        /// Identifier assigned to the creature.
        agent: AgentId,
        /// Archetype of the creature.
        archetype: Archetype,
        /// Allegiance of the creature.
        faction: Faction,
        /// Cell the creature occupies.
        cell: CellCoord,
    },
    /// Reports that a path assignment was rejected as illegal.
    AgentPathRejected {
        /// Creature whose path was rejected.
        agent: AgentId,
    },
    /// Confirms that a creature moved between two cells.
    AgentAdvanced {
        /// Identifier of the creature that advanced.
        agent: AgentId,
        /// Cell the creature occupied before moving.
        from: CellCoord,
        /// Cell the creature occupies after completing the move.
        to: CellCoord,
    },
    /// Confirms that a strike landed on a creature.
    AgentStruck {
        /// Identifier of the attacker.
        attacker: AgentId,
        /// Identifier of the struck creature.
        target: AgentId,
        /// Damage applied by the strike.
        damage: u32,
        /// Health remaining after the strike.
        remaining: Health,
    },
    /// Confirms that a strike landed on the player.
    PlayerStruck {
        /// Identifier of the attacker.
        attacker: AgentId,
        /// Damage applied by the strike.
        damage: u32,
        /// Health remaining after the strike.
        remaining: Health,
    },
    /// Announces that a creature's health reached zero.
    ///
    /// Emitted exactly once per creature; the roster entry lingers for the
    /// removal grace before [`Event::AgentRemoved`] follows.
    AgentDied {
        /// Identifier of the dead creature.
        agent: AgentId,
    },
    /// Confirms that a dead creature's roster entry was reclaimed.
    AgentRemoved {
        /// Identifier of the reclaimed creature.
        agent: AgentId,
    },
    /// Confirms that a scrolled-off creature was returned to an entrance.
    AgentDisplaced {
        /// Identifier of the displaced creature.
        agent: AgentId,
        /// Entrance cell the creature was placed on.
        to: CellCoord,
    },
    /// Confirms that the player entered the world.
    PlayerSpawned {
        /// Cell the player occupies.
        cell: CellCoord,
    },
    /// Confirms that the player moved between two cells.
    PlayerMoved {
        /// Cell the player occupied before moving.
        from: CellCoord,
        /// Cell the player occupies after the move.
        to: CellCoord,
    },
    /// Confirms that a scrolled-off player was returned to an entrance.
    PlayerDisplaced {
        /// Entrance cell the player was placed on.
        to: CellCoord,
    },
    /// Announces that the player's health reached zero.
    PlayerDied,
}

/// Reasons a mining request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MineRejection {
    /// The requested cell lies outside the grid.
    OutOfBounds,
    /// The cell's block template is not destructible.
    NotDestructible,
    /// The cell holds no material to mine.
    AlreadyOpen,
}

/// Reasons a table placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableRejection {
    /// The requested cell lies outside the grid.
    OutOfBounds,
    /// The cell's block is solid; tables need open ground.
    Blocked,
    /// A creature, the player, or another table already occupies the cell.
    Occupied,
}

/// Immutable representation of a single creature's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the creature.
    pub id: AgentId,
    /// Archetype of the creature.
    pub archetype: Archetype,
    /// Allegiance of the creature.
    pub faction: Faction,
    /// Grid cell currently occupied by the creature.
    pub cell: CellCoord,
    /// Direction the creature is facing.
    pub facing: Direction,
    /// Remaining hit points.
    pub health: Health,
    /// Behavior state advertised last tick.
    pub state: AgentState,
    /// Resource the creature is carrying, if any.
    pub carrying: Option<ResourceKind>,
    /// Combat target currently engaged, if any.
    pub engaged: Option<TargetRef>,
    /// Head of the queued path, if any.
    pub path_head: Option<CellCoord>,
    /// Indicates whether the creature accrued enough time to step.
    pub ready_to_move: bool,
    /// Indicates whether the creature accrued enough time to strike.
    pub ready_to_attack: bool,
}

/// Read-only snapshot describing all creatures in the world.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the creature with the provided id, if it is on the roster.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a pickup lying on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PickupSnapshot {
    /// Unique identifier assigned to the pickup.
    pub id: PickupId,
    /// Resource the pickup carries.
    pub kind: ResourceKind,
    /// Cell the pickup rests on.
    pub cell: CellCoord,
}

/// Read-only snapshot describing all pickups on the grid.
#[derive(Clone, Debug, Default)]
pub struct PickupView {
    snapshots: Vec<PickupSnapshot>,
}

impl PickupView {
    /// Creates a new view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<PickupSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &PickupSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<PickupSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a summoning table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSnapshot {
    /// Unique identifier assigned to the table.
    pub id: TableId,
    /// Cell the table occupies.
    pub cell: CellCoord,
    /// Resources currently held in the table's reservoir, at most two.
    pub held: Vec<ResourceKind>,
}

impl TableSnapshot {
    /// Reports whether the table can accept another resource.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.held.len() < 2
    }
}

/// Read-only snapshot describing all summoning tables.
#[derive(Clone, Debug, Default)]
pub struct TableView {
    snapshots: Vec<TableSnapshot>,
}

impl TableView {
    /// Creates a new view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TableSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TableSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TableSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of the player entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Grid cell currently occupied by the player.
    pub cell: CellCoord,
    /// Remaining hit points.
    pub health: Health,
}

/// Read-only view into the dense creature occupancy grid.
#[derive(Clone, Copy, Debug)]
pub struct OccupancyView<'a> {
    cells: &'a [Option<AgentId>],
    columns: u32,
    rows: u32,
}

impl<'a> OccupancyView<'a> {
    /// Captures a new occupancy view backed by the provided cell slice.
    #[must_use]
    pub fn new(cells: &'a [Option<AgentId>], columns: u32, rows: u32) -> Self {
        Self {
            cells,
            columns,
            rows,
        }
    }

    /// Returns the creature occupying the provided cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<AgentId> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    /// Reports whether the cell is currently free of creatures.
    #[must_use]
    pub fn is_free(&self, cell: CellCoord) -> bool {
        self.index(cell).map_or(true, |index| {
            self.cells.get(index).copied().unwrap_or(None).is_none()
        })
    }

    /// Provides the dimensions of the underlying occupancy grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Read-only view of per-cell walkability used by path search and sight.
#[derive(Clone, Debug)]
pub struct TerrainView<'a> {
    cells: Cow<'a, [BlockingKind]>,
    columns: u32,
    rows: u32,
}

impl<'a> TerrainView<'a> {
    /// Captures a view backed by a borrowed row-major blocking slice.
    #[must_use]
    pub fn from_slice(cells: &'a [BlockingKind], columns: u32, rows: u32) -> Self {
        Self {
            cells: Cow::Borrowed(cells),
            columns,
            rows,
        }
    }

    /// Captures a view that owns its blocking data.
    #[must_use]
    pub fn from_owned(cells: Vec<BlockingKind>, columns: u32, rows: u32) -> TerrainView<'static> {
        TerrainView {
            cells: Cow::Owned(cells),
            columns,
            rows,
        }
    }

    /// Reports whether the provided cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Blocking flag of the provided cell, if it lies inside the grid.
    #[must_use]
    pub fn blocking(&self, cell: CellCoord) -> Option<BlockingKind> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether the cell is in bounds and walkable.
    #[must_use]
    pub fn is_open(&self, cell: CellCoord) -> bool {
        matches!(self.blocking(cell), Some(BlockingKind::None))
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        Some(row * width + column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn stepped_underflow_returns_none() {
        let origin = CellCoord::new(0, 0);
        assert_eq!(origin.stepped(Direction::North), None);
        assert_eq!(origin.stepped(Direction::West), None);
        assert_eq!(origin.stepped(Direction::South), Some(CellCoord::new(0, 1)));
        assert_eq!(origin.stepped(Direction::East), Some(CellCoord::new(1, 0)));
    }

    #[test]
    fn direction_turns_compose() {
        for direction in Direction::ALL {
            assert_eq!(direction.turned_right().turned_left(), direction);
            assert_eq!(direction.reversed().reversed(), direction);
            assert_eq!(
                direction.turned_right().turned_right(),
                direction.reversed()
            );
        }
    }

    #[test]
    fn direction_between_neighbors() {
        let origin = CellCoord::new(3, 3);
        assert_eq!(
            Direction::between(origin, CellCoord::new(3, 2)),
            Some(Direction::North)
        );
        assert_eq!(
            Direction::between(origin, CellCoord::new(4, 3)),
            Some(Direction::East)
        );
        assert_eq!(
            Direction::between(origin, CellCoord::new(3, 4)),
            Some(Direction::South)
        );
        assert_eq!(
            Direction::between(origin, CellCoord::new(2, 3)),
            Some(Direction::West)
        );
        assert_eq!(Direction::between(origin, origin), None);
        assert_eq!(Direction::between(origin, CellCoord::new(5, 3)), None);
    }

    #[test]
    fn resource_pair_lookup_is_symmetric() {
        use ResourceKind::{Crystal, Gold, Slime};
        for first in [Crystal, Gold, Slime] {
            for second in [Crystal, Gold, Slime] {
                assert_eq!(
                    Archetype::from_resource_pair(first, second),
                    Archetype::from_resource_pair(second, first),
                );
            }
        }
    }

    #[test]
    fn gold_pair_produces_outcome_index_two() {
        let outcome = Archetype::from_resource_pair(ResourceKind::Gold, ResourceKind::Gold);
        assert_eq!(outcome.index(), 2);
        assert_eq!(outcome, Archetype::Golem);
    }

    #[test]
    fn resource_pairs_cover_all_outcomes() {
        use ResourceKind::{Crystal, Gold, Slime};
        let outcomes = [
            Archetype::from_resource_pair(Crystal, Crystal),
            Archetype::from_resource_pair(Crystal, Gold),
            Archetype::from_resource_pair(Gold, Gold),
            Archetype::from_resource_pair(Crystal, Slime),
            Archetype::from_resource_pair(Gold, Slime),
            Archetype::from_resource_pair(Slime, Slime),
        ];
        for (index, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.index(), index);
        }
    }

    #[test]
    fn spawn_weight_peaks_at_band_midpoint() {
        let template = BlockTemplate {
            material: BlockMaterial::Stone,
            resource: None,
            blocking: BlockingKind::Full,
            destructible: true,
            depths: DepthRange::new(0, 10),
            weight_factor: 4.0,
        };

        let mid = template.spawn_weight(5);
        let edge = template.spawn_weight(0);
        assert!((mid - 4.0).abs() < 1e-5);
        assert!((edge - 0.04).abs() < 1e-5);
        assert!(mid > edge);
    }

    #[test]
    fn spawn_weight_outside_band_is_zero() {
        let template = BlockTemplate {
            material: BlockMaterial::Stone,
            resource: Some(ResourceKind::Gold),
            blocking: BlockingKind::Full,
            destructible: true,
            depths: DepthRange::new(4, 9),
            weight_factor: 2.0,
        };

        assert_eq!(template.spawn_weight(3), 0.0);
        assert_eq!(template.spawn_weight(10), 0.0);
        assert!(template.spawn_weight(4) > 0.0);
    }

    #[test]
    fn health_floors_at_zero() {
        let health = Health::new(5);
        let struck = health.reduced_by(9);
        assert!(struck.is_depleted());
        assert_eq!(struck.get(), 0);
        assert!(!health.reduced_by(4).is_depleted());
    }

    #[test]
    fn hostile_masks_oppose_factions() {
        assert!(Faction::Enemy.hostile_mask().contains(FactionMask::PLAYER));
        assert!(Faction::Enemy.hostile_mask().contains(FactionMask::SUMMON));
        assert!(!Faction::Enemy.hostile_mask().contains(FactionMask::ENEMY));
        assert!(Faction::Summon.hostile_mask().contains(FactionMask::ENEMY));
        assert!(!Faction::Summon.hostile_mask().contains(FactionMask::PLAYER));
    }

    #[test]
    fn player_outranks_summons_for_targeting() {
        assert!(Faction::Player.priority() > Faction::Summon.priority());
        assert!(Faction::Summon.priority() > Faction::Enemy.priority());
    }

    #[test]
    fn terrain_view_reports_bounds_and_blocking() {
        let view = TerrainView::from_owned(
            vec![
                BlockingKind::None,
                BlockingKind::Full,
                BlockingKind::None,
                BlockingKind::None,
            ],
            2,
            2,
        );

        assert!(view.is_open(CellCoord::new(0, 0)));
        assert!(!view.is_open(CellCoord::new(1, 0)));
        assert_eq!(view.blocking(CellCoord::new(2, 0)), None);
        assert!(!view.contains(CellCoord::new(0, 2)));
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: serde::Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn cell_coord_round_trips_through_bincode() {
        assert_round_trip(&CellCoord::new(5, 7));
    }

    #[test]
    fn table_id_round_trips_through_bincode() {
        assert_round_trip(&TableId::new(42));
    }

    #[test]
    fn archetype_round_trips_through_bincode() {
        assert_round_trip(&Archetype::Gargoyle);
    }

    #[test]
    fn rejection_reasons_round_trip_through_bincode() {
        assert_round_trip(&MineRejection::NotDestructible);
        assert_round_trip(&TableRejection::Occupied);
    }
}
