#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Scrapline engine.
//!
//! This crate defines the message surface that connects the authoritative
//! world, the pure decision systems, and the network boundary. Systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what actually happened. Decision systems consume immutable
//! snapshot views and respond exclusively with new command batches or action
//! requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default health ceiling assigned to freshly spawned agents.
pub const DEFAULT_MAX_HEALTH: f32 = 100.0;

/// Unique identifier assigned to an agent.
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

/// Location of a single grid cell expressed as signed x and y coordinates.
///
/// Coordinates are signed because perception noise may report positions that
/// lie outside the world bounds; the authoritative world never stores an
/// out-of-bounds position.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GridPos {
    x: i32,
    y: i32,
}

impl GridPos {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the position shifted by the provided deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Computes the Manhattan distance between two positions.
    #[must_use]
    pub fn manhattan_distance(self, other: GridPos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Computes the Chebyshev distance between two positions.
    #[must_use]
    pub fn chebyshev_distance(self, other: GridPos) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Computes the Euclidean distance between two positions.
    #[must_use]
    pub fn euclidean_distance(self, other: GridPos) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Cardinal movement directions available to agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing y coordinates.
    North,
    /// Movement toward increasing x coordinates.
    East,
    /// Movement toward increasing y coordinates.
    South,
    /// Movement toward decreasing x coordinates.
    West,
}

impl Direction {
    /// All cardinal directions in a fixed evaluation order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit cell offset produced by stepping in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// Terrain classification assigned to every tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    /// Bare ground with the cheapest traversal cost.
    Floor,
    /// Light vegetation, marginally slower than floor.
    Grass,
    /// Soft ground that slows traversal noticeably.
    Mud,
    /// Shallow water, expensive but passable.
    Water,
    /// Rubble fields, expensive but passable.
    Rock,
    /// Impassable terrain; never walkable.
    Wall,
}

impl Terrain {
    /// Canonical movement cost for the terrain kind.
    ///
    /// Walls report a large sentinel cost; callers must consult
    /// [`Terrain::is_walkable`] before treating the cost as traversable.
    #[must_use]
    pub const fn movement_cost(self) -> f32 {
        match self {
            Self::Floor => 1.0,
            Self::Grass => 1.2,
            Self::Mud => 2.0,
            Self::Rock => 2.5,
            Self::Water => 3.0,
            Self::Wall => f32::INFINITY,
        }
    }

    /// Reports whether agents may occupy tiles of this terrain.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

/// Immutable description of a single grid tile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    terrain: Terrain,
    cost: f32,
}

impl Tile {
    /// Creates a tile using the canonical cost for its terrain.
    #[must_use]
    pub const fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            cost: terrain.movement_cost(),
        }
    }

    /// Terrain kind assigned to the tile.
    #[must_use]
    pub const fn terrain(&self) -> Terrain {
        self.terrain
    }

    /// Movement cost charged for entering the tile.
    #[must_use]
    pub const fn cost(&self) -> f32 {
        self.cost
    }

    /// Reports whether agents may occupy the tile.
    #[must_use]
    pub const fn is_walkable(&self) -> bool {
        self.terrain.is_walkable()
    }
}

/// Kinds of collectible resources scattered across the world.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Restores health when eaten.
    Food,
    /// Restocks the agent's weapon.
    Ammo,
    /// Currency spent on upgrades.
    Scrap,
}

/// Immutable description of a resource entity placed on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Cell the resource occupies.
    pub position: GridPos,
    /// Kind of resource available for collection.
    pub kind: ResourceKind,
    /// Units granted when the resource is collected.
    pub amount: u32,
}

/// Kinds of permanent upgrades agents may purchase.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpgradeKind {
    /// Raises the agent's health ceiling.
    MaxHealth,
    /// Raises the damage inflicted per attack.
    WeaponDamage,
}

/// Behavioral modes an agent's controller may occupy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BehaviorTag {
    /// Roam the map collecting resources. Initial state.
    Scavenge,
    /// Engage the nearest living rival.
    Fight,
    /// Retreat from known threats until recovered.
    Flee,
    /// Consume held food to restore health.
    Eat,
    /// Spend scrap on the cheapest affordable upgrade.
    Upgrade,
}

impl BehaviorTag {
    /// Canonical uppercase name used in logs and wire payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scavenge => "SCAVENGE",
            Self::Fight => "FIGHT",
            Self::Flee => "FLEE",
            Self::Eat => "EAT",
            Self::Upgrade => "UPGRADE",
        }
    }

    /// Resolves a state name to its tag, rejecting unknown names.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SCAVENGE" => Some(Self::Scavenge),
            "FIGHT" => Some(Self::Fight),
            "FLEE" => Some(Self::Flee),
            "EAT" => Some(Self::Eat),
            "UPGRADE" => Some(Self::Upgrade),
            _ => None,
        }
    }
}

/// Discrete actions an agent may propose to the authoritative world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Spend one ammo to damage a rival within range.
    Attack,
    /// Collect the resource under the agent.
    Scavenge,
    /// Consume one held food unit.
    Eat,
    /// Purchase the requested upgrade kind.
    Upgrade,
}

/// One agent's proposed mutation for a single tick.
///
/// Every field is optional; a request with all fields empty is a valid no-op
/// tick. At most one action and one move are honoured per request.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionRequest {
    /// Discrete action proposed for this tick, if any.
    pub action: Option<ActionKind>,
    /// Destination cell proposed for this tick, if any.
    pub position: Option<GridPos>,
    /// Rival targeted by an attack action.
    pub target: Option<AgentId>,
    /// Upgrade kind named by an upgrade action.
    pub upgrade: Option<UpgradeKind>,
}

impl ActionRequest {
    /// Creates a request that proposes no mutation at all.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            action: None,
            position: None,
            target: None,
            upgrade: None,
        }
    }

    /// Reports whether the request proposes no mutation.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.action.is_none() && self.position.is_none()
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the world's tile grid with the provided layout.
    ConfigureGrid {
        /// Number of tile columns.
        width: u32,
        /// Number of tile rows.
        height: u32,
        /// Row-major tile data; length must equal `width * height`.
        tiles: Vec<Tile>,
    },
    /// Spawns a new agent at the provided cell.
    SpawnAgent {
        /// Identifier assigned to the agent.
        agent: AgentId,
        /// Cell the agent initially occupies.
        position: GridPos,
        /// Starting health value.
        health: f32,
        /// Starting ammo reserve.
        ammo: u32,
    },
    /// Places a resource entity on the grid.
    PlaceResource {
        /// Cell the resource occupies.
        position: GridPos,
        /// Kind of resource placed.
        kind: ResourceKind,
        /// Units granted on collection.
        amount: u32,
    },
    /// Advances the simulation clock by one fixed step.
    Tick,
    /// Validates and applies one agent's proposed action for this tick.
    ApplyAction {
        /// Agent submitting the request.
        agent: AgentId,
        /// Proposed mutation for the tick.
        request: ActionRequest,
    },
}

/// Reasons the authoritative world may reject a proposed action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionError {
    /// The submitting agent is unknown to the world.
    UnknownAgent,
    /// The submitting agent is dead and may not act.
    AgentDown,
    /// The proposed destination is more than one cell away.
    MoveTooFar,
    /// The proposed destination lies outside the grid.
    MoveOutOfBounds,
    /// The proposed destination is not walkable terrain.
    MoveBlocked,
    /// Another living agent already occupies the destination.
    MoveOccupied,
    /// The attack target is unknown or was never provided.
    UnknownTarget,
    /// The attack target is already dead.
    TargetAlreadyDown,
    /// The target lies beyond the weapon's range.
    AttackOutOfRange,
    /// The attacker has no ammo to spend.
    AttackWithoutAmmo,
    /// No resource occupies the agent's cell.
    NothingToScavenge,
    /// The agent holds no food to eat.
    NoFoodHeld,
    /// No upgrade of the requested kind is affordable.
    NoAffordableUpgrade,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Tick index after the advance.
        tick: u64,
    },
    /// Confirms that an agent entered the world.
    AgentSpawned {
        /// Identifier of the new agent.
        agent: AgentId,
        /// Cell the agent occupies after spawning.
        position: GridPos,
    },
    /// Confirms that an agent moved between two cells.
    AgentMoved {
        /// Identifier of the agent that moved.
        agent: AgentId,
        /// Cell the agent occupied before moving.
        from: GridPos,
        /// Cell the agent occupies after moving.
        to: GridPos,
    },
    /// Reports that a proposed action was rejected.
    ActionRejected {
        /// Agent whose request failed validation.
        agent: AgentId,
        /// Specific reason the request was rejected.
        reason: ActionError,
    },
    /// Confirms that an agent collected a resource.
    ResourceCollected {
        /// Agent that collected the resource.
        agent: AgentId,
        /// Cell the resource occupied.
        position: GridPos,
        /// Kind of resource collected.
        kind: ResourceKind,
        /// Units added to the agent's inventory.
        amount: u32,
    },
    /// Confirms that a resource entered the world.
    ResourceSpawned {
        /// Cell the resource occupies.
        position: GridPos,
        /// Kind of resource placed.
        kind: ResourceKind,
        /// Units granted on collection.
        amount: u32,
    },
    /// Confirms that an attack landed.
    AgentAttacked {
        /// Agent that spent the ammo.
        attacker: AgentId,
        /// Agent that absorbed the damage.
        target: AgentId,
        /// Damage inflicted after upgrade modifiers.
        damage: f32,
        /// Target health remaining after the hit.
        remaining: f32,
    },
    /// Confirms that an agent consumed one food unit.
    AgentAte {
        /// Agent that ate.
        agent: AgentId,
        /// Health value after the meal.
        health: f32,
    },
    /// Confirms that an agent purchased an upgrade.
    AgentUpgraded {
        /// Agent that paid for the upgrade.
        agent: AgentId,
        /// Kind of upgrade purchased.
        kind: UpgradeKind,
        /// Level reached after the purchase.
        level: u32,
    },
    /// Announces that an agent's health reached zero.
    AgentDied {
        /// Agent that died.
        agent: AgentId,
    },
    /// Announces the end of the match. Emitted at most once.
    GameOver {
        /// Last agent standing, or `None` when nobody survived.
        winner: Option<AgentId>,
    },
}

/// Mutable value state of a single agent.
///
/// The world owns one `AgentState` per live agent (single-writer); the
/// reconciliation layer owns a second, shadow copy per networked controller.
/// All mutators preserve the core invariants: health stays within
/// `[0, max_health]`, ammo and inventory counts never go negative, and the
/// path cursor never passes the end of the path.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentState {
    id: AgentId,
    position: GridPos,
    health: f32,
    max_health: f32,
    ammo: u32,
    inventory: BTreeMap<ResourceKind, u32>,
    upgrades: BTreeMap<UpgradeKind, u32>,
    path: Vec<GridPos>,
    path_cursor: usize,
    behavior: BehaviorTag,
}

impl AgentState {
    /// Creates a new agent with full default health ceiling.
    #[must_use]
    pub fn new(id: AgentId, position: GridPos, health: f32, ammo: u32) -> Self {
        Self {
            id,
            position,
            health: health.clamp(0.0, DEFAULT_MAX_HEALTH),
            max_health: DEFAULT_MAX_HEALTH,
            ammo,
            inventory: BTreeMap::new(),
            upgrades: BTreeMap::new(),
            path: Vec::new(),
            path_cursor: 0,
            behavior: BehaviorTag::Scavenge,
        }
    }

    /// Identifier assigned to the agent.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Cell the agent currently occupies.
    #[must_use]
    pub const fn position(&self) -> GridPos {
        self.position
    }

    /// Moves the agent to the provided cell.
    pub fn set_position(&mut self, position: GridPos) {
        self.position = position;
    }

    /// Current health value.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Health ceiling the agent may recover to.
    #[must_use]
    pub const fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Overwrites health, clamping into `[0, max_health]`.
    pub fn set_health(&mut self, health: f32) {
        self.health = health.clamp(0.0, self.max_health);
    }

    /// Overwrites the health ceiling, re-clamping current health.
    pub fn set_max_health(&mut self, max_health: f32) {
        self.max_health = max_health.max(0.0);
        self.health = self.health.clamp(0.0, self.max_health);
    }

    /// Raises the health ceiling by the provided amount.
    pub fn raise_max_health(&mut self, amount: f32) {
        self.set_max_health(self.max_health + amount.max(0.0));
    }

    /// Reduces health by the provided amount, clamping at zero.
    pub fn apply_damage(&mut self, amount: f32) {
        self.health = (self.health - amount.max(0.0)).max(0.0);
    }

    /// Restores health by the provided amount, clamping at the ceiling.
    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount.max(0.0)).min(self.max_health);
    }

    /// Reports whether the agent is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Current ammo reserve.
    #[must_use]
    pub const fn ammo(&self) -> u32 {
        self.ammo
    }

    /// Overwrites the ammo reserve.
    pub fn set_ammo(&mut self, ammo: u32) {
        self.ammo = ammo;
    }

    /// Adds ammo to the reserve.
    pub fn add_ammo(&mut self, amount: u32) {
        self.ammo = self.ammo.saturating_add(amount);
    }

    /// Spends one ammo unit, reporting whether any was available.
    pub fn spend_ammo(&mut self) -> bool {
        if self.ammo == 0 {
            return false;
        }
        self.ammo -= 1;
        true
    }

    /// Units of the provided resource currently held.
    #[must_use]
    pub fn inventory_count(&self, kind: ResourceKind) -> u32 {
        self.inventory.get(&kind).copied().unwrap_or(0)
    }

    /// Adds resource units to the inventory.
    pub fn add_resource(&mut self, kind: ResourceKind, amount: u32) {
        let slot = self.inventory.entry(kind).or_insert(0);
        *slot = slot.saturating_add(amount);
    }

    /// Removes resource units, reporting whether enough were held.
    pub fn remove_resource(&mut self, kind: ResourceKind, amount: u32) -> bool {
        let held = self.inventory_count(kind);
        if held < amount {
            return false;
        }
        if let Some(slot) = self.inventory.get_mut(&kind) {
            *slot = held - amount;
        }
        true
    }

    /// Read-only view of the full inventory in deterministic order.
    #[must_use]
    pub const fn inventory(&self) -> &BTreeMap<ResourceKind, u32> {
        &self.inventory
    }

    /// Replaces the full inventory with authoritative contents.
    pub fn overwrite_inventory(&mut self, inventory: BTreeMap<ResourceKind, u32>) {
        self.inventory = inventory;
    }

    /// Level reached for the provided upgrade kind (zero when unowned).
    #[must_use]
    pub fn upgrade_level(&self, kind: UpgradeKind) -> u32 {
        self.upgrades.get(&kind).copied().unwrap_or(0)
    }

    /// Raises the upgrade level by one, returning the new level.
    pub fn raise_upgrade(&mut self, kind: UpgradeKind) -> u32 {
        let slot = self.upgrades.entry(kind).or_insert(0);
        *slot = slot.saturating_add(1);
        *slot
    }

    /// Planned path the agent intends to follow.
    #[must_use]
    pub fn path(&self) -> &[GridPos] {
        &self.path
    }

    /// Cursor index of the next unvisited path cell.
    #[must_use]
    pub const fn path_cursor(&self) -> usize {
        self.path_cursor
    }

    /// Replaces the active path, resetting the cursor.
    pub fn set_path(&mut self, path: Vec<GridPos>) {
        self.path = path;
        self.path_cursor = 0;
    }

    /// Discards the active path entirely.
    pub fn clear_path(&mut self) {
        self.path.clear();
        self.path_cursor = 0;
    }

    /// Next unvisited path cell, if the path has one.
    #[must_use]
    pub fn next_path_cell(&self) -> Option<GridPos> {
        self.path.get(self.path_cursor).copied()
    }

    /// Advances the cursor past a confirmed cell, saturating at the end.
    pub fn advance_path_cursor(&mut self) {
        if self.path_cursor < self.path.len() {
            self.path_cursor += 1;
        }
    }

    /// Behavioral mode the agent's controller currently occupies.
    #[must_use]
    pub const fn behavior(&self) -> BehaviorTag {
        self.behavior
    }

    /// Records the controller's current behavioral mode.
    pub fn set_behavior(&mut self, behavior: BehaviorTag) {
        self.behavior = behavior;
    }

    /// Captures an immutable snapshot of the agent's public state.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            position: self.position,
            health: self.health,
            max_health: self.max_health,
            ammo: self.ammo,
        }
    }
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Cell currently occupied by the agent.
    pub position: GridPos,
    /// Current health value.
    pub health: f32,
    /// Health ceiling the agent may recover to.
    pub max_health: f32,
    /// Current ammo reserve.
    pub ammo: u32,
}

impl AgentSnapshot {
    /// Reports whether the captured agent was alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// Read-only snapshot describing all agents within the world.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot captured for the provided agent, if it exists.
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

/// Read-only snapshot describing all resources placed on the grid.
#[derive(Clone, Debug, Default)]
pub struct ResourceView {
    snapshots: Vec<ResourceSnapshot>,
}

impl ResourceView {
    /// Creates a new resource view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ResourceSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.position);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceSnapshot> {
        self.snapshots.iter()
    }

    /// Resource captured at the provided cell, if any.
    #[must_use]
    pub fn at(&self, position: GridPos) -> Option<&ResourceSnapshot> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.position == position)
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ResourceSnapshot> {
        self.snapshots
    }
}

/// Fixed-capacity iterator over the cardinal neighbors of a cell.
#[derive(Clone, Copy, Debug, Default)]
pub struct Neighbors {
    buffer: [Option<GridPos>; 4],
    len: usize,
    cursor: usize,
}

impl Neighbors {
    /// Appends a neighbor, ignoring pushes past capacity.
    pub fn push(&mut self, cell: GridPos) {
        if self.len < self.buffer.len() {
            self.buffer[self.len] = Some(cell);
            self.len += 1;
        }
    }
}

impl Iterator for Neighbors {
    type Item = GridPos;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.len {
            return None;
        }
        let value = self.buffer[self.cursor];
        self.cursor += 1;
        value
    }
}

/// Oracle over the world grid consumed by planners and searches.
///
/// Implemented by the authoritative world's navigation view and by test
/// fixtures; decision systems never see the world struct itself.
pub trait WorldProvider {
    /// Enumerates the walkable cardinal neighbors of the provided cell.
    fn neighbors(&self, position: GridPos) -> Neighbors;

    /// Movement cost charged for entering the provided cell.
    fn cost(&self, position: GridPos) -> f32;

    /// Reports whether the provided cell is inside the grid and walkable.
    fn is_walkable(&self, position: GridPos) -> bool;

    /// Resource currently occupying the provided cell, if any.
    fn resource_at(&self, position: GridPos) -> Option<ResourceSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = GridPos::new(1, 1);
        let destination = GridPos::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn chebyshev_distance_takes_the_larger_axis() {
        let origin = GridPos::new(0, 0);
        assert_eq!(origin.chebyshev_distance(GridPos::new(3, -2)), 3);
        assert_eq!(origin.chebyshev_distance(GridPos::new(-1, 5)), 5);
    }

    #[test]
    fn damage_clamps_health_at_zero() {
        let mut agent = AgentState::new(AgentId::new(1), GridPos::new(0, 0), 25.0, 0);
        agent.apply_damage(40.0);
        assert_eq!(agent.health(), 0.0);
        assert!(!agent.is_alive());
    }

    #[test]
    fn healing_never_exceeds_the_ceiling() {
        let mut agent = AgentState::new(AgentId::new(1), GridPos::new(0, 0), 90.0, 0);
        agent.heal(50.0);
        assert_eq!(agent.health(), agent.max_health());
    }

    #[test]
    fn inventory_counts_never_go_negative() {
        let mut agent = AgentState::new(AgentId::new(1), GridPos::new(0, 0), 100.0, 0);
        agent.add_resource(ResourceKind::Scrap, 3);
        assert!(!agent.remove_resource(ResourceKind::Scrap, 5));
        assert_eq!(agent.inventory_count(ResourceKind::Scrap), 3);
        assert!(agent.remove_resource(ResourceKind::Scrap, 3));
        assert_eq!(agent.inventory_count(ResourceKind::Scrap), 0);
    }

    #[test]
    fn path_cursor_saturates_at_path_end() {
        let mut agent = AgentState::new(AgentId::new(1), GridPos::new(0, 0), 100.0, 0);
        agent.set_path(vec![GridPos::new(1, 0), GridPos::new(2, 0)]);
        agent.advance_path_cursor();
        agent.advance_path_cursor();
        agent.advance_path_cursor();
        assert_eq!(agent.path_cursor(), 2);
        assert_eq!(agent.next_path_cell(), None);
    }

    #[test]
    fn spending_ammo_at_zero_is_rejected() {
        let mut agent = AgentState::new(AgentId::new(1), GridPos::new(0, 0), 100.0, 1);
        assert!(agent.spend_ammo());
        assert!(!agent.spend_ammo());
        assert_eq!(agent.ammo(), 0);
    }

    #[test]
    fn behavior_tag_parses_canonical_names_only() {
        assert_eq!(BehaviorTag::from_name("FIGHT"), Some(BehaviorTag::Fight));
        assert_eq!(BehaviorTag::from_name("fight"), None);
        assert_eq!(BehaviorTag::from_name("PANIC"), None);
        assert_eq!(BehaviorTag::Scavenge.as_str(), "SCAVENGE");
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
    fn wire_adjacent_types_round_trip_through_bincode() {
        assert_round_trip(&AgentId::new(42));
        assert_round_trip(&GridPos::new(-3, 17));
        assert_round_trip(&Tile::new(Terrain::Mud));
        assert_round_trip(&ResourceSnapshot {
            position: GridPos::new(4, 4),
            kind: ResourceKind::Ammo,
            amount: 7,
        });
    }
}
