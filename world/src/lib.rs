#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Scrapline.
//!
//! The world owns the tile grid, the resource entities, and the canonical
//! state of every agent. All mutation flows through [`apply`]: controllers
//! submit [`Command`] values, the world validates them against the current
//! state, and observers learn the outcome from the emitted [`Event`] stream.
//! Rejected actions are reported, never silently altered.

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use scrapline_core::{
    ActionError, ActionKind, ActionRequest, AgentId, AgentState, Command, Event, GridPos,
    Neighbors, ResourceKind, ResourceSnapshot, Terrain, Tile, UpgradeKind, WorldProvider,
};
use scrapline_system_economy::UpgradeCatalog;

/// Base damage inflicted by an attack before upgrade modifiers.
pub const BASE_ATTACK_DAMAGE: f32 = 10.0;
/// Extra damage granted per weapon upgrade level.
pub const DAMAGE_PER_WEAPON_LEVEL: f32 = 5.0;
/// Maximum Chebyshev distance at which an attack connects.
pub const ATTACK_RANGE: u32 = 5;
/// Health restored as a side effect of scavenging a food resource.
pub const SCAVENGE_FOOD_HEAL: f32 = 5.0;
/// Ammo granted as a side effect of scavenging an ammo resource.
pub const SCAVENGE_AMMO_BONUS: u32 = 10;
/// Health restored by consuming one held food unit.
pub const EAT_HEAL: f32 = 20.0;

const DROP_COOLDOWN_TICKS: u64 = 25;
const MIN_WORLD_RESOURCES: usize = 6;
const DROP_SPAWN_RADIUS: i32 = 7;
const INITIAL_DROP_BATCH: usize = 12;
const DROP_PLACEMENT_ATTEMPTS: usize = 50;
const DROP_FALLBACK_ATTEMPTS: usize = 200;

/// Represents the authoritative Scrapline world state.
#[derive(Debug)]
pub struct World {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    resources: Vec<ResourceSnapshot>,
    agents: Vec<AgentState>,
    catalog: UpgradeCatalog,
    rng: ChaCha8Rng,
    tick_index: u64,
    last_drop_tick: u64,
    match_active: bool,
    game_over: bool,
}

impl World {
    /// Creates an empty world whose drop replenishment follows `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            width: 0,
            height: 0,
            tiles: Vec::new(),
            resources: Vec::new(),
            agents: Vec::new(),
            catalog: UpgradeCatalog::standard(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick_index: 0,
            last_drop_tick: 0,
            match_active: false,
            game_over: false,
        }
    }

    fn tile_index(&self, position: GridPos) -> Option<usize> {
        if position.x() < 0 || position.y() < 0 {
            return None;
        }
        let x = u32::try_from(position.x()).ok()?;
        let y = u32::try_from(position.y()).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let row = usize::try_from(y).ok()?;
        let column = usize::try_from(x).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    fn tile_at(&self, position: GridPos) -> Option<Tile> {
        self.tile_index(position)
            .and_then(|index| self.tiles.get(index).copied())
    }

    fn is_walkable(&self, position: GridPos) -> bool {
        self.tile_at(position)
            .map_or(false, |tile| tile.is_walkable())
    }

    fn agent(&self, agent: AgentId) -> Option<&AgentState> {
        self.agents.iter().find(|state| state.id() == agent)
    }

    fn agent_mut(&mut self, agent: AgentId) -> Option<&mut AgentState> {
        self.agents.iter_mut().find(|state| state.id() == agent)
    }

    fn is_occupied_by_other(&self, position: GridPos, except: AgentId) -> bool {
        self.agents.iter().any(|state| {
            state.id() != except && state.is_alive() && state.position() == position
        })
    }

    fn resource_index_at(&self, position: GridPos) -> Option<usize> {
        self.resources
            .iter()
            .position(|resource| resource.position == position)
    }

    fn validate_move(&self, agent: &AgentState, destination: GridPos) -> Result<(), ActionError> {
        if agent.position().chebyshev_distance(destination) > 1 {
            return Err(ActionError::MoveTooFar);
        }
        let Some(tile) = self.tile_at(destination) else {
            return Err(ActionError::MoveOutOfBounds);
        };
        if !tile.is_walkable() {
            return Err(ActionError::MoveBlocked);
        }
        if self.is_occupied_by_other(destination, agent.id()) {
            return Err(ActionError::MoveOccupied);
        }
        Ok(())
    }

    fn apply_move(
        &mut self,
        agent_id: AgentId,
        destination: GridPos,
        out_events: &mut Vec<Event>,
    ) {
        let Some(agent) = self.agent(agent_id) else {
            return;
        };
        let from = agent.position();
        match self.validate_move(agent, destination) {
            Ok(()) => {
                if from != destination {
                    if let Some(agent) = self.agent_mut(agent_id) {
                        agent.set_position(destination);
                    }
                    out_events.push(Event::AgentMoved {
                        agent: agent_id,
                        from,
                        to: destination,
                    });
                }
            }
            Err(reason) => {
                debug!(
                    "agent {} move to ({}, {}) rejected: {reason:?}",
                    agent_id.get(),
                    destination.x(),
                    destination.y()
                );
                out_events.push(Event::ActionRejected {
                    agent: agent_id,
                    reason,
                });
            }
        }
    }

    fn apply_scavenge(&mut self, agent_id: AgentId, out_events: &mut Vec<Event>) {
        let Some(position) = self.agent(agent_id).map(AgentState::position) else {
            return;
        };
        let Some(index) = self.resource_index_at(position) else {
            out_events.push(Event::ActionRejected {
                agent: agent_id,
                reason: ActionError::NothingToScavenge,
            });
            return;
        };
        let resource = self.resources.remove(index);
        if let Some(agent) = self.agent_mut(agent_id) {
            agent.add_resource(resource.kind, resource.amount);
            match resource.kind {
                ResourceKind::Food => agent.heal(SCAVENGE_FOOD_HEAL),
                ResourceKind::Ammo => agent.add_ammo(SCAVENGE_AMMO_BONUS),
                ResourceKind::Scrap => {}
            }
        }
        out_events.push(Event::ResourceCollected {
            agent: agent_id,
            position,
            kind: resource.kind,
            amount: resource.amount,
        });
    }

    fn apply_attack(
        &mut self,
        attacker_id: AgentId,
        target: Option<AgentId>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(target_id) = target else {
            out_events.push(Event::ActionRejected {
                agent: attacker_id,
                reason: ActionError::UnknownTarget,
            });
            return;
        };
        let Some(target_state) = self.agent(target_id) else {
            out_events.push(Event::ActionRejected {
                agent: attacker_id,
                reason: ActionError::UnknownTarget,
            });
            return;
        };
        if !target_state.is_alive() {
            out_events.push(Event::ActionRejected {
                agent: attacker_id,
                reason: ActionError::TargetAlreadyDown,
            });
            return;
        }
        let target_position = target_state.position();

        let Some(attacker) = self.agent(attacker_id) else {
            return;
        };
        if attacker.position().chebyshev_distance(target_position) > ATTACK_RANGE {
            out_events.push(Event::ActionRejected {
                agent: attacker_id,
                reason: ActionError::AttackOutOfRange,
            });
            return;
        }
        if attacker.ammo() == 0 {
            out_events.push(Event::ActionRejected {
                agent: attacker_id,
                reason: ActionError::AttackWithoutAmmo,
            });
            return;
        }

        let weapon_level = attacker.upgrade_level(UpgradeKind::WeaponDamage);
        let damage = BASE_ATTACK_DAMAGE + weapon_level as f32 * DAMAGE_PER_WEAPON_LEVEL;

        if let Some(attacker) = self.agent_mut(attacker_id) {
            let _ = attacker.spend_ammo();
        }
        let mut remaining = 0.0;
        let mut died = false;
        if let Some(target_state) = self.agent_mut(target_id) {
            target_state.apply_damage(damage);
            remaining = target_state.health();
            died = !target_state.is_alive();
        }

        info!(
            "agent {} attacked agent {} for {damage} damage ({remaining} hp remaining)",
            attacker_id.get(),
            target_id.get()
        );
        out_events.push(Event::AgentAttacked {
            attacker: attacker_id,
            target: target_id,
            damage,
            remaining,
        });
        if died {
            info!("agent {} was killed by agent {}", target_id.get(), attacker_id.get());
            out_events.push(Event::AgentDied { agent: target_id });
        }
    }

    fn apply_eat(&mut self, agent_id: AgentId, out_events: &mut Vec<Event>) {
        let Some(agent) = self.agent_mut(agent_id) else {
            return;
        };
        if !agent.remove_resource(ResourceKind::Food, 1) {
            out_events.push(Event::ActionRejected {
                agent: agent_id,
                reason: ActionError::NoFoodHeld,
            });
            return;
        }
        agent.heal(EAT_HEAL);
        let health = agent.health();
        out_events.push(Event::AgentAte {
            agent: agent_id,
            health,
        });
    }

    fn apply_upgrade(
        &mut self,
        agent_id: AgentId,
        kind: Option<UpgradeKind>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(kind) = kind else {
            out_events.push(Event::ActionRejected {
                agent: agent_id,
                reason: ActionError::NoAffordableUpgrade,
            });
            return;
        };
        let catalog = self.catalog.clone();
        let Some(agent) = self.agent_mut(agent_id) else {
            return;
        };
        match catalog.purchase(agent, kind) {
            Some(level) => {
                info!(
                    "agent {} upgraded {kind:?} to level {level}",
                    agent_id.get()
                );
                out_events.push(Event::AgentUpgraded {
                    agent: agent_id,
                    kind,
                    level,
                });
            }
            None => {
                out_events.push(Event::ActionRejected {
                    agent: agent_id,
                    reason: ActionError::NoAffordableUpgrade,
                });
            }
        }
    }

    fn apply_action(
        &mut self,
        agent_id: AgentId,
        request: ActionRequest,
        out_events: &mut Vec<Event>,
    ) {
        match self.agent(agent_id) {
            None => {
                out_events.push(Event::ActionRejected {
                    agent: agent_id,
                    reason: ActionError::UnknownAgent,
                });
                return;
            }
            Some(agent) if !agent.is_alive() => {
                out_events.push(Event::ActionRejected {
                    agent: agent_id,
                    reason: ActionError::AgentDown,
                });
                return;
            }
            Some(_) => {}
        }

        if let Some(destination) = request.position {
            self.apply_move(agent_id, destination, out_events);
        }

        match request.action {
            Some(ActionKind::Scavenge) => self.apply_scavenge(agent_id, out_events),
            Some(ActionKind::Attack) => self.apply_attack(agent_id, request.target, out_events),
            Some(ActionKind::Eat) => self.apply_eat(agent_id, out_events),
            Some(ActionKind::Upgrade) => self.apply_upgrade(agent_id, request.upgrade, out_events),
            None => {}
        }
    }

    fn pick_drop_kind(&mut self) -> ResourceKind {
        let low_health = self
            .agents
            .iter()
            .any(|agent| agent.is_alive() && agent.health() < 40.0);
        let low_ammo = self
            .agents
            .iter()
            .any(|agent| agent.is_alive() && agent.ammo() < 3);
        let roll: f32 = self.rng.gen();
        if low_health && roll < 0.55 {
            return ResourceKind::Food;
        }
        if low_ammo && roll < 0.35 {
            return ResourceKind::Ammo;
        }
        if roll < 0.7 {
            ResourceKind::Scrap
        } else {
            ResourceKind::Food
        }
    }

    fn pick_drop_cell(&mut self, center: GridPos) -> Option<GridPos> {
        let occupied: Vec<GridPos> = self
            .agents
            .iter()
            .filter(|agent| agent.is_alive())
            .map(AgentState::position)
            .collect();
        let existing: Vec<GridPos> = self
            .resources
            .iter()
            .map(|resource| resource.position)
            .collect();
        let free = |cell: GridPos| !occupied.contains(&cell) && !existing.contains(&cell);

        for _ in 0..DROP_PLACEMENT_ATTEMPTS {
            let dx = self.rng.gen_range(-DROP_SPAWN_RADIUS..=DROP_SPAWN_RADIUS);
            let dy = self.rng.gen_range(-DROP_SPAWN_RADIUS..=DROP_SPAWN_RADIUS);
            let cell = center.offset(dx, dy);
            if self.is_walkable(cell) && free(cell) {
                return Some(cell);
            }
        }
        if self.width == 0 || self.height == 0 {
            return None;
        }
        for _ in 0..DROP_FALLBACK_ATTEMPTS {
            let x = self.rng.gen_range(0..self.width) as i32;
            let y = self.rng.gen_range(0..self.height) as i32;
            let cell = GridPos::new(x, y);
            if self.is_walkable(cell) && free(cell) {
                return Some(cell);
            }
        }
        None
    }

    /// Replenishes world drops near living agents once the cooldown elapses.
    fn maybe_spawn_drops(&mut self, out_events: &mut Vec<Event>) {
        if !self.match_active {
            return;
        }
        if self.tick_index - self.last_drop_tick < DROP_COOLDOWN_TICKS {
            return;
        }

        let total = self.resources.len();
        let food_count = self
            .resources
            .iter()
            .filter(|resource| resource.kind == ResourceKind::Food)
            .count();

        let mut spawn_count = if total == 0 {
            INITIAL_DROP_BATCH
        } else if total < MIN_WORLD_RESOURCES {
            MIN_WORLD_RESOURCES - total
        } else {
            0
        };
        if food_count == 0 {
            spawn_count = spawn_count.max(2);
        }
        if spawn_count == 0 {
            return;
        }

        let alive: Vec<GridPos> = self
            .agents
            .iter()
            .filter(|agent| agent.is_alive())
            .map(AgentState::position)
            .collect();
        if alive.is_empty() {
            return;
        }

        let mut spawned = 0_usize;
        for _ in 0..spawn_count {
            let center = alive[self.rng.gen_range(0..alive.len())];
            let Some(cell) = self.pick_drop_cell(center) else {
                continue;
            };
            let kind = self.pick_drop_kind();
            let amount = match kind {
                ResourceKind::Food => 1,
                ResourceKind::Ammo => self.rng.gen_range(5..=10),
                ResourceKind::Scrap => self.rng.gen_range(2..=5),
            };
            self.resources.push(ResourceSnapshot {
                position: cell,
                kind,
                amount,
            });
            out_events.push(Event::ResourceSpawned {
                position: cell,
                kind,
                amount,
            });
            spawned += 1;
        }

        if spawned > 0 {
            self.last_drop_tick = self.tick_index;
            debug!(
                "spawned {spawned} drops (world resources: {})",
                self.resources.len()
            );
        }
    }

    fn check_game_over(&mut self, out_events: &mut Vec<Event>) {
        if !self.match_active || self.game_over {
            return;
        }
        let mut alive = self.agents.iter().filter(|agent| agent.is_alive());
        let first = alive.next();
        if alive.next().is_some() {
            return;
        }
        self.game_over = true;
        let winner = first.map(AgentState::id);
        match winner {
            Some(agent) => info!("match over, agent {} wins", agent.get()),
            None => info!("match over, no survivors"),
        }
        out_events.push(Event::GameOver { winner });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid {
            width,
            height,
            tiles,
        } => {
            let expected = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
            let mut tiles = tiles;
            tiles.resize(expected, Tile::new(Terrain::Floor));
            world.width = width;
            world.height = height;
            world.tiles = tiles;
            world.resources.clear();
            world.agents.clear();
            world.tick_index = 0;
            world.last_drop_tick = 0;
            world.match_active = false;
            world.game_over = false;
        }
        Command::SpawnAgent {
            agent,
            position,
            health,
            ammo,
        } => {
            if world.agent(agent).is_some() {
                return;
            }
            if !world.is_walkable(position) || world.is_occupied_by_other(position, agent) {
                return;
            }
            world
                .agents
                .push(AgentState::new(agent, position, health, ammo));
            if world.agents.iter().filter(|state| state.is_alive()).count() >= 2 {
                world.match_active = true;
            }
            out_events.push(Event::AgentSpawned { agent, position });
        }
        Command::PlaceResource {
            position,
            kind,
            amount,
        } => {
            if let Some(index) = world.resource_index_at(position) {
                let _ = world.resources.remove(index);
            }
            world.resources.push(ResourceSnapshot {
                position,
                kind,
                amount,
            });
            out_events.push(Event::ResourceSpawned {
                position,
                kind,
                amount,
            });
        }
        Command::Tick => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced {
                tick: world.tick_index,
            });
            world.maybe_spawn_drops(out_events);
            world.check_game_over(out_events);
        }
        Command::ApplyAction { agent, request } => {
            world.apply_action(agent, request, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::collections::BTreeMap;

    use super::{NavView, World};
    use scrapline_core::{
        AgentId, AgentSnapshot, AgentState, AgentView, GridPos, ResourceKind, ResourceSnapshot,
        ResourceView, Terrain, UpgradeKind,
    };

    /// Chebyshev radius within which agents perceive the world.
    pub const VISION_RADIUS: u32 = 8;

    /// Grid dimensions as `(width, height)` in cells.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        (world.width, world.height)
    }

    /// Current simulation tick index.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick_index
    }

    /// Reports whether the match has ended.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.game_over
    }

    /// Captures a read-only view of every agent in the world.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(world.agents.iter().map(AgentState::snapshot).collect())
    }

    /// Snapshot of a single agent, if it exists.
    #[must_use]
    pub fn agent(world: &World, agent: AgentId) -> Option<AgentSnapshot> {
        world.agent(agent).map(AgentState::snapshot)
    }

    /// Inventory contents of a single agent in deterministic order.
    #[must_use]
    pub fn agent_inventory(world: &World, agent: AgentId) -> Option<BTreeMap<ResourceKind, u32>> {
        world.agent(agent).map(|state| state.inventory().clone())
    }

    /// Upgrade level reached by the agent for the provided kind.
    #[must_use]
    pub fn upgrade_level(world: &World, agent: AgentId, kind: UpgradeKind) -> u32 {
        world
            .agent(agent)
            .map_or(0, |state| state.upgrade_level(kind))
    }

    /// Captures a read-only view of every resource on the grid.
    #[must_use]
    pub fn resource_view(world: &World) -> ResourceView {
        ResourceView::from_snapshots(world.resources.clone())
    }

    /// Exposes the world grid as a navigation oracle for planners.
    #[must_use]
    pub fn nav_view(world: &World) -> NavView<'_> {
        NavView { world }
    }

    /// State slice perceived by one agent, limited to its vision radius.
    #[derive(Clone, Debug)]
    pub struct VisibleState {
        /// Snapshot of the perceiving agent itself.
        pub own: AgentSnapshot,
        /// Inventory of the perceiving agent in deterministic order.
        pub inventory: BTreeMap<ResourceKind, u32>,
        /// Terrain of every visible in-bounds cell.
        pub tiles: Vec<(GridPos, Terrain)>,
        /// Resources lying within the vision radius.
        pub resources: Vec<ResourceSnapshot>,
        /// Living rivals within the vision radius.
        pub others: Vec<AgentSnapshot>,
    }

    /// Captures the slice of the world one agent can currently perceive.
    ///
    /// Returns `None` for unknown agents. Dead rivals are never reported.
    #[must_use]
    pub fn visible_state(world: &World, agent: AgentId) -> Option<VisibleState> {
        let state = world.agent(agent)?;
        let center = state.position();
        let radius = VISION_RADIUS as i32;

        let mut tiles = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let cell = center.offset(dx, dy);
                if let Some(tile) = world.tile_at(cell) {
                    tiles.push((cell, tile.terrain()));
                }
            }
        }

        let resources = world
            .resources
            .iter()
            .filter(|resource| center.chebyshev_distance(resource.position) <= VISION_RADIUS)
            .copied()
            .collect();

        let others = world
            .agents
            .iter()
            .filter(|other| {
                other.id() != agent
                    && other.is_alive()
                    && center.chebyshev_distance(other.position()) <= VISION_RADIUS
            })
            .map(AgentState::snapshot)
            .collect();

        Some(VisibleState {
            own: state.snapshot(),
            inventory: state.inventory().clone(),
            tiles,
            resources,
            others,
        })
    }
}

/// Read-only navigation oracle over the world grid.
#[derive(Clone, Copy, Debug)]
pub struct NavView<'a> {
    world: &'a World,
}

impl WorldProvider for NavView<'_> {
    fn neighbors(&self, position: GridPos) -> Neighbors {
        let mut neighbors = Neighbors::default();
        for direction in scrapline_core::Direction::ALL {
            let (dx, dy) = direction.delta();
            let cell = position.offset(dx, dy);
            if self.world.is_walkable(cell) {
                neighbors.push(cell);
            }
        }
        neighbors
    }

    fn cost(&self, position: GridPos) -> f32 {
        self.world
            .tile_at(position)
            .map_or(f32::INFINITY, |tile| tile.cost())
    }

    fn is_walkable(&self, position: GridPos) -> bool {
        self.world.is_walkable(position)
    }

    fn resource_at(&self, position: GridPos) -> Option<ResourceSnapshot> {
        self.world
            .resource_index_at(position)
            .map(|index| self.world.resources[index])
    }
}
