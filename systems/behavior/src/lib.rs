#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Finite-state behavior controller for survival agents.
//!
//! The controller owns no world state. It drives a single agent's shadow
//! [`AgentState`]: it plans paths, steps the shadow position during close
//! combat, spends shadow ammo, and records attack intents for the
//! authoritative layer to validate. Transitions fire in the same tick their
//! condition is observed; entering a state never chains a second transition.
//!
//! All thresholds live in [`BehaviorConfig`] so personalities can be tuned
//! per agent without touching the state logic.

use log::{info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use scrapline_core::{
    AgentId, AgentSnapshot, AgentState, BehaviorTag, GridPos, ResourceKind, ResourceSnapshot,
    UpgradeKind, WorldProvider,
};
use scrapline_system_combat::{CombatAction, CombatSearch, CombatState, Combatant, SearchConfig};
use scrapline_system_economy::UpgradeCatalog;
use scrapline_system_pathfinding::Pathfinder;

/// Health restored by one shadow meal; the authoritative value matches.
const EAT_HEAL: f32 = 20.0;
/// Alternatives tried before scavenge planning falls back to wandering.
const PLAN_ATTEMPTS: usize = 4;
/// Random cells sampled when wandering for a destination.
const WANDER_ATTEMPTS: usize = 10;
/// Random walkable samples added to the flee candidate set.
const FLEE_SAMPLES: usize = 8;

/// Explicit record of an attack the controller wants carried out.
///
/// Controllers never write to a rival's state; the authoritative reducer
/// validates and applies the damage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackIntent {
    /// Agent spending the ammo.
    pub attacker: AgentId,
    /// Rival the attack is aimed at.
    pub target: AgentId,
}

/// Tunable thresholds governing every state transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BehaviorConfig {
    /// Below this health, scavengers stop to eat (if food is held).
    pub eat_health_threshold: f32,
    /// Scrap stock that sends a scavenger shopping.
    pub upgrade_scrap_threshold: u32,
    /// Manhattan distance at which a scavenger picks a fight.
    pub engage_range: u32,
    /// Minimum health required to pick a fight.
    pub engage_min_health: f32,
    /// At or below this health a fighter breaks off and flees.
    pub flee_health_threshold: f32,
    /// Manhattan distance beyond which a fighter gives up the chase.
    pub chase_range: u32,
    /// Chebyshev distance at which the combat search takes over.
    pub attack_range: u32,
    /// Above this health a fleeing agent returns to scavenging.
    pub recover_health_threshold: f32,
    /// Manhattan radius within which rivals count as active threats.
    pub threat_radius: u32,
    /// Consecutive threat-free ticks that end a flee.
    pub calm_ticks: u32,
    /// Hard cap on ticks spent fleeing.
    pub flee_cap_ticks: u32,
    /// Health at which eating stops.
    pub eat_exit_health: f32,
    /// Ticks between chase replans.
    pub repath_interval: u64,
    /// Target displacement (Manhattan) that forces an immediate replan.
    pub repath_target_shift: u32,
    /// Tuning handed to the combat search.
    pub search: SearchConfig,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            eat_health_threshold: 30.0,
            upgrade_scrap_threshold: 15,
            engage_range: 8,
            engage_min_health: 50.0,
            flee_health_threshold: 20.0,
            chase_range: 12,
            attack_range: 5,
            recover_health_threshold: 70.0,
            threat_radius: 10,
            calm_ticks: 5,
            flee_cap_ticks: 40,
            eat_exit_health: 80.0,
            repath_interval: 4,
            repath_target_shift: 2,
            search: SearchConfig {
                aggression: 0.8,
                depth: 1,
            },
        }
    }
}

/// Everything one agent can currently perceive, borrowed per tick.
#[derive(Clone, Copy, Debug)]
pub struct Surroundings<'a, P: WorldProvider> {
    /// Navigation oracle over the perceived grid.
    pub provider: &'a P,
    /// Living rivals currently known to the agent.
    pub rivals: &'a [AgentSnapshot],
    /// Resources currently known to the agent.
    pub resources: &'a [ResourceSnapshot],
    /// Grid dimensions as `(width, height)`.
    pub bounds: (u32, u32),
    /// Current simulation tick.
    pub tick: u64,
}

impl<'a, P: WorldProvider> Surroundings<'a, P> {
    /// Nearest living rival by Manhattan distance, ties toward lower id.
    #[must_use]
    pub fn nearest_rival(&self, from: GridPos) -> Option<&'a AgentSnapshot> {
        let mut best: Option<(&AgentSnapshot, u32)> = None;
        for rival in self.rivals.iter().filter(|rival| rival.is_alive()) {
            let distance = from.manhattan_distance(rival.position);
            let closer = match best {
                Some((current, best_distance)) => {
                    distance < best_distance
                        || (distance == best_distance && rival.id < current.id)
                }
                None => true,
            };
            if closer {
                best = Some((rival, distance));
            }
        }
        best.map(|(rival, _)| rival)
    }
}

/// Finite-state controller driving one agent's shadow state.
#[derive(Debug)]
pub struct BehaviorController {
    config: BehaviorConfig,
    pathfinder: Pathfinder,
    search: CombatSearch,
    catalog: UpgradeCatalog,
    rng: ChaCha8Rng,
    path_scratch: Vec<GridPos>,
    pending_upgrade: Option<UpgradeKind>,
    flee_ticks: u32,
    calm_streak: u32,
    last_repath_tick: u64,
    last_target_position: Option<GridPos>,
}

impl BehaviorController {
    /// Creates a controller whose wander decisions follow `seed`.
    #[must_use]
    pub fn new(config: BehaviorConfig, seed: u64) -> Self {
        Self {
            search: CombatSearch::new(config.search),
            config,
            pathfinder: Pathfinder::new(),
            catalog: UpgradeCatalog::standard(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            path_scratch: Vec::new(),
            pending_upgrade: None,
            flee_ticks: 0,
            calm_streak: 0,
            last_repath_tick: 0,
            last_target_position: None,
        }
    }

    /// Thresholds the controller was created with.
    #[must_use]
    pub const fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    /// Upgrade purchase decided this tick, if any. Clears the record.
    pub fn take_pending_upgrade(&mut self) -> Option<UpgradeKind> {
        self.pending_upgrade.take()
    }

    /// Runs one decision tick for the agent.
    ///
    /// Attack decisions are appended to `out_intents`; the buffer is not
    /// cleared so callers can batch several agents into one frame.
    pub fn update<P: WorldProvider>(
        &mut self,
        agent: &mut AgentState,
        surroundings: &Surroundings<'_, P>,
        out_intents: &mut Vec<AttackIntent>,
    ) {
        let next = match agent.behavior() {
            BehaviorTag::Scavenge => self.execute_scavenge(agent, surroundings),
            BehaviorTag::Fight => self.execute_fight(agent, surroundings, out_intents),
            BehaviorTag::Flee => self.execute_flee(agent, surroundings),
            BehaviorTag::Eat => self.execute_eat(agent),
            BehaviorTag::Upgrade => self.execute_upgrade(agent),
        };
        if let Some(next) = next {
            self.transition(agent, next);
        }
    }

    /// Forces the agent into the provided state, running exit/enter hooks.
    pub fn transition(&mut self, agent: &mut AgentState, next: BehaviorTag) {
        let previous = agent.behavior();
        self.exit_state(agent, previous);
        agent.set_behavior(next);
        self.enter_state(agent, next);
        info!(
            "agent {} transition: {} -> {}",
            agent.id().get(),
            previous.as_str(),
            next.as_str()
        );
    }

    /// Resolves a state name and transitions, rejecting unknown names.
    ///
    /// Returns `false` and leaves the agent untouched when the name does not
    /// match a canonical state.
    pub fn set_state_by_name(&mut self, agent: &mut AgentState, name: &str) -> bool {
        match BehaviorTag::from_name(name) {
            Some(tag) => {
                self.transition(agent, tag);
                true
            }
            None => {
                warn!(
                    "agent {} rejected unknown state {name:?}",
                    agent.id().get()
                );
                false
            }
        }
    }

    fn enter_state(&mut self, _agent: &mut AgentState, state: BehaviorTag) {
        match state {
            BehaviorTag::Flee => {
                self.flee_ticks = 0;
                self.calm_streak = 0;
            }
            BehaviorTag::Fight => {
                self.last_repath_tick = 0;
                self.last_target_position = None;
            }
            _ => {}
        }
    }

    fn exit_state(&mut self, agent: &mut AgentState, state: BehaviorTag) {
        if state == BehaviorTag::Flee {
            agent.clear_path();
        }
    }

    fn execute_scavenge<P: WorldProvider>(
        &mut self,
        agent: &mut AgentState,
        surroundings: &Surroundings<'_, P>,
    ) -> Option<BehaviorTag> {
        if agent.health() < self.config.eat_health_threshold
            && agent.inventory_count(ResourceKind::Food) >= 1
        {
            return Some(BehaviorTag::Eat);
        }
        if agent.inventory_count(ResourceKind::Scrap) >= self.config.upgrade_scrap_threshold {
            return Some(BehaviorTag::Upgrade);
        }
        if agent.health() >= self.config.engage_min_health && agent.ammo() >= 1 {
            if let Some(rival) = surroundings.nearest_rival(agent.position()) {
                if agent.position().manhattan_distance(rival.position) <= self.config.engage_range
                {
                    return Some(BehaviorTag::Fight);
                }
            }
        }

        if surroundings.provider.resource_at(agent.position()).is_some() {
            // Standing on loot; the collection intent comes from the sync layer.
            agent.clear_path();
            return None;
        }
        if agent.next_path_cell().is_none() {
            self.plan_scavenge_path(agent, surroundings);
        }
        None
    }

    fn resource_desirability(agent: &AgentState, kind: ResourceKind) -> f32 {
        match kind {
            ResourceKind::Food => {
                if agent.health() < 50.0 {
                    30.0
                } else {
                    10.0
                }
            }
            ResourceKind::Ammo => {
                if agent.ammo() < 5 {
                    25.0
                } else {
                    8.0
                }
            }
            ResourceKind::Scrap => 15.0,
        }
    }

    fn plan_scavenge_path<P: WorldProvider>(
        &mut self,
        agent: &mut AgentState,
        surroundings: &Surroundings<'_, P>,
    ) {
        let origin = agent.position();
        let mut candidates: Vec<(f32, GridPos)> = surroundings
            .resources
            .iter()
            .map(|resource| {
                let need = Self::resource_desirability(agent, resource.kind);
                let distance = origin.manhattan_distance(resource.position) as f32;
                (need - distance, resource.position)
            })
            .collect();
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        for (_, goal) in candidates.into_iter().take(PLAN_ATTEMPTS) {
            self.pathfinder
                .find_path(origin, goal, surroundings.provider, &mut self.path_scratch);
            if self.path_scratch.len() > 1 {
                agent.set_path(self.path_scratch.clone());
                return;
            }
        }
        self.wander(agent, surroundings);
    }

    fn wander<P: WorldProvider>(
        &mut self,
        agent: &mut AgentState,
        surroundings: &Surroundings<'_, P>,
    ) {
        let (width, height) = surroundings.bounds;
        if width > 0 && height > 0 {
            for _ in 0..WANDER_ATTEMPTS {
                let goal = GridPos::new(
                    self.rng.gen_range(0..width) as i32,
                    self.rng.gen_range(0..height) as i32,
                );
                if goal == agent.position() || !surroundings.provider.is_walkable(goal) {
                    continue;
                }
                self.pathfinder.find_path(
                    agent.position(),
                    goal,
                    surroundings.provider,
                    &mut self.path_scratch,
                );
                if self.path_scratch.len() > 1 {
                    agent.set_path(self.path_scratch.clone());
                    return;
                }
            }
        }
        self.step_to_random_neighbor(agent, surroundings);
    }

    fn step_to_random_neighbor<P: WorldProvider>(
        &mut self,
        agent: &mut AgentState,
        surroundings: &Surroundings<'_, P>,
    ) {
        let neighbors: Vec<GridPos> = surroundings.provider.neighbors(agent.position()).collect();
        if neighbors.is_empty() {
            return;
        }
        let next = neighbors[self.rng.gen_range(0..neighbors.len())];
        agent.set_path(vec![agent.position(), next]);
    }

    fn execute_fight<P: WorldProvider>(
        &mut self,
        agent: &mut AgentState,
        surroundings: &Surroundings<'_, P>,
        out_intents: &mut Vec<AttackIntent>,
    ) -> Option<BehaviorTag> {
        if agent.health() <= self.config.flee_health_threshold {
            return Some(BehaviorTag::Flee);
        }
        if agent.ammo() == 0 {
            return Some(BehaviorTag::Scavenge);
        }
        let Some(target) = surroundings.nearest_rival(agent.position()) else {
            return Some(BehaviorTag::Scavenge);
        };
        if agent.position().manhattan_distance(target.position) > self.config.chase_range {
            return Some(BehaviorTag::Scavenge);
        }

        if agent.position().chebyshev_distance(target.position) <= self.config.attack_range {
            agent.clear_path();
            let state = CombatState::new(
                Combatant::new(agent.position(), agent.health(), agent.ammo()),
                Combatant::new(target.position, target.health, target.ammo),
            );
            match self.search.best_action(&state).0 {
                CombatAction::Attack => {
                    let _ = agent.spend_ammo();
                    out_intents.push(AttackIntent {
                        attacker: agent.id(),
                        target: target.id,
                    });
                }
                CombatAction::Step(direction) => {
                    let (dx, dy) = direction.delta();
                    let next = agent.position().offset(dx, dy);
                    if surroundings.provider.is_walkable(next) {
                        agent.set_position(next);
                    }
                }
            }
        } else {
            self.chase(agent, surroundings, target.position);
        }
        None
    }

    fn chase<P: WorldProvider>(
        &mut self,
        agent: &mut AgentState,
        surroundings: &Surroundings<'_, P>,
        target: GridPos,
    ) {
        let target_shifted = self.last_target_position.map_or(true, |last| {
            last.manhattan_distance(target) >= self.config.repath_target_shift
        });
        let stale = surroundings.tick.saturating_sub(self.last_repath_tick)
            >= self.config.repath_interval;
        if agent.next_path_cell().is_some() && !stale && !target_shifted {
            return;
        }

        self.pathfinder.find_path(
            agent.position(),
            target,
            surroundings.provider,
            &mut self.path_scratch,
        );
        if self.path_scratch.len() > 1 {
            agent.set_path(self.path_scratch.clone());
        } else {
            self.step_to_random_neighbor(agent, surroundings);
        }
        self.last_repath_tick = surroundings.tick;
        self.last_target_position = Some(target);
    }

    fn execute_flee<P: WorldProvider>(
        &mut self,
        agent: &mut AgentState,
        surroundings: &Surroundings<'_, P>,
    ) -> Option<BehaviorTag> {
        self.flee_ticks = self.flee_ticks.saturating_add(1);
        if agent.health() > self.config.recover_health_threshold {
            return Some(BehaviorTag::Scavenge);
        }

        let threatened = surroundings.rivals.iter().any(|rival| {
            rival.is_alive()
                && agent.position().manhattan_distance(rival.position)
                    <= self.config.threat_radius
        });
        if threatened {
            self.calm_streak = 0;
        } else {
            self.calm_streak = self.calm_streak.saturating_add(1);
            if self.calm_streak >= self.config.calm_ticks {
                return Some(BehaviorTag::Scavenge);
            }
        }
        if self.flee_ticks >= self.config.flee_cap_ticks {
            return Some(BehaviorTag::Scavenge);
        }

        if agent.next_path_cell().is_none() {
            self.plan_flee_path(agent, surroundings);
        }
        None
    }

    fn plan_flee_path<P: WorldProvider>(
        &mut self,
        agent: &mut AgentState,
        surroundings: &Surroundings<'_, P>,
    ) {
        let threats: Vec<GridPos> = surroundings
            .rivals
            .iter()
            .filter(|rival| rival.is_alive())
            .map(|rival| rival.position)
            .collect();
        if threats.is_empty() {
            self.wander(agent, surroundings);
            return;
        }

        let safety = |cell: GridPos| {
            threats
                .iter()
                .map(|threat| cell.euclidean_distance(*threat))
                .fold(f32::INFINITY, f32::min)
        };

        let (width, height) = surroundings.bounds;
        let (width, height) = (width as i32, height as i32);
        let mut candidates = vec![
            GridPos::new(1, 1),
            GridPos::new(width - 2, 1),
            GridPos::new(1, height - 2),
            GridPos::new(width - 2, height - 2),
            GridPos::new(width / 2, height / 2),
        ];
        for _ in 0..FLEE_SAMPLES {
            candidates.push(GridPos::new(
                self.rng.gen_range(0..width.max(1)),
                self.rng.gen_range(0..height.max(1)),
            ));
        }
        candidates.retain(|cell| {
            *cell != agent.position() && surroundings.provider.is_walkable(*cell)
        });
        candidates.sort_by(|a, b| safety(*b).total_cmp(&safety(*a)).then_with(|| a.cmp(b)));

        for goal in candidates {
            self.pathfinder.find_path(
                agent.position(),
                goal,
                surroundings.provider,
                &mut self.path_scratch,
            );
            if self.path_scratch.len() > 1 {
                agent.set_path(self.path_scratch.clone());
                return;
            }
        }

        // No reachable refuge; take the single safest neighbor.
        let best_neighbor = surroundings
            .provider
            .neighbors(agent.position())
            .max_by(|a, b| safety(*a).total_cmp(&safety(*b)).then_with(|| b.cmp(a)));
        if let Some(next) = best_neighbor {
            agent.set_path(vec![agent.position(), next]);
        }
    }

    fn execute_eat(&mut self, agent: &mut AgentState) -> Option<BehaviorTag> {
        if !agent.remove_resource(ResourceKind::Food, 1) {
            return Some(BehaviorTag::Scavenge);
        }
        agent.heal(EAT_HEAL);
        if agent.health() >= self.config.eat_exit_health {
            return Some(BehaviorTag::Scavenge);
        }
        None
    }

    fn execute_upgrade(&mut self, agent: &mut AgentState) -> Option<BehaviorTag> {
        if let Some(kind) = self
            .catalog
            .cheapest_affordable(agent)
            .map(|tier| tier.kind())
        {
            let _ = self.catalog.purchase(agent, kind);
            self.pending_upgrade = Some(kind);
        }
        Some(BehaviorTag::Scavenge)
    }
}
