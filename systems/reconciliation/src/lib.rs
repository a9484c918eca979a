#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Client-side prediction and server reconciliation for one agent.
//!
//! The behavior controller runs against a shadow [`AgentState`] and is free
//! to mutate it. This layer snapshots the shadow before each decision tick,
//! diffs it afterwards, and converts the difference into exactly one
//! [`ActionRequest`] for the authoritative world. Predicted mutations are
//! rolled back immediately; the shadow only ever advances when an
//! authoritative update confirms it. Positions that refuse to change and
//! paths the server walks off of are both detected here and the stale plan
//! is discarded so the controller replans from confirmed state.

use std::collections::BTreeMap;

use log::{debug, warn};

use scrapline_core::{
    ActionKind, ActionRequest, AgentId, AgentState, BehaviorTag, GridPos, ResourceKind,
    UpgradeKind, WorldProvider,
};
use scrapline_system_behavior::{AttackIntent, BehaviorConfig, BehaviorController, Surroundings};

/// Consecutive identical position confirmations that mark a plan as stuck.
const STUCK_UPDATE_LIMIT: u32 = 3;

/// Authoritative values the server confirms for one agent each tick.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthoritativeState {
    /// Confirmed cell the agent occupies.
    pub position: GridPos,
    /// Confirmed health value.
    pub health: f32,
    /// Confirmed health ceiling.
    pub max_health: f32,
    /// Confirmed ammo reserve.
    pub ammo: u32,
    /// Confirmed inventory contents.
    pub inventory: BTreeMap<ResourceKind, u32>,
}

/// Couples a behavior controller to a predicted shadow state.
#[derive(Debug)]
pub struct ReconciledController {
    agent: AgentState,
    controller: BehaviorController,
    intents: Vec<AttackIntent>,
    last_confirmed: Option<GridPos>,
    stuck_updates: u32,
}

impl ReconciledController {
    /// Creates a controller for the provided spawn parameters.
    #[must_use]
    pub fn new(
        id: AgentId,
        position: GridPos,
        health: f32,
        ammo: u32,
        config: BehaviorConfig,
        seed: u64,
    ) -> Self {
        Self {
            agent: AgentState::new(id, position, health, ammo),
            controller: BehaviorController::new(config, seed),
            intents: Vec::new(),
            last_confirmed: None,
            stuck_updates: 0,
        }
    }

    /// Read-only view of the predicted shadow state.
    #[must_use]
    pub const fn agent(&self) -> &AgentState {
        &self.agent
    }

    /// Mutable access to the shadow state, for seeding scripted scenarios.
    pub fn agent_mut(&mut self) -> &mut AgentState {
        &mut self.agent
    }

    /// Forces the controller into a named behavior state.
    pub fn set_state_by_name(&mut self, name: &str) -> bool {
        self.controller.set_state_by_name(&mut self.agent, name)
    }

    /// Runs one decision tick and returns the single request to submit.
    ///
    /// The shadow is snapshotted before the controller runs and every
    /// predicted mutation is rolled back: an ammo drop becomes an attack
    /// request, a position change becomes a move proposal, and otherwise the
    /// controller's state and pending purchases decide the action. When no
    /// action applies, the next cell of the active path is proposed.
    pub fn update<P: WorldProvider>(&mut self, surroundings: &Surroundings<'_, P>) -> ActionRequest {
        let old_ammo = self.agent.ammo();
        let old_position = self.agent.position();

        self.intents.clear();
        self.controller
            .update(&mut self.agent, surroundings, &mut self.intents);

        if self.agent.ammo() < old_ammo {
            let target = self
                .intents
                .last()
                .map(|intent| intent.target)
                .or_else(|| {
                    // The search fired without a recorded intent; aim at the
                    // closest living rival the agent knows about.
                    surroundings
                        .nearest_rival(old_position)
                        .map(|rival| rival.id)
                });
            if target.is_none() {
                warn!(
                    "agent {} spent shadow ammo with no target in sight",
                    self.agent.id().get()
                );
            }
            self.agent.set_ammo(old_ammo);
            self.agent.set_position(old_position);
            return ActionRequest {
                action: Some(ActionKind::Attack),
                position: None,
                target,
                upgrade: None,
            };
        }

        if self.agent.position() != old_position {
            let proposed = self.agent.position();
            self.agent.set_position(old_position);
            return ActionRequest {
                action: None,
                position: Some(proposed),
                target: None,
                upgrade: None,
            };
        }

        if let Some(kind) = self.controller.take_pending_upgrade() {
            return Self::upgrade_request(kind);
        }
        if self.agent.behavior() == BehaviorTag::Eat {
            return Self::action_request(ActionKind::Eat);
        }
        if self.agent.behavior() == BehaviorTag::Scavenge
            && surroundings.provider.resource_at(self.agent.position()).is_some()
        {
            return Self::action_request(ActionKind::Scavenge);
        }

        self.follow_path()
    }

    /// Folds the server's confirmed values back into the shadow.
    ///
    /// The confirmed snapshot always wins. The active path survives only
    /// while the server keeps confirming cells the plan expects: a cursor
    /// advance when the expected cell is reached, a discard when the agent
    /// ends up somewhere else, and a discard when the position refuses to
    /// change for [`STUCK_UPDATE_LIMIT`] consecutive updates.
    pub fn apply_update(&mut self, update: &AuthoritativeState) {
        let confirmed = update.position;
        let moved = confirmed != self.agent.position();

        if self.last_confirmed == Some(confirmed) {
            self.stuck_updates = self.stuck_updates.saturating_add(1);
        } else {
            self.stuck_updates = 1;
        }
        self.last_confirmed = Some(confirmed);

        self.agent.set_position(confirmed);
        self.agent.set_max_health(update.max_health);
        self.agent.set_health(update.health);
        self.agent.set_ammo(update.ammo);
        self.agent.overwrite_inventory(update.inventory.clone());

        if let Some(expected) = self.agent.next_path_cell() {
            if expected == confirmed {
                self.agent.advance_path_cursor();
            } else if moved {
                debug!(
                    "agent {} diverged from its plan, dropping path",
                    self.agent.id().get()
                );
                self.agent.clear_path();
            }
        }

        if self.stuck_updates >= STUCK_UPDATE_LIMIT && self.agent.next_path_cell().is_some() {
            debug!(
                "agent {} stuck at ({}, {}), dropping path",
                self.agent.id().get(),
                confirmed.x(),
                confirmed.y()
            );
            self.agent.clear_path();
            self.stuck_updates = 0;
        }
    }

    fn follow_path(&mut self) -> ActionRequest {
        // Plans include the starting cell; skip every cell already reached.
        while self.agent.next_path_cell() == Some(self.agent.position()) {
            self.agent.advance_path_cursor();
        }
        if let Some(next) = self.agent.next_path_cell() {
            if next.manhattan_distance(self.agent.position()) == 1 {
                return ActionRequest {
                    action: None,
                    position: Some(next),
                    target: None,
                    upgrade: None,
                };
            }
            // The plan no longer lines up with the confirmed position.
            self.agent.clear_path();
        }
        ActionRequest::idle()
    }

    const fn action_request(action: ActionKind) -> ActionRequest {
        ActionRequest {
            action: Some(action),
            position: None,
            target: None,
            upgrade: None,
        }
    }

    const fn upgrade_request(kind: UpgradeKind) -> ActionRequest {
        ActionRequest {
            action: Some(ActionKind::Upgrade),
            position: None,
            target: None,
            upgrade: Some(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrapline_core::{
        AgentSnapshot, Direction, Neighbors, ResourceSnapshot,
    };

    struct OpenGrid {
        width: i32,
        height: i32,
        resources: Vec<ResourceSnapshot>,
    }

    impl OpenGrid {
        fn new(width: i32, height: i32) -> Self {
            Self {
                width,
                height,
                resources: Vec::new(),
            }
        }

        fn with_resource(mut self, x: i32, y: i32, kind: ResourceKind) -> Self {
            self.resources.push(ResourceSnapshot {
                position: GridPos::new(x, y),
                kind,
                amount: 1,
            });
            self
        }
    }

    impl WorldProvider for OpenGrid {
        fn neighbors(&self, position: GridPos) -> Neighbors {
            let mut neighbors = Neighbors::default();
            for direction in Direction::ALL {
                let (dx, dy) = direction.delta();
                let cell = position.offset(dx, dy);
                if self.is_walkable(cell) {
                    neighbors.push(cell);
                }
            }
            neighbors
        }

        fn cost(&self, _position: GridPos) -> f32 {
            1.0
        }

        fn is_walkable(&self, position: GridPos) -> bool {
            position.x() >= 0
                && position.y() >= 0
                && position.x() < self.width
                && position.y() < self.height
        }

        fn resource_at(&self, position: GridPos) -> Option<ResourceSnapshot> {
            self.resources
                .iter()
                .find(|resource| resource.position == position)
                .copied()
        }
    }

    fn surroundings<'a>(
        grid: &'a OpenGrid,
        rivals: &'a [AgentSnapshot],
    ) -> Surroundings<'a, OpenGrid> {
        Surroundings {
            provider: grid,
            rivals,
            resources: &grid.resources,
            bounds: (grid.width as u32, grid.height as u32),
            tick: 0,
        }
    }

    fn controller(x: i32, y: i32, health: f32, ammo: u32) -> ReconciledController {
        ReconciledController::new(
            AgentId::new(1),
            GridPos::new(x, y),
            health,
            ammo,
            BehaviorConfig::default(),
            5,
        )
    }

    fn confirm(controller: &ReconciledController) -> AuthoritativeState {
        AuthoritativeState {
            position: controller.agent().position(),
            health: controller.agent().health(),
            max_health: controller.agent().max_health(),
            ammo: controller.agent().ammo(),
            inventory: controller.agent().inventory().clone(),
        }
    }

    fn confirm_at(controller: &ReconciledController, position: GridPos) -> AuthoritativeState {
        AuthoritativeState {
            position,
            ..confirm(controller)
        }
    }

    #[test]
    fn proposed_moves_leave_the_shadow_in_place() {
        let grid = OpenGrid::new(16, 16).with_resource(5, 0, ResourceKind::Ammo);
        let mut controller = controller(0, 0, 100.0, 2);
        let request = controller.update(&surroundings(&grid, &[]));
        assert_eq!(request.position, Some(GridPos::new(1, 0)));
        assert_eq!(request.action, None);
        assert_eq!(controller.agent().position(), GridPos::new(0, 0));
    }

    #[test]
    fn shadow_ammo_spend_becomes_an_attack_request() {
        let grid = OpenGrid::new(16, 16);
        let rivals = [AgentSnapshot {
            id: AgentId::new(2),
            position: GridPos::new(3, 0),
            health: 50.0,
            max_health: 100.0,
            ammo: 0,
        }];
        let mut controller = controller(0, 0, 100.0, 20);
        assert!(controller.set_state_by_name("FIGHT"));
        let request = controller.update(&surroundings(&grid, &rivals));
        assert_eq!(request.action, Some(ActionKind::Attack));
        assert_eq!(request.target, Some(AgentId::new(2)));
        assert_eq!(request.position, None);
        // The spend was predicted only; the server deducts the real ammo.
        assert_eq!(controller.agent().ammo(), 20);
    }

    #[test]
    fn standing_on_a_resource_requests_a_scavenge() {
        let grid = OpenGrid::new(16, 16).with_resource(4, 4, ResourceKind::Scrap);
        let mut controller = controller(4, 4, 100.0, 20);
        let request = controller.update(&surroundings(&grid, &[]));
        assert_eq!(request.action, Some(ActionKind::Scavenge));
        assert_eq!(request.position, None);
    }

    #[test]
    fn hungry_agent_requests_an_eat() {
        let grid = OpenGrid::new(16, 16);
        let mut controller = controller(0, 0, 20.0, 20);
        controller.agent_mut().add_resource(ResourceKind::Food, 2);
        let request = controller.update(&surroundings(&grid, &[]));
        assert_eq!(request.action, Some(ActionKind::Eat));
        assert_eq!(controller.agent().behavior(), BehaviorTag::Eat);
    }

    #[test]
    fn pending_purchase_becomes_an_upgrade_request() {
        let grid = OpenGrid::new(16, 16);
        let mut controller = controller(0, 0, 100.0, 20);
        controller.agent_mut().add_resource(ResourceKind::Scrap, 20);
        // First tick enters the upgrade state, second tick buys.
        let first = controller.update(&surroundings(&grid, &[]));
        assert_eq!(first.action, None);
        let second = controller.update(&surroundings(&grid, &[]));
        assert_eq!(second.action, Some(ActionKind::Upgrade));
        assert_eq!(second.upgrade, Some(UpgradeKind::WeaponDamage));
    }

    #[test]
    fn authoritative_values_always_overwrite_the_shadow() {
        let grid = OpenGrid::new(16, 16);
        let mut controller = controller(0, 0, 100.0, 20);
        let _ = controller.update(&surroundings(&grid, &[]));
        let mut inventory = BTreeMap::new();
        let _ = inventory.insert(ResourceKind::Food, 3);
        controller.apply_update(&AuthoritativeState {
            position: GridPos::new(7, 7),
            health: 42.0,
            max_health: 120.0,
            ammo: 9,
            inventory: inventory.clone(),
        });
        let agent = controller.agent();
        assert_eq!(agent.position(), GridPos::new(7, 7));
        assert_eq!(agent.health(), 42.0);
        assert_eq!(agent.max_health(), 120.0);
        assert_eq!(agent.ammo(), 9);
        assert_eq!(agent.inventory(), &inventory);
    }

    #[test]
    fn confirmed_steps_advance_the_path_cursor() {
        let grid = OpenGrid::new(16, 16).with_resource(5, 0, ResourceKind::Ammo);
        let mut controller = controller(0, 0, 100.0, 2);

        let first = controller.update(&surroundings(&grid, &[]));
        assert_eq!(first.position, Some(GridPos::new(1, 0)));
        let update = confirm_at(&controller, GridPos::new(1, 0));
        controller.apply_update(&update);

        let second = controller.update(&surroundings(&grid, &[]));
        assert_eq!(second.position, Some(GridPos::new(2, 0)));
    }

    #[test]
    fn unexpected_positions_discard_the_path() {
        let grid = OpenGrid::new(16, 16).with_resource(5, 0, ResourceKind::Ammo);
        let mut controller = controller(0, 0, 100.0, 2);
        let _ = controller.update(&surroundings(&grid, &[]));
        assert!(!controller.agent().path().is_empty());

        // The server moved the agent somewhere the plan never visits.
        let update = confirm_at(&controller, GridPos::new(0, 5));
        controller.apply_update(&update);
        assert!(controller.agent().path().is_empty());
    }

    #[test]
    fn repeated_rejections_mark_the_plan_as_stuck() {
        let grid = OpenGrid::new(16, 16).with_resource(5, 0, ResourceKind::Ammo);
        let mut controller = controller(0, 0, 100.0, 2);
        let _ = controller.update(&surroundings(&grid, &[]));
        assert!(!controller.agent().path().is_empty());

        let update = confirm_at(&controller, GridPos::new(0, 0));
        controller.apply_update(&update);
        controller.apply_update(&update);
        assert!(!controller.agent().path().is_empty());
        controller.apply_update(&update);
        assert!(controller.agent().path().is_empty());
    }

    #[test]
    fn every_tick_yields_exactly_one_request() {
        let grid = OpenGrid::new(16, 16);
        let mut controller = controller(8, 8, 100.0, 20);
        for _ in 0..10 {
            let request = controller.update(&surroundings(&grid, &[]));
            // A request either proposes a move or an action, never both.
            assert!(request.position.is_none() || request.action.is_none());
            let update = confirm(&controller);
            controller.apply_update(&update);
        }
    }
}
