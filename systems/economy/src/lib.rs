#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that manages resource consumption and the upgrade economy.
//!
//! The catalog defines a fixed tier ladder per upgrade kind. Agents climb the
//! ladder one level at a time and pay the tier cost in scrap; affordability
//! checks never mutate state, purchases mutate exactly one agent.

use log::debug;

use scrapline_core::{AgentState, ResourceKind, UpgradeKind};

/// Health restored per food unit consumed through the economy.
pub const FOOD_HEAL_PER_UNIT: f32 = 10.0;

/// One purchasable tier on an upgrade ladder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Upgrade {
    name: &'static str,
    kind: UpgradeKind,
    cost: u32,
    value: f32,
    level: u32,
}

impl Upgrade {
    /// Display name of the tier.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Upgrade kind the tier belongs to.
    #[must_use]
    pub const fn kind(&self) -> UpgradeKind {
        self.kind
    }

    /// Scrap price of the tier.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Stat bonus granted by the tier.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.value
    }

    /// Ladder level the tier occupies, starting at one.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

/// Fixed ladder of purchasable upgrades.
#[derive(Clone, Debug)]
pub struct UpgradeCatalog {
    tiers: Vec<Upgrade>,
}

impl UpgradeCatalog {
    /// Creates the standard two-tier catalog for both upgrade kinds.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            tiers: vec![
                Upgrade {
                    name: "Sharpened Blade",
                    kind: UpgradeKind::WeaponDamage,
                    cost: 10,
                    value: 5.0,
                    level: 1,
                },
                Upgrade {
                    name: "Titanium Edge",
                    kind: UpgradeKind::WeaponDamage,
                    cost: 25,
                    value: 10.0,
                    level: 2,
                },
                Upgrade {
                    name: "Leather Armor",
                    kind: UpgradeKind::MaxHealth,
                    cost: 15,
                    value: 20.0,
                    level: 1,
                },
                Upgrade {
                    name: "Kevlar Vest",
                    kind: UpgradeKind::MaxHealth,
                    cost: 30,
                    value: 50.0,
                    level: 2,
                },
            ],
        }
    }

    /// Next unowned tier on the agent's ladder for the provided kind.
    #[must_use]
    pub fn next_tier(&self, agent: &AgentState, kind: UpgradeKind) -> Option<&Upgrade> {
        let next_level = agent.upgrade_level(kind) + 1;
        self.tiers
            .iter()
            .find(|tier| tier.kind == kind && tier.level == next_level)
    }

    /// Next tier for the provided kind, only if the agent can pay for it.
    #[must_use]
    pub fn affordable(&self, agent: &AgentState, kind: UpgradeKind) -> Option<&Upgrade> {
        self.next_tier(agent, kind)
            .filter(|tier| agent.inventory_count(ResourceKind::Scrap) >= tier.cost)
    }

    /// Cheapest affordable tier across every upgrade kind.
    ///
    /// Ties on cost break toward [`UpgradeKind::MaxHealth`] so that survival
    /// purchases win over firepower.
    #[must_use]
    pub fn cheapest_affordable(&self, agent: &AgentState) -> Option<&Upgrade> {
        let mut best: Option<&Upgrade> = None;
        for kind in [UpgradeKind::MaxHealth, UpgradeKind::WeaponDamage] {
            let Some(tier) = self.affordable(agent, kind) else {
                continue;
            };
            best = match best {
                Some(current) if current.cost <= tier.cost => Some(current),
                _ => Some(tier),
            };
        }
        best
    }

    /// Purchases the next tier of the provided kind for the agent.
    ///
    /// Deducts the scrap price, raises the agent's upgrade level, and applies
    /// the tier's stat bonus. Returns the level reached, or `None` when the
    /// ladder is exhausted or the agent cannot pay.
    pub fn purchase(&self, agent: &mut AgentState, kind: UpgradeKind) -> Option<u32> {
        let tier = *self.affordable(agent, kind)?;
        if !agent.remove_resource(ResourceKind::Scrap, tier.cost) {
            return None;
        }
        let level = agent.raise_upgrade(kind);
        if kind == UpgradeKind::MaxHealth {
            agent.raise_max_health(tier.value);
            agent.heal(tier.value);
        }
        debug!(
            "agent {} purchased {} (level {level}, {} scrap)",
            agent.id().get(),
            tier.name,
            tier.cost
        );
        Some(level)
    }
}

/// Adds collected resource units to the agent's inventory.
pub fn collect(agent: &mut AgentState, kind: ResourceKind, amount: u32) {
    agent.add_resource(kind, amount);
}

/// Consumes held resource units, applying their effect.
///
/// Food heals [`FOOD_HEAL_PER_UNIT`] per unit consumed; ammo moves from the
/// inventory into the weapon reserve. Returns `false` without mutating when
/// the agent holds fewer units than requested.
pub fn consume(agent: &mut AgentState, kind: ResourceKind, amount: u32) -> bool {
    if !agent.remove_resource(kind, amount) {
        return false;
    }
    match kind {
        ResourceKind::Food => agent.heal(amount as f32 * FOOD_HEAL_PER_UNIT),
        ResourceKind::Ammo => agent.add_ammo(amount),
        ResourceKind::Scrap => {}
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrapline_core::{AgentId, GridPos};

    fn agent_with_scrap(scrap: u32) -> AgentState {
        let mut agent = AgentState::new(AgentId::new(1), GridPos::new(0, 0), 100.0, 0);
        agent.add_resource(ResourceKind::Scrap, scrap);
        agent
    }

    #[test]
    fn collected_scrap_lands_in_the_inventory() {
        let mut agent = agent_with_scrap(0);
        collect(&mut agent, ResourceKind::Scrap, 10);
        assert_eq!(agent.inventory_count(ResourceKind::Scrap), 10);
    }

    #[test]
    fn consuming_food_heals_per_unit() {
        let mut agent = AgentState::new(AgentId::new(1), GridPos::new(0, 0), 50.0, 0);
        agent.add_resource(ResourceKind::Food, 2);
        assert!(consume(&mut agent, ResourceKind::Food, 1));
        assert_eq!(agent.inventory_count(ResourceKind::Food), 1);
        assert_eq!(agent.health(), 60.0);
    }

    #[test]
    fn consuming_without_stock_fails_cleanly() {
        let mut agent = AgentState::new(AgentId::new(1), GridPos::new(0, 0), 50.0, 0);
        assert!(!consume(&mut agent, ResourceKind::Food, 1));
        assert_eq!(agent.health(), 50.0);
    }

    #[test]
    fn first_health_tier_is_affordable_at_twenty_scrap() {
        let catalog = UpgradeCatalog::standard();
        let agent = agent_with_scrap(20);
        let tier = catalog
            .affordable(&agent, UpgradeKind::MaxHealth)
            .expect("tier");
        assert_eq!(tier.name(), "Leather Armor");
        assert_eq!(tier.cost(), 15);
    }

    #[test]
    fn purchase_deducts_scrap_and_raises_the_ceiling() {
        let catalog = UpgradeCatalog::standard();
        let mut agent = agent_with_scrap(20);
        let level = catalog.purchase(&mut agent, UpgradeKind::MaxHealth);
        assert_eq!(level, Some(1));
        assert_eq!(agent.inventory_count(ResourceKind::Scrap), 5);
        assert_eq!(agent.max_health(), 120.0);
        assert_eq!(agent.health(), 120.0);
    }

    #[test]
    fn purchase_fails_on_insufficient_scrap() {
        let catalog = UpgradeCatalog::standard();
        let mut agent = agent_with_scrap(5);
        assert_eq!(catalog.purchase(&mut agent, UpgradeKind::MaxHealth), None);
        assert_eq!(agent.inventory_count(ResourceKind::Scrap), 5);
        assert_eq!(agent.upgrade_level(UpgradeKind::MaxHealth), 0);
    }

    #[test]
    fn ladder_advances_one_tier_at_a_time() {
        let catalog = UpgradeCatalog::standard();
        let mut agent = agent_with_scrap(60);
        assert_eq!(catalog.purchase(&mut agent, UpgradeKind::MaxHealth), Some(1));
        let second = catalog
            .next_tier(&agent, UpgradeKind::MaxHealth)
            .expect("tier");
        assert_eq!(second.name(), "Kevlar Vest");
        assert_eq!(catalog.purchase(&mut agent, UpgradeKind::MaxHealth), Some(2));
        assert_eq!(catalog.purchase(&mut agent, UpgradeKind::MaxHealth), None);
    }

    #[test]
    fn cheapest_affordable_prefers_the_lower_price() {
        let catalog = UpgradeCatalog::standard();
        let agent = agent_with_scrap(40);
        let tier = catalog.cheapest_affordable(&agent).expect("tier");
        assert_eq!(tier.kind(), UpgradeKind::WeaponDamage);
        assert_eq!(tier.cost(), 10);
    }
}
