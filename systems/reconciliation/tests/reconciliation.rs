use scrapline_core::{
    AgentId, Command, GridPos, ResourceKind, Terrain, Tile,
};
use scrapline_system_behavior::{BehaviorConfig, Surroundings};
use scrapline_system_reconciliation::{AuthoritativeState, ReconciledController};
use scrapline_world::{self as world, query, World};

fn open_grid(width: u32, height: u32) -> Command {
    let count = (width * height) as usize;
    Command::ConfigureGrid {
        width,
        height,
        tiles: vec![Tile::new(Terrain::Floor); count],
    }
}

fn spawn(agent: u32, x: i32, y: i32, ammo: u32) -> Command {
    Command::SpawnAgent {
        agent: AgentId::new(agent),
        position: GridPos::new(x, y),
        health: 100.0,
        ammo,
    }
}

fn run_tick(world: &mut World, controller: &mut ReconciledController) {
    let id = controller.agent().id();
    let visible = query::visible_state(world, id).expect("agent is alive");
    let nav = query::nav_view(world);
    let surroundings = Surroundings {
        provider: &nav,
        rivals: &visible.others,
        resources: &visible.resources,
        bounds: query::dimensions(world),
        tick: query::tick(world),
    };
    let request = controller.update(&surroundings);

    let mut events = Vec::new();
    world::apply(world, Command::ApplyAction { agent: id, request }, &mut events);
    world::apply(world, Command::Tick, &mut events);

    let confirmed = query::agent(world, id).expect("agent survives the tick");
    let inventory = query::agent_inventory(world, id).expect("agent has an inventory");
    controller.apply_update(&AuthoritativeState {
        position: confirmed.position,
        health: confirmed.health,
        max_health: confirmed.max_health,
        ammo: confirmed.ammo,
        inventory,
    });
}

#[test]
fn reconciled_agent_walks_to_a_drop_and_collects_it() {
    let mut world = World::new(3);
    let mut events = Vec::new();
    world::apply(&mut world, open_grid(12, 12), &mut events);
    world::apply(&mut world, spawn(1, 2, 2, 2), &mut events);
    world::apply(
        &mut world,
        Command::PlaceResource {
            position: GridPos::new(6, 2),
            kind: ResourceKind::Scrap,
            amount: 3,
        },
        &mut events,
    );

    let mut controller = ReconciledController::new(
        AgentId::new(1),
        GridPos::new(2, 2),
        100.0,
        2,
        BehaviorConfig::default(),
        17,
    );

    for _ in 0..8 {
        run_tick(&mut world, &mut controller);
    }

    let inventory = query::agent_inventory(&world, AgentId::new(1)).expect("agent");
    assert_eq!(inventory.get(&ResourceKind::Scrap).copied(), Some(3));
    assert!(query::resource_view(&world).at(GridPos::new(6, 2)).is_none());
    // The shadow converged on the authoritative state.
    assert_eq!(
        controller.agent().position(),
        query::agent(&world, AgentId::new(1)).expect("agent").position
    );
}

#[test]
fn reconciled_attacks_land_on_the_authoritative_rival() {
    let mut world = World::new(3);
    let mut events = Vec::new();
    world::apply(&mut world, open_grid(12, 12), &mut events);
    world::apply(&mut world, spawn(1, 2, 2, 20), &mut events);
    world::apply(&mut world, spawn(2, 4, 2, 20), &mut events);

    let mut controller = ReconciledController::new(
        AgentId::new(1),
        GridPos::new(2, 2),
        100.0,
        20,
        BehaviorConfig::default(),
        17,
    );

    for _ in 0..5 {
        run_tick(&mut world, &mut controller);
    }

    let rival = query::agent(&world, AgentId::new(2)).expect("rival");
    assert!(rival.health < 100.0);
    let attacker = query::agent(&world, AgentId::new(1)).expect("attacker");
    assert!(attacker.ammo < 20);
    assert_eq!(controller.agent().ammo(), attacker.ammo);
}
