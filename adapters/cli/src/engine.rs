//! Headless match engine: paced tick loop, deterministic agent scheduling,
//! perception-driven targeting, and per-agent survival metrics.

use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use scrapline_core::{
    ActionRequest, AgentId, AgentSnapshot, Command, Event, GridPos, ResourceKind, Terrain, Tile,
};
use scrapline_net::{
    self as net, ActionMessage, GameOverMessage, InitMessage, MapDescription, Message, OwnState,
    ResourceCell, RivalCell, TileCell, UpdateMessage,
};
use scrapline_system_behavior::{BehaviorConfig, Surroundings};
use scrapline_system_perception::{BeliefTracker, TargetingStrategy};
use scrapline_system_reconciliation::{AuthoritativeState, ReconciledController};
use scrapline_world::{self as world, query, World};

/// Health every agent spawns with.
const START_HEALTH: f32 = 100.0;
/// Ammo every agent spawns with.
const START_AMMO: u32 = 10;
/// Resource drops scattered before the first tick.
const INITIAL_DROPS: usize = 12;
/// Placement attempts per initial drop before giving up on it.
const DROP_PLACEMENT_ATTEMPTS: usize = 40;
/// Aggression handed to odd-numbered agents; even ones keep the default.
const CAUTIOUS_AGGRESSION: f32 = 0.4;

/// Parameters of one headless match.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MatchConfig {
    /// Seed shared by the world and every controller.
    pub seed: u64,
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Number of competing agents.
    pub agents: u32,
    /// Hard tick limit.
    pub max_ticks: u64,
    /// Ticks per wall-clock second; 0 runs uncapped.
    pub tick_hz: u32,
    /// Log every packet that would cross the network boundary.
    pub trace_wire: bool,
}

/// Survival metrics recorded for one agent.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AgentReport {
    /// Agent the metrics belong to.
    pub id: AgentId,
    /// Last tick the agent was confirmed alive.
    pub survived_ticks: u64,
    /// Authoritative health when the match ended.
    pub final_health: f32,
    /// Ticks spent in each behavior state while alive.
    pub behavior_counts: BTreeMap<&'static str, u64>,
}

/// Outcome of a finished match.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MatchReport {
    /// Ticks simulated before the match ended.
    pub ticks: u64,
    /// Last agent standing, or `None` on a tick-cap draw or mutual wipe.
    pub winner: Option<AgentId>,
    /// Per-agent survival metrics in id order.
    pub agents: Vec<AgentReport>,
}

/// Runs one match to completion and reports the outcome.
pub(crate) fn run_match(config: &MatchConfig) -> MatchReport {
    let mut world = World::new(config.seed);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureGrid {
            width: config.width,
            height: config.height,
            tiles: vec![Tile::new(Terrain::Floor); (config.width * config.height) as usize],
        },
        &mut events,
    );

    let spawns = spawn_cells(config.width, config.height);
    let mut controllers = Vec::new();
    let mut reports = Vec::new();
    for index in 0..config.agents as usize {
        let id = AgentId::new(index as u32 + 1);
        let position = spawns[index % spawns.len()];
        world::apply(
            &mut world,
            Command::SpawnAgent {
                agent: id,
                position,
                health: START_HEALTH,
                ammo: START_AMMO,
            },
            &mut events,
        );
        let mut behavior = BehaviorConfig::default();
        if index % 2 == 1 {
            behavior.search.aggression = CAUTIOUS_AGGRESSION;
        }
        controllers.push(ReconciledController::new(
            id,
            position,
            START_HEALTH,
            START_AMMO,
            behavior,
            config.seed.wrapping_add(id.get() as u64),
        ));
        reports.push(AgentReport {
            id,
            survived_ticks: 0,
            final_health: START_HEALTH,
            behavior_counts: BTreeMap::new(),
        });
        if config.trace_wire {
            emit(&init_message(id, position, config));
        }
    }

    scatter_initial_drops(&mut world, config, &mut events);

    let mut tracker = BeliefTracker::new(config.seed);
    let frame_budget = (config.tick_hz > 0).then(|| Duration::from_secs(1) / config.tick_hz);
    let mut winner = None;
    let mut ticks = 0;

    while ticks < config.max_ticks && !query::is_game_over(&world) {
        let frame_start = Instant::now();

        for controller in &mut controllers {
            let id = controller.agent().id();
            let Some(snapshot) = query::agent(&world, id) else {
                continue;
            };
            if !snapshot.is_alive() {
                continue;
            }
            let Some(visible) = query::visible_state(&world, id) else {
                continue;
            };
            let rivals = perceived_rivals(&world, &mut tracker, &visible.own, &visible.others);
            let nav = query::nav_view(&world);
            let surroundings = Surroundings {
                provider: &nav,
                rivals: &rivals,
                resources: &visible.resources,
                bounds: query::dimensions(&world),
                tick: query::tick(&world),
            };
            let request = controller.update(&surroundings);
            if config.trace_wire {
                emit(&action_message(id, &request));
            }
            world::apply(
                &mut world,
                Command::ApplyAction { agent: id, request },
                &mut events,
            );
        }

        world::apply(&mut world, Command::Tick, &mut events);
        ticks = query::tick(&world);

        for event in events.drain(..) {
            if let Event::GameOver { winner: survivor } = event {
                winner = survivor;
                if config.trace_wire {
                    emit(&Message::GameOver(GameOverMessage { winner_id: survivor }));
                }
            }
        }

        for (controller, report) in controllers.iter_mut().zip(reports.iter_mut()) {
            let id = report.id;
            let Some(snapshot) = query::agent(&world, id) else {
                continue;
            };
            let Some(inventory) = query::agent_inventory(&world, id) else {
                continue;
            };
            controller.apply_update(&AuthoritativeState {
                position: snapshot.position,
                health: snapshot.health,
                max_health: snapshot.max_health,
                ammo: snapshot.ammo,
                inventory,
            });
            report.final_health = snapshot.health;
            if snapshot.is_alive() {
                report.survived_ticks = ticks;
                let state = controller.agent().behavior().as_str();
                *report.behavior_counts.entry(state).or_insert(0) += 1;
                if config.trace_wire {
                    if let Some(visible) = query::visible_state(&world, id) {
                        emit(&update_message(ticks, &visible));
                    }
                }
            }
        }

        if let Some(budget) = frame_budget {
            let elapsed = frame_start.elapsed();
            if elapsed < budget {
                thread::sleep(budget - elapsed);
            }
        }
    }

    debug!("match ended after {ticks} ticks");
    MatchReport {
        ticks,
        winner,
        agents: reports,
    }
}

/// Spawn cells near the four grid corners, in agent order.
fn spawn_cells(width: u32, height: u32) -> [GridPos; 4] {
    let (width, height) = (width as i32, height as i32);
    [
        GridPos::new(2, 2),
        GridPos::new(width - 3, height - 3),
        GridPos::new(width - 3, 2),
        GridPos::new(2, height - 3),
    ]
}

/// Seeds the arena with drops so early scavenging has something to find.
fn scatter_initial_drops(world: &mut World, config: &MatchConfig, events: &mut Vec<Event>) {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(0x5ca9));
    for _ in 0..INITIAL_DROPS {
        for _ in 0..DROP_PLACEMENT_ATTEMPTS {
            let cell = GridPos::new(
                rng.gen_range(0..config.width) as i32,
                rng.gen_range(0..config.height) as i32,
            );
            if query::resource_view(world).at(cell).is_some() {
                continue;
            }
            if query::agent_view(world).iter().any(|agent| agent.position == cell) {
                continue;
            }
            let roll: f32 = rng.gen();
            let (kind, amount) = if roll < 0.4 {
                (ResourceKind::Food, 1)
            } else if roll < 0.7 {
                (ResourceKind::Ammo, rng.gen_range(5..=10))
            } else {
                (ResourceKind::Scrap, rng.gen_range(2..=5))
            };
            world::apply(
                world,
                Command::PlaceResource {
                    position: cell,
                    kind,
                    amount,
                },
                events,
            );
            break;
        }
    }
}

/// Rivals the observer should act on: exact snapshots inside the vision
/// radius plus belief-estimated ghosts for rivals it is still tracking.
fn perceived_rivals(
    world: &World,
    tracker: &mut BeliefTracker,
    own: &AgentSnapshot,
    seen: &[AgentSnapshot],
) -> Vec<AgentSnapshot> {
    let tick = query::tick(world);
    let mut rivals = seen.to_vec();

    for other in query::agent_view(world)
        .into_vec()
        .into_iter()
        .filter(|other| other.id != own.id && other.is_alive())
    {
        let estimate = tracker.update_belief(
            own.id,
            own.position,
            other.id,
            other.position,
            tick,
            own.health,
            own.ammo as f32,
        );
        let strategy = TargetingStrategy::for_confidence(estimate.confidence);
        trace!(
            "agent {} tracking agent {}: confidence {:.2}, {:?}",
            own.id.get(),
            other.id.get(),
            estimate.confidence,
            strategy
        );
        if strategy != TargetingStrategy::Search
            && !rivals.iter().any(|rival| rival.id == other.id)
        {
            // Out of sight but still believed in; hunt the estimate.
            rivals.push(AgentSnapshot {
                id: other.id,
                position: estimate.position,
                health: other.health,
                max_health: other.max_health,
                ammo: other.ammo,
            });
        }
    }
    rivals
}

fn emit(message: &Message) {
    match net::encode(message) {
        Ok(text) => debug!(target: "wire", "{text}"),
        Err(err) => warn!("failed to encode wire packet: {err}"),
    }
}

fn init_message(id: AgentId, spawn: GridPos, config: &MatchConfig) -> Message {
    Message::Init(InitMessage {
        agent_id: id,
        spawn,
        map: MapDescription {
            width: config.width,
            height: config.height,
            grid: vec![vec![Terrain::Floor; config.width as usize]; config.height as usize],
        },
    })
}

fn action_message(id: AgentId, request: &ActionRequest) -> Message {
    Message::Action(ActionMessage {
        agent_id: id,
        action: request.action,
        position: request.position,
        target_id: request.target,
        upgrade_kind: request.upgrade,
    })
}

fn update_message(tick: u64, visible: &query::VisibleState) -> Message {
    Message::Update(UpdateMessage {
        tick,
        own: OwnState {
            x: visible.own.position.x(),
            y: visible.own.position.y(),
            health: visible.own.health,
            max_health: visible.own.max_health,
            ammo: visible.own.ammo,
            inventory: visible.inventory.clone(),
        },
        tiles: visible
            .tiles
            .iter()
            .map(|(cell, terrain)| TileCell {
                x: cell.x(),
                y: cell.y(),
                terrain: *terrain,
            })
            .collect(),
        resources: visible
            .resources
            .iter()
            .map(|resource| ResourceCell {
                x: resource.position.x(),
                y: resource.position.y(),
                kind: resource.kind,
                amount: resource.amount,
            })
            .collect(),
        others: visible
            .others
            .iter()
            .map(|other| RivalCell {
                id: other.id,
                x: other.position.x(),
                y: other.position.y(),
                health: other.health,
                ammo: other.ammo,
            })
            .collect(),
    })
}
