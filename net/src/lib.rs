#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wire message types for the client/server boundary.
//!
//! Messages are JSON objects tagged by a `kind` field with camelCase member
//! names. The shapes are part of the protocol contract: clients send exactly
//! one action message per tick, the server answers with per-agent updates
//! filtered to the agent's vision radius, and a single game-over broadcast
//! ends the match. Transport framing is out of scope; this crate only turns
//! messages into text and back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use scrapline_core::{ActionKind, AgentId, GridPos, ResourceKind, Terrain, UpgradeKind};

/// Error produced when a wire payload cannot be encoded or decoded.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload was not a well-formed message of any known kind.
    #[error("malformed wire message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Any message that may cross the client/server boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Message {
    /// Client-to-server action proposal for one tick.
    Action(ActionMessage),
    /// Server-to-client authoritative state slice.
    Update(UpdateMessage),
    /// Server-to-client handshake sent once per connection.
    Init(InitMessage),
    /// Server broadcast ending the match.
    GameOver(GameOverMessage),
}

/// One agent's proposed action and movement for a single tick.
///
/// Every field other than the agent id is optional; an all-empty message is
/// a valid no-op tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMessage {
    /// Agent submitting the proposal.
    pub agent_id: AgentId,
    /// Discrete action proposed this tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionKind>,
    /// Destination cell proposed this tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<GridPos>,
    /// Rival targeted by an attack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<AgentId>,
    /// Upgrade kind named by an upgrade action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_kind: Option<UpgradeKind>,
}

/// Authoritative per-agent state slice sent every tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    /// Tick the slice was captured at.
    pub tick: u64,
    /// The receiving agent's own authoritative state.
    #[serde(rename = "self")]
    pub own: OwnState,
    /// Terrain of every cell inside the vision radius.
    pub tiles: Vec<TileCell>,
    /// Resources inside the vision radius.
    pub resources: Vec<ResourceCell>,
    /// Living rivals inside the vision radius.
    pub others: Vec<RivalCell>,
}

/// The receiving agent's own authoritative state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnState {
    /// Horizontal cell coordinate.
    pub x: i32,
    /// Vertical cell coordinate.
    pub y: i32,
    /// Current health.
    pub health: f32,
    /// Health ceiling.
    pub max_health: f32,
    /// Current ammo reserve.
    pub ammo: u32,
    /// Full inventory in deterministic key order.
    pub inventory: BTreeMap<ResourceKind, u32>,
}

/// One visible tile and its terrain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileCell {
    /// Horizontal cell coordinate.
    pub x: i32,
    /// Vertical cell coordinate.
    pub y: i32,
    /// Terrain occupying the cell.
    pub terrain: Terrain,
}

/// One visible resource entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceCell {
    /// Horizontal cell coordinate.
    pub x: i32,
    /// Vertical cell coordinate.
    pub y: i32,
    /// Kind of resource available.
    pub kind: ResourceKind,
    /// Units granted on collection.
    pub amount: u32,
}

/// One visible rival and its observable stats.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RivalCell {
    /// Rival identifier.
    pub id: AgentId,
    /// Horizontal cell coordinate.
    pub x: i32,
    /// Vertical cell coordinate.
    pub y: i32,
    /// Rival health.
    pub health: f32,
    /// Rival ammo reserve.
    pub ammo: u32,
}

/// Handshake payload sent once when an agent joins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitMessage {
    /// Identifier assigned to the joining agent.
    pub agent_id: AgentId,
    /// Cell the agent spawns on.
    pub spawn: GridPos,
    /// Full static map description.
    pub map: MapDescription,
}

/// Static map layout shared at handshake time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapDescription {
    /// Number of tile columns.
    pub width: u32,
    /// Number of tile rows.
    pub height: u32,
    /// Terrain rows in row-major order.
    pub grid: Vec<Vec<Terrain>>,
}

/// Match-ending broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverMessage {
    /// Last agent standing, or `null` when nobody survived.
    pub winner_id: Option<AgentId>,
}

/// Encodes a message as a JSON string.
pub fn encode(message: &Message) -> Result<String, CodecError> {
    Ok(serde_json::to_string(message)?)
}

/// Decodes a JSON string into a message.
pub fn decode(text: &str) -> Result<Message, CodecError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn as_value(message: &Message) -> Value {
        serde_json::to_value(message).expect("serialize")
    }

    #[test]
    fn action_message_uses_the_agreed_field_names() {
        let message = Message::Action(ActionMessage {
            agent_id: AgentId::new(1),
            action: Some(ActionKind::Attack),
            position: Some(GridPos::new(4, 7)),
            target_id: Some(AgentId::new(2)),
            upgrade_kind: None,
        });
        assert_eq!(
            as_value(&message),
            json!({
                "kind": "action",
                "agentId": 1,
                "action": "ATTACK",
                "position": { "x": 4, "y": 7 },
                "targetId": 2,
            })
        );
    }

    #[test]
    fn empty_action_message_omits_optional_fields() {
        let message = Message::Action(ActionMessage {
            agent_id: AgentId::new(3),
            action: None,
            position: None,
            target_id: None,
            upgrade_kind: None,
        });
        assert_eq!(
            as_value(&message),
            json!({ "kind": "action", "agentId": 3 })
        );
    }

    #[test]
    fn upgrade_action_names_the_kind() {
        let message = Message::Action(ActionMessage {
            agent_id: AgentId::new(1),
            action: Some(ActionKind::Upgrade),
            position: None,
            target_id: None,
            upgrade_kind: Some(UpgradeKind::MaxHealth),
        });
        assert_eq!(
            as_value(&message),
            json!({
                "kind": "action",
                "agentId": 1,
                "action": "UPGRADE",
                "upgradeKind": "MAX_HEALTH",
            })
        );
    }

    #[test]
    fn update_message_matches_the_wire_shape() {
        let mut inventory = BTreeMap::new();
        let _ = inventory.insert(ResourceKind::Food, 2);
        let _ = inventory.insert(ResourceKind::Scrap, 7);
        let message = Message::Update(UpdateMessage {
            tick: 42,
            own: OwnState {
                x: 5,
                y: 6,
                health: 87.5,
                max_health: 100.0,
                ammo: 12,
                inventory,
            },
            tiles: vec![TileCell {
                x: 5,
                y: 6,
                terrain: Terrain::Mud,
            }],
            resources: vec![ResourceCell {
                x: 7,
                y: 6,
                kind: ResourceKind::Ammo,
                amount: 8,
            }],
            others: vec![RivalCell {
                id: AgentId::new(2),
                x: 9,
                y: 4,
                health: 55.0,
                ammo: 3,
            }],
        });
        assert_eq!(
            as_value(&message),
            json!({
                "kind": "update",
                "tick": 42,
                "self": {
                    "x": 5,
                    "y": 6,
                    "health": 87.5,
                    "maxHealth": 100.0,
                    "ammo": 12,
                    "inventory": { "food": 2, "scrap": 7 },
                },
                "tiles": [ { "x": 5, "y": 6, "terrain": "mud" } ],
                "resources": [ { "x": 7, "y": 6, "kind": "ammo", "amount": 8 } ],
                "others": [ { "id": 2, "x": 9, "y": 4, "health": 55.0, "ammo": 3 } ],
            })
        );
    }

    #[test]
    fn init_message_matches_the_wire_shape() {
        let message = Message::Init(InitMessage {
            agent_id: AgentId::new(1),
            spawn: GridPos::new(2, 2),
            map: MapDescription {
                width: 2,
                height: 1,
                grid: vec![vec![Terrain::Floor, Terrain::Wall]],
            },
        });
        assert_eq!(
            as_value(&message),
            json!({
                "kind": "init",
                "agentId": 1,
                "spawn": { "x": 2, "y": 2 },
                "map": { "width": 2, "height": 1, "grid": [["floor", "wall"]] },
            })
        );
    }

    #[test]
    fn game_over_keeps_an_explicit_null_winner() {
        let message = Message::GameOver(GameOverMessage { winner_id: None });
        assert_eq!(
            as_value(&message),
            json!({ "kind": "gameOver", "winnerId": null })
        );
        let message = Message::GameOver(GameOverMessage {
            winner_id: Some(AgentId::new(2)),
        });
        assert_eq!(
            as_value(&message),
            json!({ "kind": "gameOver", "winnerId": 2 })
        );
    }

    #[test]
    fn messages_survive_an_encode_decode_cycle() {
        let message = Message::Action(ActionMessage {
            agent_id: AgentId::new(9),
            action: Some(ActionKind::Scavenge),
            position: Some(GridPos::new(-1, 3)),
            target_id: None,
            upgrade_kind: None,
        });
        let text = encode(&message).expect("encode");
        assert_eq!(decode(&text).expect("decode"), message);
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        assert!(decode(r#"{ "kind": "teleport", "agentId": 1 }"#).is_err());
        assert!(decode("not json at all").is_err());
    }
}
