//! Wire frames exchanged with clients.
//!
//! Every frame is one JSON text message tagged by `type`. The first frame of
//! a session must be a join:
//!
//! ```json
//! { "type": "join", "name": "ada", "variant": "ranged_single", "team": 1 }
//! ```
//!
//! Afterwards each frame carries one command:
//!
//! ```json
//! { "type": "command", "command": "attack_primary", "pressed": true, "aim": { "x": 4.0, "y": 1.5 } }
//! ```

use serde::{Deserialize, Serialize};
use skirmish_core::{
    CharacterVariant, Command, EntityId, FieldUpdate, SessionId, SpawnProfile, TeamIndex, TickOutput,
};

/// A frame sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        name: String,
        #[serde(default)]
        variant: CharacterVariant,
        #[serde(default)]
        team: TeamIndex,
    },
    Command(Command),
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Command(command) => command.name(),
        }
    }

    /// Spawn metadata carried by a join frame.
    pub fn spawn_profile(&self) -> Option<SpawnProfile> {
        match self {
            ClientMessage::Join { name, variant, team } => Some(SpawnProfile::new(name.clone(), *variant, *team)),
            ClientMessage::Command(_) => None,
        }
    }
}

/// A frame pushed from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to a successful join
    Welcome {
        session: SessionId,
        entity: EntityId,
        tick_interval_ms: u64,
        /// Every live field at its current version
        snapshot: Vec<FieldUpdate>,
    },
    /// Field updates and broadcast events of one authority tick
    Tick(TickOutput),
    /// Resynchronisation for a session that skipped tick frames
    Snapshot { fields: Vec<FieldUpdate> },
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{Event, Vec2};

    #[test]
    fn test_join_frame_fills_defaults() {
        let message: ClientMessage = serde_json::from_str(r#"{"type":"join","name":"ada"}"#).expect("valid join");
        let profile = message.spawn_profile().expect("join carries a profile");
        assert_eq!(profile.name, "ada");
        assert_eq!(profile.variant, CharacterVariant::MeleeSingle);
        assert_eq!(profile.team, TeamIndex::NONE);
    }

    #[test]
    fn test_command_frame_decodes_inner_command() {
        let message: ClientMessage = serde_json::from_str(
            r#"{"type":"command","command":"attack_primary","pressed":true,"aim":{"x":4.0,"y":1.5}}"#,
        )
        .expect("valid command");
        assert_eq!(
            message,
            ClientMessage::Command(Command::AttackPrimary {
                pressed: true,
                aim: Some(Vec2::new(4.0, 1.5)),
            })
        );
        assert_eq!(message.kind(), "attack_primary");

        let interact: ClientMessage =
            serde_json::from_str(r#"{"type":"command","command":"interact"}"#).expect("unit command");
        assert_eq!(interact, ClientMessage::Command(Command::Interact));
    }

    #[test]
    fn test_server_frames_use_the_event_codec() {
        let frame = ServerMessage::error("unknown_variant", "no loadout");
        let bytes = Event::serialize(&frame).expect("serializes");
        let text = String::from_utf8(bytes).expect("utf8");
        assert!(text.contains(r#""type":"error""#));
        assert_eq!(<ServerMessage as Event>::deserialize(text.as_bytes()).expect("parses"), frame);
    }
}
