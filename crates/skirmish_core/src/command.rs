//! Inbound session commands.
//!
//! Commands are intents: the authority validates each one when it drains the
//! inbox and silently drops any that fail.

use crate::types::{SessionId, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Desired movement direction; magnitude is clamped to 1
    Move { vector: Vec2 },
    /// Primary attack button. `aim` is the world-space aim point, if any.
    AttackPrimary {
        pressed: bool,
        #[serde(default)]
        aim: Option<Vec2>,
    },
    AttackSecondary { pressed: bool },
    ChangeAttackSlot { index: usize },
    Interact,
    /// Camera zoom; carries no gameplay effect on the authority
    Zoom { delta: f32 },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Move { .. } => "move",
            Command::AttackPrimary { .. } => "attack_primary",
            Command::AttackSecondary { .. } => "attack_secondary",
            Command::ChangeAttackSlot { .. } => "change_attack_slot",
            Command::Interact => "interact",
            Command::Zoom { .. } => "zoom",
        }
    }

    /// Rejects payloads that carry NaN or infinite numbers.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Command::Move { vector } => vector.is_finite(),
            Command::AttackPrimary { aim, .. } => aim.map_or(true, Vec2::is_finite),
            Command::Zoom { delta } => delta.is_finite(),
            _ => true,
        }
    }
}

/// A command tagged with its sender, in receipt order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCommand {
    pub session: SessionId,
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let json = r#"{"command":"attack_primary","pressed":true,"aim":{"x":3.0,"y":1.0}}"#;
        let command: Command = serde_json::from_str(json).expect("valid command");
        assert_eq!(
            command,
            Command::AttackPrimary {
                pressed: true,
                aim: Some(Vec2::new(3.0, 1.0)),
            }
        );

        let bare: Command = serde_json::from_str(r#"{"command":"attack_primary","pressed":false}"#)
            .expect("aim is optional");
        assert_eq!(bare, Command::AttackPrimary { pressed: false, aim: None });

        let interact: Command = serde_json::from_str(r#"{"command":"interact"}"#).expect("unit command");
        assert_eq!(interact.name(), "interact");
    }

    #[test]
    fn test_non_finite_payloads_are_malformed() {
        assert!(!Command::Zoom { delta: f32::NAN }.is_well_formed());
        assert!(!Command::Move { vector: Vec2::new(f32::INFINITY, 0.0) }.is_well_formed());
        assert!(Command::ChangeAttackSlot { index: 1 }.is_well_formed());
    }
}
