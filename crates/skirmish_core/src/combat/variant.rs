//! Character roster: one variant tag plus a capability table.
//!
//! Behaviour that differs between characters is looked up from
//! [`CharacterVariant::capabilities`] and [`default_loadout`] instead of being
//! spread over per-character types.

use super::buff::BuffKind;
use super::descriptor::{Activation, AttackDescriptor, Delivery, HitShape, ProjectileKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterVariant {
    /// Knight
    #[default]
    MeleeSingle,
    /// Berserker
    MeleeFrontalAoe,
    /// Archer
    RangedSingle,
    /// Mage
    RangedCaster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Stamina,
    Mana,
}

/// Hold keeps the secondary action up while the input is held; trigger runs
/// it once for a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SecondaryMode {
    Hold,
    Trigger { duration_secs: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondaryAction {
    pub name: &'static str,
    pub mode: SecondaryMode,
    /// Started on release (hold) or on activation (trigger)
    pub cooldown_secs: f64,
    /// Applied for as long as the action is active
    pub effect: BuffKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capabilities {
    pub has_ranged_attack: bool,
    pub has_aoe: bool,
    pub resource: ResourceKind,
    /// Shots aimed behind the current facing snap to the facing axis
    pub direction_lock: bool,
    /// Projectiles per shot, fanned across the configured spread
    pub multishot: u8,
    /// Whether the body carries a melee contact hitbox
    pub melee_hitbox: bool,
    pub max_health: f32,
    pub max_secondary: f32,
    pub secondary_regen_per_sec: f32,
    pub move_speed: f32,
    pub secondary: SecondaryAction,
}

impl CharacterVariant {
    pub const ALL: [CharacterVariant; 4] = [
        CharacterVariant::MeleeSingle,
        CharacterVariant::MeleeFrontalAoe,
        CharacterVariant::RangedSingle,
        CharacterVariant::RangedCaster,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            CharacterVariant::MeleeSingle => "Knight",
            CharacterVariant::MeleeFrontalAoe => "Berserker",
            CharacterVariant::RangedSingle => "Archer",
            CharacterVariant::RangedCaster => "Mage",
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            CharacterVariant::MeleeSingle => Capabilities {
                has_ranged_attack: false,
                has_aoe: false,
                resource: ResourceKind::Stamina,
                direction_lock: false,
                multishot: 1,
                melee_hitbox: true,
                max_health: 150.0,
                max_secondary: 100.0,
                secondary_regen_per_sec: 12.0,
                move_speed: 5.0,
                secondary: SecondaryAction {
                    name: "block",
                    mode: SecondaryMode::Hold,
                    cooldown_secs: 0.5,
                    effect: BuffKind::Protection(0.5),
                },
            },
            CharacterVariant::MeleeFrontalAoe => Capabilities {
                has_ranged_attack: false,
                has_aoe: true,
                resource: ResourceKind::Stamina,
                direction_lock: false,
                multishot: 1,
                melee_hitbox: true,
                max_health: 130.0,
                max_secondary: 100.0,
                secondary_regen_per_sec: 10.0,
                move_speed: 5.5,
                secondary: SecondaryAction {
                    name: "war_cry",
                    mode: SecondaryMode::Trigger { duration_secs: 3.0 },
                    cooldown_secs: 8.0,
                    effect: BuffKind::DamageBoost(1.5),
                },
            },
            CharacterVariant::RangedSingle => Capabilities {
                has_ranged_attack: true,
                has_aoe: false,
                resource: ResourceKind::Stamina,
                direction_lock: true,
                multishot: 1,
                melee_hitbox: false,
                max_health: 100.0,
                max_secondary: 100.0,
                secondary_regen_per_sec: 15.0,
                move_speed: 6.0,
                secondary: SecondaryAction {
                    name: "evade",
                    mode: SecondaryMode::Trigger { duration_secs: 0.6 },
                    cooldown_secs: 4.0,
                    effect: BuffKind::Protection(0.25),
                },
            },
            CharacterVariant::RangedCaster => Capabilities {
                has_ranged_attack: true,
                has_aoe: true,
                resource: ResourceKind::Mana,
                direction_lock: false,
                multishot: 3,
                melee_hitbox: false,
                max_health: 90.0,
                max_secondary: 120.0,
                secondary_regen_per_sec: 8.0,
                move_speed: 5.0,
                secondary: SecondaryAction {
                    name: "barrier",
                    mode: SecondaryMode::Hold,
                    cooldown_secs: 1.0,
                    effect: BuffKind::Protection(0.7),
                },
            },
        }
    }
}

fn attack(
    name: &str,
    damage: f32,
    cooldown_secs: f64,
    range: f32,
    resource_cost: f32,
    activation: Activation,
    delivery: Delivery,
) -> AttackDescriptor {
    AttackDescriptor {
        name: name.to_string(),
        damage,
        cooldown_secs,
        range,
        resource_cost,
        animation_key: format!("attack_{name}"),
        activation,
        delivery,
        cast_time_secs: 0.0,
    }
}

/// The two attack slots every variant ships with.
pub fn default_loadout(variant: CharacterVariant) -> Vec<AttackDescriptor> {
    match variant {
        CharacterVariant::MeleeSingle => vec![
            attack("slash", 20.0, 0.8, 1.6, 0.0, Activation::Hold, Delivery::Melee {
                shape: HitShape::Single,
                window_secs: 0.25,
            }),
            attack("heavy_strike", 35.0, 3.0, 1.8, 25.0, Activation::Trigger, Delivery::Melee {
                shape: HitShape::Single,
                window_secs: 0.3,
            }),
        ],
        CharacterVariant::MeleeFrontalAoe => vec![
            attack("cleave", 15.0, 1.0, 2.0, 0.0, Activation::Hold, Delivery::Melee {
                shape: HitShape::Frontal { half_angle_deg: 60.0 },
                window_secs: 0.3,
            }),
            attack("whirlwind", 25.0, 5.0, 2.5, 40.0, Activation::Trigger, Delivery::Melee {
                shape: HitShape::Around,
                window_secs: 0.4,
            }),
        ],
        CharacterVariant::RangedSingle => vec![
            attack("shot", 12.0, 0.6, 12.0, 0.0, Activation::Hold, Delivery::Projectile {
                key: ProjectileKey::new("arrow"),
            }),
            AttackDescriptor {
                cast_time_secs: 0.4,
                ..attack("power_shot", 30.0, 3.0, 14.0, 30.0, Activation::Trigger, Delivery::Projectile {
                    key: ProjectileKey::new("arrow"),
                })
            },
        ],
        CharacterVariant::RangedCaster => vec![
            attack("firebolt", 10.0, 1.0, 10.0, 10.0, Activation::Trigger, Delivery::Projectile {
                key: ProjectileKey::new("firebolt"),
            }),
            AttackDescriptor {
                cast_time_secs: 1.0,
                ..attack("meteor", 40.0, 6.0, 9.0, 50.0, Activation::Trigger, Delivery::Area {
                    radius: 3.0,
                    effect_key: "meteor_impact".to_string(),
                })
            },
        ],
    }
}
