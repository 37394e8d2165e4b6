//! Tunable combat constants.
//!
//! Every field carries a serde default so partial `[combat]` tables in the
//! server's TOML file fill in the rest.

use crate::error::CoreError;
use crate::types::Vec2;
use serde::{Deserialize, Serialize};

fn default_global_cooldown() -> f64 {
    0.5
}

fn default_fixed_timestep() -> f64 {
    1.0 / 60.0
}

fn default_respawn_delay() -> f64 {
    5.0
}

fn default_retained_coin_fraction() -> f64 {
    0.66
}

fn default_contact_hit_cooldown() -> f64 {
    0.5
}

fn default_multishot_spread() -> f32 {
    30.0
}

fn default_interact_radius() -> f32 {
    1.5
}

fn default_entity_radius() -> f32 {
    0.5
}

fn default_kill_reward() -> u64 {
    10
}

fn default_spawn_points() -> Vec<Vec2> {
    vec![
        Vec2::new(-20.0, 0.0),
        Vec2::new(20.0, 0.0),
        Vec2::new(-20.0, 12.0),
        Vec2::new(20.0, 12.0),
    ]
}

/// Combat and lifecycle tuning shared by the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Minimum seconds between two committed attacks of one entity
    #[serde(default = "default_global_cooldown")]
    pub global_cooldown_secs: f64,

    /// Physics step for movement, projectiles and contact checks
    #[serde(default = "default_fixed_timestep")]
    pub fixed_timestep_secs: f64,

    #[serde(default = "default_respawn_delay")]
    pub respawn_delay_secs: f64,

    /// Share of the wallet kept through a death, floored
    #[serde(default = "default_retained_coin_fraction")]
    pub retained_coin_fraction: f64,

    /// Per-attacker limiter for melee overlap hits
    #[serde(default = "default_contact_hit_cooldown")]
    pub contact_hit_cooldown_secs: f64,

    /// Total fan angle for multi-shot variants, in degrees
    #[serde(default = "default_multishot_spread")]
    pub multishot_spread_degrees: f32,

    #[serde(default = "default_interact_radius")]
    pub interact_radius: f32,

    /// Collision radius of every entity body
    #[serde(default = "default_entity_radius")]
    pub entity_radius: f32,

    /// Coins credited to the attacker for each kill
    #[serde(default = "default_kill_reward")]
    pub kill_reward_coins: u64,

    /// Used when no spawn point is registered
    #[serde(default)]
    pub default_spawn_point: Vec2,

    #[serde(default = "default_spawn_points")]
    pub spawn_points: Vec<Vec2>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            global_cooldown_secs: default_global_cooldown(),
            fixed_timestep_secs: default_fixed_timestep(),
            respawn_delay_secs: default_respawn_delay(),
            retained_coin_fraction: default_retained_coin_fraction(),
            contact_hit_cooldown_secs: default_contact_hit_cooldown(),
            multishot_spread_degrees: default_multishot_spread(),
            interact_radius: default_interact_radius(),
            entity_radius: default_entity_radius(),
            kill_reward_coins: default_kill_reward(),
            default_spawn_point: Vec2::ZERO,
            spawn_points: default_spawn_points(),
        }
    }
}

impl CombatConfig {
    /// Checks ranges that would otherwise break the tick loop.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.fixed_timestep_secs > 0.0) {
            return Err(CoreError::InvalidConfig(
                "fixed_timestep_secs must be greater than 0".to_string(),
            ));
        }
        if self.global_cooldown_secs < 0.0 {
            return Err(CoreError::InvalidConfig(
                "global_cooldown_secs cannot be negative".to_string(),
            ));
        }
        if self.respawn_delay_secs < 0.0 {
            return Err(CoreError::InvalidConfig(
                "respawn_delay_secs cannot be negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retained_coin_fraction) {
            return Err(CoreError::InvalidConfig(format!(
                "retained_coin_fraction must be within [0, 1], got {}",
                self.retained_coin_fraction
            )));
        }
        if self.contact_hit_cooldown_secs < 0.0 {
            return Err(CoreError::InvalidConfig(
                "contact_hit_cooldown_secs cannot be negative".to_string(),
            ));
        }
        if !(self.entity_radius > 0.0) {
            return Err(CoreError::InvalidConfig(
                "entity_radius must be greater than 0".to_string(),
            ));
        }
        if self.spawn_points.iter().any(|p| !p.is_finite()) {
            return Err(CoreError::InvalidConfig(
                "spawn_points must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
