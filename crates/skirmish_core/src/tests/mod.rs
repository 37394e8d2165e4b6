//! End-to-end tests driving the authority through its public surface.

mod lifecycle;
mod scenarios;

use crate::authority::Authority;
use crate::combat::{
    Activation, AttackDescriptor, AttackRegistry, CharacterVariant, Delivery, HitShape,
    ProjectileKey, ProjectileRegistry,
};
use crate::config::CombatConfig;
use crate::entity::SpawnProfile;
use crate::events::{BroadcastEvent, TickOutput};
use crate::replication::{FieldKey, FieldValue};
use crate::types::{EntityId, SessionId, TeamIndex, Vec2};
use std::sync::Arc;

/// Fixed step used by tests that compare kinematics step by step.
pub(crate) const STEP: f64 = 1.0 / 60.0;

pub(crate) fn authority() -> Authority {
    Authority::new(CombatConfig::default()).expect("default config is valid")
}

pub(crate) fn authority_with_loadout(variant: CharacterVariant, attacks: Vec<AttackDescriptor>) -> Authority {
    let mut registry = AttackRegistry::with_defaults();
    registry.register(variant, attacks);
    Authority::with_registries(
        CombatConfig::default(),
        Arc::new(registry),
        Arc::new(ProjectileRegistry::with_defaults()),
    )
    .expect("default config is valid")
}

pub(crate) fn melee(name: &str, damage: f32, cooldown_secs: f64, activation: Activation) -> AttackDescriptor {
    AttackDescriptor {
        name: name.to_string(),
        damage,
        cooldown_secs,
        range: 1.6,
        resource_cost: 0.0,
        animation_key: format!("attack_{name}"),
        activation,
        delivery: Delivery::Melee {
            shape: HitShape::Single,
            window_secs: 0.25,
        },
        cast_time_secs: 0.0,
    }
}

pub(crate) fn bolt(name: &str, cost: f32, cooldown_secs: f64) -> AttackDescriptor {
    AttackDescriptor {
        name: name.to_string(),
        damage: 10.0,
        cooldown_secs,
        range: 10.0,
        resource_cost: cost,
        animation_key: format!("attack_{name}"),
        activation: Activation::Trigger,
        delivery: Delivery::Projectile {
            key: ProjectileKey::new("firebolt"),
        },
        cast_time_secs: 0.0,
    }
}

pub(crate) fn join(
    authority: &mut Authority,
    name: &str,
    variant: CharacterVariant,
    team: i32,
) -> (SessionId, EntityId) {
    let session = SessionId::new();
    let entity = authority
        .join(session, SpawnProfile::new(name, variant, TeamIndex(team)))
        .expect("fresh session joins");
    (session, entity)
}

pub(crate) fn place(authority: &mut Authority, entity: EntityId, position: Vec2) {
    authority
        .entity_mut(entity)
        .expect("entity is live")
        .position = position;
}

pub(crate) fn count_events(outputs: &[TickOutput], predicate: impl Fn(&BroadcastEvent) -> bool) -> usize {
    outputs
        .iter()
        .flat_map(|o| o.events.iter())
        .filter(|e| predicate(e))
        .count()
}

pub(crate) fn health_updates(output: &TickOutput, entity: EntityId) -> Vec<FieldValue> {
    output
        .fields
        .iter()
        .filter(|u| u.entity == entity && u.key == FieldKey::CurrentHealth)
        .map(|u| u.new.clone())
        .collect()
}

/// Runs `ticks` ticks of `dt` and collects every output.
pub(crate) fn run(authority: &mut Authority, ticks: usize, dt: f64) -> Vec<TickOutput> {
    (0..ticks).map(|_| authority.tick(dt)).collect()
}
