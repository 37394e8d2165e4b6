//! Damage rules shared by melee contact, projectiles and area effects.
//!
//! [`resolve_hit`] is the single step that mutates a target's health. It runs
//! under `&mut` access to the target, so two calls against the same target can
//! never interleave; the authority tick serializes all callers.

use super::descriptor::HitShape;
use super::pool::{PoolHit, ResourcePool};
use crate::types::{EntityId, TeamIndex, Vec2};
use std::collections::HashMap;

/// Half angle of the narrow cone used by single-target melee.
pub const SINGLE_TARGET_HALF_ANGLE_DEG: f32 = 45.0;

/// Transient description of one hit. Never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub attacker: EntityId,
    pub target: EntityId,
    pub amount: f32,
    pub attacker_team: TeamIndex,
    pub target_team: TeamIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageRejection {
    UnknownTarget,
    TargetDead,
    FriendlyFire,
    SelfDamage,
    /// NaN or infinite amount
    InvalidAmount,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    Applied { old: f32, new: f32 },
    /// Health reached zero; the caller emits the death event and credits
    /// the kill exactly once
    Killed { old: f32 },
    Rejected(DamageRejection),
}

impl DamageOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, DamageOutcome::Rejected(_))
    }
}

/// Team and self exclusion, checked before any health is touched.
pub fn check_eligibility(event: &DamageEvent) -> Result<(), DamageRejection> {
    if event.attacker_team.is_allied_with(event.target_team) {
        return Err(DamageRejection::FriendlyFire);
    }
    if event.attacker == event.target {
        return Err(DamageRejection::SelfDamage);
    }
    Ok(())
}

/// Applies one damage event to the target's health pool.
pub fn resolve_hit(event: &DamageEvent, health: &mut ResourcePool) -> DamageOutcome {
    if health.is_dead() {
        return DamageOutcome::Rejected(DamageRejection::TargetDead);
    }
    if let Err(rejection) = check_eligibility(event) {
        return DamageOutcome::Rejected(rejection);
    }
    if !event.amount.is_finite() {
        return DamageOutcome::Rejected(DamageRejection::InvalidAmount);
    }

    match health.apply_damage(event.amount) {
        PoolHit::AlreadyDead => DamageOutcome::Rejected(DamageRejection::TargetDead),
        PoolHit::Damaged { old, new } => DamageOutcome::Applied { old, new },
        PoolHit::Killed { old } => DamageOutcome::Killed { old },
    }
}

/// True when `target` lies within `range` of `origin` and inside the cone of
/// `half_angle_deg` around `forward`.
pub fn cone_contains(origin: Vec2, forward: Vec2, target: Vec2, range: f32, half_angle_deg: f32) -> bool {
    let delta = target - origin;
    let distance = delta.length();
    if distance > range {
        return false;
    }
    match delta.try_normalize() {
        Some(direction) => forward.dot(direction) >= half_angle_deg.to_radians().cos(),
        // overlapping bodies always connect
        None => true,
    }
}

/// Whether a melee hitbox of `shape` reaches `target`.
pub fn melee_reaches(shape: HitShape, origin: Vec2, facing: Vec2, range: f32, target: Vec2) -> bool {
    match shape {
        HitShape::Single => cone_contains(origin, facing, target, range, SINGLE_TARGET_HALF_ANGLE_DEG),
        HitShape::Frontal { half_angle_deg } => cone_contains(origin, facing, target, range, half_angle_deg),
        HitShape::Around => origin.distance(target) <= range,
    }
}

/// Rate limiter for overlap-based melee hits, separate from the attack
/// cooldown ledger. Allows at most one hit registration per simulation step
/// per attacker hitbox, and none until the contact cooldown has passed.
#[derive(Debug, Clone)]
pub struct ContactLimiter {
    cooldown_secs: f64,
    entries: HashMap<EntityId, ContactEntry>,
}

#[derive(Debug, Clone, Copy)]
struct ContactEntry {
    ready_at: f64,
    last_step: u64,
}

impl ContactLimiter {
    pub fn new(cooldown_secs: f64) -> Self {
        Self {
            cooldown_secs,
            entries: HashMap::new(),
        }
    }

    /// Claims the hit registration for `attacker` at `now` during `step`.
    pub fn try_register(&mut self, attacker: EntityId, now: f64, step: u64) -> bool {
        if let Some(entry) = self.entries.get(&attacker) {
            if entry.last_step == step || now + 1e-9 < entry.ready_at {
                return false;
            }
        }
        self.entries.insert(
            attacker,
            ContactEntry {
                ready_at: now + self.cooldown_secs,
                last_step: step,
            },
        );
        true
    }

    pub fn forget(&mut self, attacker: EntityId) {
        self.entries.remove(&attacker);
    }
}
