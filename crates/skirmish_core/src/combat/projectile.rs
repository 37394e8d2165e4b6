//! Projectile aiming, authoritative flight and observer-side visual twins.

use super::descriptor::{ProjectileKey, ProjectileSpec};
use crate::types::{EntityId, ProjectileId, TeamIndex, Vec2};

/// Computes the base shot direction.
///
/// With `direction_lock`, an aim point behind the current facing snaps the
/// shot to the facing axis. A missing or degenerate aim also falls back to
/// the facing axis.
pub fn shot_direction(spawn: Vec2, aim: Option<Vec2>, facing_left: bool, direction_lock: bool) -> Vec2 {
    let facing = Vec2::facing_axis(facing_left);
    let Some(toward) = aim.and_then(|a| (a - spawn).try_normalize()) else {
        return facing;
    };
    if direction_lock && toward.dot(facing) < 0.0 {
        facing
    } else {
        toward
    }
}

/// Spreads `count` directions evenly across `spread_deg`, centred on `base`.
pub fn fan_directions(base: Vec2, count: u8, spread_deg: f32) -> Vec<Vec2> {
    if count <= 1 {
        return vec![base];
    }
    let spread = spread_deg.to_radians();
    let step = spread / f32::from(count - 1);
    (0..count)
        .map(|i| base.rotated(-spread / 2.0 + step * f32::from(i)))
        .collect()
}

/// Everything needed to launch one authoritative projectile.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOrder {
    pub spawn: Vec2,
    pub direction: Vec2,
    pub key: ProjectileKey,
    pub attacker: EntityId,
    pub team: TeamIndex,
    /// Base damage; the launcher applies the attacker's damage buffs
    pub damage: f32,
}

/// An authoritative projectile: carries damage and collides.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: ProjectileId,
    pub key: ProjectileKey,
    pub attacker: EntityId,
    pub team: TeamIndex,
    pub position: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub radius: f32,
    pub damage: f32,
    pub remaining_secs: f32,
}

impl Projectile {
    /// Moves one step. Returns false once the lifetime has run out.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.position += self.direction * (self.speed * dt);
        self.remaining_secs -= dt;
        self.remaining_secs > 0.0
    }
}

/// Live authoritative projectiles.
#[derive(Debug, Default)]
pub struct ProjectileSet {
    next_id: u64,
    live: Vec<Projectile>,
}

impl ProjectileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launch(&mut self, spec: &ProjectileSpec, order: LaunchOrder) -> &Projectile {
        self.next_id += 1;
        let direction = order.direction.try_normalize().unwrap_or(Vec2::RIGHT);
        self.live.push(Projectile {
            id: ProjectileId(self.next_id),
            key: order.key,
            attacker: order.attacker,
            team: order.team,
            position: order.spawn,
            direction,
            speed: spec.speed,
            radius: spec.radius,
            damage: order.damage,
            remaining_secs: spec.lifetime_secs,
        });
        let index = self.live.len() - 1;
        &self.live[index]
    }

    /// Takes every live projectile out for a simulation step.
    pub fn take(&mut self) -> Vec<Projectile> {
        std::mem::take(&mut self.live)
    }

    /// Returns survivors of a step.
    pub fn restore(&mut self, survivors: Vec<Projectile>) {
        self.live.extend(survivors);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.live.iter()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

/// Observer-side twin with identical kinematics. It has no damage and no
/// collision; it only exists so every client draws the same flight.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualProjectile {
    pub key: ProjectileKey,
    pub team: TeamIndex,
    pub position: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub remaining_secs: f32,
}

impl VisualProjectile {
    pub fn advance(&mut self, dt: f32) -> bool {
        self.position += self.direction * (self.speed * dt);
        self.remaining_secs -= dt;
        self.remaining_secs > 0.0
    }
}
