//! Clamped numeric pools for health and the secondary stat.

/// Result of applying damage to a pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoolHit {
    /// The pool was already dead; nothing changed
    AlreadyDead,
    Damaged { old: f32, new: f32 },
    /// Reached exactly zero and the dead flag was set by this call
    Killed { old: f32 },
}

/// A value in `[0, max]`.
///
/// Health pools use the protection multiplier and the terminal `dead` flag;
/// secondary-stat pools use debit and regeneration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePool {
    current: f32,
    max: f32,
    protection: f32,
    dead: bool,
}

impl ResourcePool {
    /// A full pool with neutral protection.
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self {
            current: max,
            max,
            protection: 1.0,
            dead: false,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn protection(&self) -> f32 {
        self.protection
    }

    pub fn set_protection(&mut self, multiplier: f32) {
        self.protection = multiplier.max(0.0);
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Applies `delta = -amount * protection`, clamps into `[0, max]` and
    /// sets `dead` exactly once when the result is zero. A non-finite amount
    /// changes nothing.
    pub fn apply_damage(&mut self, amount: f32) -> PoolHit {
        if self.dead {
            return PoolHit::AlreadyDead;
        }

        let old = self.current;
        if !amount.is_finite() {
            return PoolHit::Damaged { old, new: old };
        }
        let delta = -amount * self.protection;
        self.current = (old + delta).clamp(0.0, self.max);

        if self.current == 0.0 {
            self.dead = true;
            PoolHit::Killed { old }
        } else {
            PoolHit::Damaged {
                old,
                new: self.current,
            }
        }
    }

    /// Debits `cost` only if the whole amount is available.
    pub fn try_debit(&mut self, cost: f32) -> bool {
        if cost <= 0.0 {
            return true;
        }
        if self.current < cost {
            return false;
        }
        self.current = (self.current - cost).clamp(0.0, self.max);
        true
    }

    /// Adds `rate * dt`, capped at max. Returns true when the value changed.
    pub fn regenerate(&mut self, rate_per_sec: f32, dt: f64) -> bool {
        if self.dead || rate_per_sec <= 0.0 || self.current >= self.max {
            return false;
        }
        let old = self.current;
        self.current = (old + rate_per_sec * dt as f32).min(self.max);
        self.current != old
    }
}
