//! Per-slot cooldown bookkeeping plus the global attack gate.

use std::collections::BTreeMap;

/// Tolerance for accumulated floating-point tick durations.
const TIME_EPSILON: f64 = 1e-9;

/// Key of one cooldown entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKey {
    Attack(usize),
    /// Reserved for the secondary / off-hand action
    Secondary,
}

/// Remaining seconds per slot. Entries only decrease between ticks and are
/// reset to the descriptor value at commit.
#[derive(Debug, Clone, Default)]
pub struct CooldownLedger {
    remaining: BTreeMap<SlotKey, f64>,
    last_attack_at: Option<f64>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remaining(&self, key: SlotKey) -> f64 {
        self.remaining.get(&key).copied().unwrap_or(0.0)
    }

    pub fn is_ready(&self, key: SlotKey) -> bool {
        self.remaining(key) <= 0.0
    }

    /// True when at least `global_cooldown` seconds have passed since the
    /// last committed attack.
    pub fn global_ready(&self, now: f64, global_cooldown: f64) -> bool {
        self.last_attack_at
            .map_or(true, |at| now - at + TIME_EPSILON >= global_cooldown)
    }

    pub fn last_attack_at(&self) -> Option<f64> {
        self.last_attack_at
    }

    /// Records a committed attack: resets the slot and the global gate.
    pub fn commit_attack(&mut self, slot: usize, cooldown: f64, now: f64) {
        self.remaining.insert(SlotKey::Attack(slot), cooldown.max(0.0));
        self.last_attack_at = Some(now);
    }

    /// Starts a cooldown without touching the global gate.
    pub fn start(&mut self, key: SlotKey, cooldown: f64) {
        self.remaining.insert(key, cooldown.max(0.0));
    }

    /// Subtracts `dt` from every running entry, flooring at zero.
    pub fn decay(&mut self, dt: f64) {
        for remaining in self.remaining.values_mut() {
            if *remaining > 0.0 {
                *remaining -= dt;
                if *remaining <= TIME_EPSILON {
                    *remaining = 0.0;
                }
            }
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (SlotKey, f64)> + '_ {
        self.remaining.iter().map(|(k, v)| (*k, *v))
    }
}
