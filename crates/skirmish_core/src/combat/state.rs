//! Per-entity combat state machine.
//!
//! `Idle -> Attacking` on a validated attack intent, `Attacking -> Idle` once
//! the slot cooldown has run out and a full global cooldown has elapsed since
//! the commit. Both transitions happen only on the authority clock; there is
//! no separate timer callback. Secondary actions use the same machine with a
//! hold/trigger bit from the variant's capability table.

use super::cooldown::{CooldownLedger, SlotKey};
use super::descriptor::AttackDescriptor;
use super::pool::ResourcePool;
use super::variant::{SecondaryAction, SecondaryMode};
use crate::types::Vec2;

const TIME_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionState {
    Idle,
    Attacking { slot: usize },
    /// `until` is set for trigger actions and `None` while a hold lasts
    SecondaryActing { until: Option<f64> },
}

/// Why an intent was dropped. Only used for logging and tests; intents are
/// never answered with an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    Dead,
    Busy,
    GlobalCooldown,
    SlotCooldown { remaining: f64 },
    InsufficientResource { cost: f32, available: f32 },
    UnknownSlot(usize),
}

/// Transitions that happened during [`CombatState::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickTransitions {
    pub attack_cleared: bool,
    pub secondary_cleared: bool,
}

#[derive(Debug, Clone)]
pub struct CombatState {
    state: ActionState,
    active_slot: usize,
    ledger: CooldownLedger,
    primary_held: bool,
    aim: Option<Vec2>,
}

impl Default for CombatState {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatState {
    pub fn new() -> Self {
        Self {
            state: ActionState::Idle,
            active_slot: 0,
            ledger: CooldownLedger::new(),
            primary_held: false,
            aim: None,
        }
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ActionState::Idle
    }

    pub fn is_attacking(&self) -> bool {
        matches!(self.state, ActionState::Attacking { .. })
    }

    pub fn is_secondary_acting(&self) -> bool {
        matches!(self.state, ActionState::SecondaryActing { .. })
    }

    pub fn active_slot(&self) -> usize {
        self.active_slot
    }

    pub fn ledger(&self) -> &CooldownLedger {
        &self.ledger
    }

    pub fn primary_held(&self) -> bool {
        self.primary_held
    }

    pub fn aim(&self) -> Option<Vec2> {
        self.aim
    }

    pub fn set_primary_input(&mut self, held: bool, aim: Option<Vec2>) {
        self.primary_held = held;
        if aim.is_some() {
            self.aim = aim;
        }
    }

    /// Validates and commits an attack with the active slot.
    ///
    /// On success the resource cost has been debited, the slot and global
    /// cooldowns restarted and the machine is `Attacking`. On failure nothing
    /// changed.
    pub fn try_begin_attack(
        &mut self,
        now: f64,
        global_cooldown: f64,
        descriptor: &AttackDescriptor,
        resource: Option<&mut ResourcePool>,
        dead: bool,
    ) -> Result<usize, Rejection> {
        if dead {
            return Err(Rejection::Dead);
        }
        if self.state != ActionState::Idle {
            return Err(Rejection::Busy);
        }
        if !self.ledger.global_ready(now, global_cooldown) {
            return Err(Rejection::GlobalCooldown);
        }

        let slot = self.active_slot;
        let remaining = self.ledger.remaining(SlotKey::Attack(slot));
        if remaining > 0.0 {
            return Err(Rejection::SlotCooldown { remaining });
        }

        if descriptor.has_cost() {
            match resource {
                Some(pool) => {
                    if !pool.try_debit(descriptor.resource_cost) {
                        return Err(Rejection::InsufficientResource {
                            cost: descriptor.resource_cost,
                            available: pool.current(),
                        });
                    }
                }
                None => {
                    return Err(Rejection::InsufficientResource {
                        cost: descriptor.resource_cost,
                        available: 0.0,
                    })
                }
            }
        }

        self.ledger.commit_attack(slot, descriptor.cooldown_secs, now);
        self.state = ActionState::Attacking { slot };
        Ok(slot)
    }

    /// Slot changes are only accepted while idle.
    pub fn change_slot(&mut self, index: usize, slot_count: usize) -> Result<bool, Rejection> {
        if self.state != ActionState::Idle {
            return Err(Rejection::Busy);
        }
        if index >= slot_count {
            return Err(Rejection::UnknownSlot(index));
        }
        let changed = self.active_slot != index;
        self.active_slot = index;
        Ok(changed)
    }

    pub fn begin_secondary(
        &mut self,
        now: f64,
        action: &SecondaryAction,
        dead: bool,
    ) -> Result<(), Rejection> {
        if dead {
            return Err(Rejection::Dead);
        }
        if self.state != ActionState::Idle {
            return Err(Rejection::Busy);
        }
        let remaining = self.ledger.remaining(SlotKey::Secondary);
        if remaining > 0.0 {
            return Err(Rejection::SlotCooldown { remaining });
        }

        self.state = match action.mode {
            SecondaryMode::Hold => ActionState::SecondaryActing { until: None },
            SecondaryMode::Trigger { duration_secs } => {
                self.ledger.start(SlotKey::Secondary, action.cooldown_secs);
                ActionState::SecondaryActing {
                    until: Some(now + duration_secs),
                }
            }
        };
        Ok(())
    }

    /// Ends a held secondary action. Trigger actions ignore the release and
    /// run out on their own.
    pub fn release_secondary(&mut self, action: &SecondaryAction) -> bool {
        match (self.state, action.mode) {
            (ActionState::SecondaryActing { until: None }, SecondaryMode::Hold) => {
                self.state = ActionState::Idle;
                self.ledger.start(SlotKey::Secondary, action.cooldown_secs);
                true
            }
            _ => false,
        }
    }

    /// Decays cooldowns by `dt` and runs the clock-driven transitions.
    pub fn tick(&mut self, now: f64, dt: f64, global_cooldown: f64) -> TickTransitions {
        self.ledger.decay(dt);

        let mut transitions = TickTransitions::default();
        match self.state {
            ActionState::Attacking { slot }
                if self.ledger.is_ready(SlotKey::Attack(slot))
                    && self.ledger.global_ready(now, global_cooldown) =>
            {
                self.state = ActionState::Idle;
                transitions.attack_cleared = true;
            }
            ActionState::SecondaryActing { until: Some(until) } if now + TIME_EPSILON >= until => {
                self.state = ActionState::Idle;
                transitions.secondary_cleared = true;
            }
            _ => {}
        }
        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::buff::BuffKind;
    use crate::combat::descriptor::{Activation, Delivery, HitShape};

    const GCD: f64 = 0.5;

    fn descriptor(cooldown: f64, cost: f32) -> AttackDescriptor {
        AttackDescriptor {
            name: "test".to_string(),
            damage: 10.0,
            cooldown_secs: cooldown,
            range: 1.0,
            resource_cost: cost,
            animation_key: "attack_test".to_string(),
            activation: Activation::Trigger,
            delivery: Delivery::Melee {
                shape: HitShape::Single,
                window_secs: 0.2,
            },
            cast_time_secs: 0.0,
        }
    }

    fn hold_block() -> SecondaryAction {
        SecondaryAction {
            name: "block",
            mode: SecondaryMode::Hold,
            cooldown_secs: 0.5,
            effect: BuffKind::Protection(0.5),
        }
    }

    #[test]
    fn test_two_second_cooldown_timeline() {
        let mut combat = CombatState::new();
        let attack = descriptor(2.0, 0.0);

        assert_eq!(combat.try_begin_attack(0.0, GCD, &attack, None, false), Ok(0));
        assert_eq!(combat.ledger().remaining(SlotKey::Attack(0)), 2.0);

        combat.tick(1.0, 1.0, GCD);
        assert_eq!(combat.ledger().remaining(SlotKey::Attack(0)), 1.0);
        assert!(combat.try_begin_attack(1.0, GCD, &attack, None, false).is_err());

        let transitions = combat.tick(2.1, 1.1, GCD);
        assert!(transitions.attack_cleared);
        assert_eq!(combat.try_begin_attack(2.1, GCD, &attack, None, false), Ok(0));
    }

    #[test]
    fn test_global_cooldown_gates_other_slots() {
        let mut combat = CombatState::new();
        let instant = descriptor(0.0, 0.0);
        combat.try_begin_attack(0.0, GCD, &instant, None, false).expect("first attack");
        combat.tick(0.1, 0.1, GCD);
        assert!(combat.is_attacking(), "held until the global cooldown passes");

        combat.tick(0.5, 0.4, GCD);
        assert!(combat.is_idle());
        combat.change_slot(1, 2).expect("idle slot change");
        combat.try_begin_attack(0.5, GCD, &instant, None, false).expect("second attack");
    }

    #[test]
    fn test_resource_cost_is_all_or_nothing() {
        let mut combat = CombatState::new();
        let mut mana = ResourcePool::new(30.0);
        let spell = descriptor(0.0, 20.0);

        combat.try_begin_attack(0.0, GCD, &spell, Some(&mut mana), false).expect("affordable");
        combat.tick(1.0, 1.0, GCD);
        let rejection = combat.try_begin_attack(1.0, GCD, &spell, Some(&mut mana), false);
        assert_eq!(rejection, Err(Rejection::InsufficientResource { cost: 20.0, available: 10.0 }));
        assert_eq!(mana.current(), 10.0);
        assert!(combat.is_idle());
    }

    #[test]
    fn test_dead_entities_cannot_act() {
        let mut combat = CombatState::new();
        assert_eq!(
            combat.try_begin_attack(0.0, GCD, &descriptor(1.0, 0.0), None, true),
            Err(Rejection::Dead)
        );
        assert_eq!(combat.begin_secondary(0.0, &hold_block(), true), Err(Rejection::Dead));
        assert!(combat.ledger().last_attack_at().is_none());
    }

    #[test]
    fn test_slot_change_requires_idle() {
        let mut combat = CombatState::new();
        combat.try_begin_attack(0.0, GCD, &descriptor(1.0, 0.0), None, false).expect("attack");
        assert_eq!(combat.change_slot(1, 2), Err(Rejection::Busy));
        combat.tick(1.0, 1.0, GCD);
        assert_eq!(combat.change_slot(5, 2), Err(Rejection::UnknownSlot(5)));
        assert_eq!(combat.change_slot(1, 2), Ok(true));
        assert_eq!(combat.change_slot(1, 2), Ok(false));
        assert_eq!(combat.active_slot(), 1);
    }

    #[test]
    fn test_hold_secondary_lasts_until_release() {
        let mut combat = CombatState::new();
        let block = hold_block();
        combat.begin_secondary(0.0, &block, false).expect("block starts");
        combat.tick(10.0, 10.0, GCD);
        assert!(combat.is_secondary_acting());

        assert!(combat.release_secondary(&block));
        assert!(combat.is_idle());
        assert_eq!(combat.begin_secondary(10.1, &block, false), Err(Rejection::SlotCooldown { remaining: 0.5 }));
    }

    #[test]
    fn test_trigger_secondary_resets_on_its_own() {
        let mut combat = CombatState::new();
        let evade = SecondaryAction {
            name: "evade",
            mode: SecondaryMode::Trigger { duration_secs: 0.6 },
            cooldown_secs: 4.0,
            effect: BuffKind::Protection(0.25),
        };
        combat.begin_secondary(0.0, &evade, false).expect("evade starts");
        assert!(!combat.release_secondary(&evade));
        assert!(combat.is_secondary_acting());

        assert!(!combat.tick(0.3, 0.3, GCD).secondary_cleared);
        assert!(combat.tick(0.6, 0.3, GCD).secondary_cleared);
        assert!(combat.is_idle());
        assert!(combat.begin_secondary(0.6, &evade, false).is_err());
    }

    #[test]
    fn test_attack_blocked_while_secondary_active() {
        let mut combat = CombatState::new();
        combat.begin_secondary(0.0, &hold_block(), false).expect("block");
        assert_eq!(
            combat.try_begin_attack(0.0, GCD, &descriptor(1.0, 0.0), None, false),
            Err(Rejection::Busy)
        );
    }
}
