//! Observer side of the replication boundary.
//!
//! [`ObserverView`] consumes the authority's tick batches: it mirrors field
//! values, spawns non-authoritative projectile twins and forwards broadcast
//! events to presentation handlers. [`LocalPredictor`] is the optimistic
//! pre-check a client runs before sending an attack intent.

use crate::combat::{AttackDescriptor, CooldownLedger, SlotKey, VisualProjectile};
use crate::command::Command;
use crate::events::{BroadcastEvent, TickOutput};
use crate::replication::{FieldFilter, FieldKey, FieldUpdate, FieldValue, ObserverMirror, SubscriptionId};
use crate::types::{EntityId, ProjectileId, Vec2};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

pub type EventHandler = Box<dyn FnMut(&BroadcastEvent) + Send>;

#[derive(Default)]
pub struct ObserverView {
    mirror: ObserverMirror,
    visuals: BTreeMap<ProjectileId, VisualProjectile>,
    handlers: Vec<EventHandler>,
    last_tick: u64,
}

impl std::fmt::Debug for ObserverView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverView")
            .field("mirror", &self.mirror)
            .field("visuals", &self.visuals.len())
            .field("handlers", &self.handlers.len())
            .field("last_tick", &self.last_tick)
            .finish()
    }
}

impl ObserverView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one tick batch: field updates first, then events.
    pub fn apply(&mut self, output: &TickOutput) {
        if output.tick <= self.last_tick {
            trace!("⏭️ Replayed tick {} (last applied {})", output.tick, self.last_tick);
        }
        self.last_tick = self.last_tick.max(output.tick);

        for update in &output.fields {
            self.mirror.apply(update);
        }

        for event in &output.events {
            match event {
                BroadcastEvent::ProjectileVisual {
                    projectile,
                    key,
                    team,
                    position,
                    direction,
                    speed,
                    lifetime_secs,
                    ..
                } => {
                    self.visuals.entry(*projectile).or_insert_with(|| VisualProjectile {
                        key: key.clone(),
                        team: *team,
                        position: *position,
                        direction: *direction,
                        speed: *speed,
                        remaining_secs: *lifetime_secs,
                    });
                }
                BroadcastEvent::Despawned { entity } => {
                    self.mirror.forget_entity(*entity);
                    debug!("👁️ Forgot fields of {}", entity);
                }
                _ => {}
            }
            for handler in &mut self.handlers {
                handler(event);
            }
        }
    }

    /// Applies a full field snapshot. Entries older than what the mirror
    /// holds are ignored like any other stale update, and mirrored entities
    /// the snapshot no longer lists are retired.
    pub fn apply_snapshot(&mut self, fields: &[FieldUpdate]) {
        let live: HashSet<EntityId> = fields.iter().map(|update| update.entity).collect();
        let pruned = self.mirror.retain_entities(&live);
        let applied = fields.iter().filter(|update| self.mirror.apply(update)).count();
        debug!(
            "👁️ Applied {} of {} snapshot field(s), pruned {} entit(ies)",
            applied,
            fields.len(),
            pruned
        );
    }

    /// Moves every visual twin forward and drops the expired ones.
    pub fn advance_visuals(&mut self, dt: f32) {
        self.visuals.retain(|_, visual| visual.advance(dt));
    }

    pub fn visual(&self, id: ProjectileId) -> Option<&VisualProjectile> {
        self.visuals.get(&id)
    }

    pub fn visual_count(&self) -> usize {
        self.visuals.len()
    }

    pub fn read(&self, entity: EntityId, key: FieldKey) -> Option<&FieldValue> {
        self.mirror.read(entity, key)
    }

    pub fn mirror(&self) -> &ObserverMirror {
        &self.mirror
    }

    pub fn last_tick(&self) -> u64 {
        self.last_tick
    }

    pub fn subscribe<F>(&mut self, filter: FieldFilter, handler: F) -> SubscriptionId
    where
        F: FnMut(&FieldUpdate) + Send + 'static,
    {
        self.mirror.subscribe(filter, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.mirror.unsubscribe(id)
    }

    pub fn on_event<F>(&mut self, handler: F)
    where
        F: FnMut(&BroadcastEvent) + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }
}

/// Client-side optimistic attack gate.
///
/// Mirrors the authority's cooldown and cost checks so the client can skip
/// sending intents that would certainly be dropped. The authority still
/// re-validates everything.
#[derive(Debug, Clone)]
pub struct LocalPredictor {
    loadout: Arc<[AttackDescriptor]>,
    global_cooldown_secs: f64,
    ledger: CooldownLedger,
    active_slot: usize,
    secondary_value: f32,
    input_blocked: bool,
}

impl LocalPredictor {
    pub fn new(loadout: Arc<[AttackDescriptor]>, global_cooldown_secs: f64) -> Self {
        Self {
            loadout,
            global_cooldown_secs,
            ledger: CooldownLedger::new(),
            active_slot: 0,
            secondary_value: 0.0,
            input_blocked: false,
        }
    }

    /// Menus and other UI overlays swallow attack input.
    pub fn set_input_blocked(&mut self, blocked: bool) {
        self.input_blocked = blocked;
    }

    pub fn is_input_blocked(&self) -> bool {
        self.input_blocked
    }

    /// Feeds mirrored values for the locally controlled entity.
    pub fn observe(&mut self, update: &FieldUpdate) {
        match update.key {
            FieldKey::CurrentSecondaryStat => {
                if let Some(value) = update.new.as_float() {
                    self.secondary_value = value;
                }
            }
            FieldKey::ActiveAttackSlot => {
                if let Some(slot) = update.new.as_int().and_then(|s| usize::try_from(s).ok()) {
                    self.active_slot = slot;
                }
            }
            _ => {}
        }
    }

    pub fn advance(&mut self, dt: f64) {
        self.ledger.decay(dt);
    }

    pub fn can_attack(&self, now: f64) -> bool {
        let Some(descriptor) = self.loadout.get(self.active_slot) else {
            return false;
        };
        !self.input_blocked
            && self.ledger.global_ready(now, self.global_cooldown_secs)
            && self.ledger.is_ready(SlotKey::Attack(self.active_slot))
            && (!descriptor.has_cost() || self.secondary_value >= descriptor.resource_cost)
    }

    /// Returns the command to send when the local pre-check passes, and
    /// starts the local cooldowns optimistically.
    pub fn press_attack(&mut self, now: f64, aim: Option<Vec2>) -> Option<Command> {
        if !self.can_attack(now) {
            trace!("🚫 Local pre-check held back attack at t={:.2}", now);
            return None;
        }
        let descriptor = self.loadout.get(self.active_slot)?;
        self.ledger.commit_attack(self.active_slot, descriptor.cooldown_secs, now);
        Some(Command::AttackPrimary { pressed: true, aim })
    }
}
