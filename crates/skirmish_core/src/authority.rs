//! # Authority
//!
//! The single owner of gameplay state. One value of [`Authority`] is created
//! per match and driven by exactly one task; every other participant only
//! sees its [`TickOutput`]s.
//!
//! ## Tick order
//!
//! 1. Advance the clock, decay cooldowns, clear finished attacks and trigger
//!    secondaries, regenerate the secondary stat
//! 2. Run scheduled tasks that are due (respawns, buff expiry, cast release)
//! 3. Drain the inbox in receipt order
//! 4. Re-attempt attacks whose hold-activated button is still down
//! 5. Run fixed physics steps: movement, projectiles, melee contact
//! 6. Flush the replication store into the tick's output
//!
//! Intents that fail validation are dropped with a trace log. Only the
//! join/disconnect paths return errors.

use crate::combat::{
    fan_directions, melee_reaches, resolve_hit, shot_direction, Activation, AttackDescriptor,
    AttackRegistry, BuffId, BuffKind, CharacterVariant, ContactLimiter, DamageEvent, DamageOutcome, DamageRejection,
    Delivery, HitShape, LaunchOrder, Projectile, ProjectileRegistry, ProjectileSet, SecondaryMode,
};
use crate::command::{Command, QueuedCommand};
use crate::config::CombatConfig;
use crate::entity::{ActiveSwing, Entity, SpawnProfile};
use crate::error::{CoreError, LifecycleError};
use crate::events::{BroadcastEvent, TickOutput};
use crate::lifecycle::{EntityRegistry, LeaderboardRow, LifecycleManager, RespawnTicket, SpawnPoints};
use crate::pickup::{PickupId, PickupKind, PickupSet};
use crate::replication::{
    FieldFilter, FieldKey, FieldUpdate, FieldValue, ReplicationStore, Role, SubscriptionId,
};
use crate::scheduler::Scheduler;
use crate::types::{EntityId, ProjectileId, SessionId, TeamIndex, Vec2};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

const TIME_EPSILON: f64 = 1e-9;

/// Upper bound on physics steps per tick after a stall.
const MAX_STEPS_PER_TICK: u32 = 120;

/// Delayed work run on the authority clock.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledTask {
    Respawn(RespawnTicket),
    ExpireBuff { entity: EntityId, buff: BuffId },
    /// Effect of an attack with a cast time
    ReleaseCast {
        entity: EntityId,
        slot: usize,
        aim: Option<Vec2>,
    },
}

impl ScheduledTask {
    fn entity(&self) -> Option<EntityId> {
        match self {
            ScheduledTask::Respawn(_) => None,
            ScheduledTask::ExpireBuff { entity, .. } | ScheduledTask::ReleaseCast { entity, .. } => Some(*entity),
        }
    }

    fn respawn_session(&self) -> Option<SessionId> {
        match self {
            ScheduledTask::Respawn(ticket) => Some(ticket.session),
            _ => None,
        }
    }
}

fn publish(store: &mut ReplicationStore, role: Role, entity: EntityId, key: FieldKey, value: impl Into<FieldValue>) {
    if let Err(e) = store.write(role, entity, key, value) {
        error!("❌ Failed to publish {:?} for {}: {}", key, entity, e);
    }
}

fn end_secondary_effect(entity: &mut Entity) {
    if let Some(buff) = entity.secondary_buff.take() {
        entity.buffs.remove(buff);
        entity.refresh_protection();
    }
}

#[derive(Debug)]
pub struct Authority {
    config: CombatConfig,
    attacks: Arc<AttackRegistry>,
    projectile_specs: Arc<ProjectileRegistry>,
    store: ReplicationStore,
    registry: EntityRegistry,
    lifecycle: LifecycleManager,
    spawns: SpawnPoints,
    scheduler: Scheduler<ScheduledTask>,
    projectiles: ProjectileSet,
    pickups: PickupSet,
    contacts: ContactLimiter,
    /// Sessions of entities that died, so hits still in flight credit them
    fallen: HashMap<EntityId, SessionId>,
    inbox: VecDeque<QueuedCommand>,
    events: Vec<BroadcastEvent>,
    now: f64,
    tick: u64,
    step: u64,
    accumulator: f64,
    next_buff: u64,
}

impl Authority {
    /// Creates an authority with the default roster and projectile kinds.
    pub fn new(config: CombatConfig) -> Result<Self, CoreError> {
        Self::with_registries(
            config,
            Arc::new(AttackRegistry::with_defaults()),
            Arc::new(ProjectileRegistry::with_defaults()),
        )
    }

    pub fn with_registries(
        config: CombatConfig,
        attacks: Arc<AttackRegistry>,
        projectile_specs: Arc<ProjectileRegistry>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        Ok(Self {
            lifecycle: LifecycleManager::new(config.respawn_delay_secs, config.retained_coin_fraction),
            spawns: SpawnPoints::new(config.spawn_points.clone(), config.default_spawn_point),
            contacts: ContactLimiter::new(config.contact_hit_cooldown_secs),
            fallen: HashMap::new(),
            attacks,
            projectile_specs,
            store: ReplicationStore::new(),
            registry: EntityRegistry::new(),
            scheduler: Scheduler::new(),
            projectiles: ProjectileSet::new(),
            pickups: PickupSet::new(),
            inbox: VecDeque::new(),
            events: Vec::new(),
            now: 0.0,
            tick: 0,
            step: 0,
            accumulator: 0.0,
            next_buff: 0,
            config,
        })
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Registers a session and spawns its first entity.
    ///
    /// A variant without a registered loadout falls back to the default
    /// variant; the join only fails when that one is missing too.
    pub fn join(&mut self, session: SessionId, mut profile: SpawnProfile) -> Result<EntityId, LifecycleError> {
        if !self.attacks.has_variant(profile.variant) {
            let fallback = CharacterVariant::default();
            if profile.variant == fallback || !self.attacks.has_variant(fallback) {
                warn!("⚠️ No loadout for {:?}, refusing session {}", profile.variant, session);
                return Err(LifecycleError::UnknownVariant(profile.variant));
            }
            error!(
                "❌ No loadout for {:?}, session {} falls back to {:?}",
                profile.variant, session, fallback
            );
            profile.variant = fallback;
        }
        self.lifecycle.register_session(session, profile.clone())?;

        let stale = self
            .scheduler
            .cancel_where(|task| task.respawn_session() == Some(session));
        if stale > 0 {
            debug!("🧹 Cancelled {} stale respawn(s) for session {}", stale, session);
        }

        let position = self.spawns.for_join(profile.team);
        let variant = profile.variant;
        let entity = match self.spawn_entity(session, profile, position, 0, 0) {
            Ok(entity) => entity,
            Err(e) => {
                let _ = self.lifecycle.unregister_session(session);
                return Err(e);
            }
        };
        info!(
            "🎮 Session {} joined as {} ({}) at {}",
            session,
            entity,
            variant.display_name(),
            position
        );
        Ok(entity)
    }

    /// Ends a session: queued commands are cancelled and the live entity is
    /// despawned. A pending respawn stays scheduled and is discarded when it
    /// fires.
    pub fn disconnect(&mut self, session: SessionId) -> Result<(), LifecycleError> {
        self.lifecycle.unregister_session(session)?;

        let queued = self.inbox.len();
        self.inbox.retain(|pending| pending.session != session);
        let cancelled = queued - self.inbox.len();

        if let Some(entity) = self.registry.entity_for_session(session) {
            self.despawn(entity);
        }
        self.fallen.retain(|_, fallen| *fallen != session);
        info!(
            "👋 Session {} disconnected ({} queued command(s) cancelled)",
            session, cancelled
        );
        Ok(())
    }

    /// Queues a command for the next tick.
    pub fn submit(&mut self, session: SessionId, command: Command) {
        if !command.is_well_formed() {
            trace!("🚫 Dropping malformed {} from {}", command.name(), session);
            return;
        }
        self.inbox.push_back(QueuedCommand { session, command });
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advances the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> TickOutput {
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            warn!("⚠️ Ignoring invalid tick duration {}", dt);
            0.0
        };
        self.now += dt;
        self.tick += 1;

        self.update_timers(dt);
        self.run_due_tasks();
        self.drain_inbox();
        self.repeat_held_attacks();
        self.run_physics(dt);
        self.publish_positions();

        TickOutput {
            tick: self.tick,
            time: self.now,
            fields: self.store.flush(),
            events: std::mem::take(&mut self.events),
        }
    }

    fn update_timers(&mut self, dt: f64) {
        let now = self.now;
        let global_cooldown = self.config.global_cooldown_secs;

        for entity in self.registry.iter_mut() {
            if entity.is_dead() {
                continue;
            }
            let id = entity.id;
            let transitions = entity.combat.tick(now, dt, global_cooldown);
            if transitions.attack_cleared {
                publish(&mut self.store, Role::Authority, id, FieldKey::IsAttacking, false);
            }
            if transitions.secondary_cleared {
                end_secondary_effect(entity);
                publish(&mut self.store, Role::Authority, id, FieldKey::IsSecondaryActing, false);
            }

            let rate = entity.capabilities.secondary_regen_per_sec;
            if let Some(pool) = entity.secondary.as_mut() {
                if pool.regenerate(rate, dt) {
                    publish(&mut self.store, Role::Authority, id, FieldKey::CurrentSecondaryStat, pool.current());
                }
            }
        }
    }

    fn run_due_tasks(&mut self) {
        for task in self.scheduler.pop_due(self.now) {
            match task {
                ScheduledTask::Respawn(ticket) => self.respawn(ticket),
                ScheduledTask::ExpireBuff { entity, buff } => self.expire_buff(entity, buff),
                ScheduledTask::ReleaseCast { entity, slot, aim } => self.release_cast(entity, slot, aim),
            }
        }
    }

    fn drain_inbox(&mut self) {
        while let Some(QueuedCommand { session, command }) = self.inbox.pop_front() {
            self.handle_command(session, command);
        }
    }

    fn repeat_held_attacks(&mut self) {
        let attacks = Arc::clone(&self.attacks);
        let held: Vec<EntityId> = self
            .registry
            .iter()
            .filter(|e| !e.is_dead() && e.combat.primary_held() && e.combat.is_idle())
            .filter(|e| {
                attacks
                    .descriptor(e.variant(), e.combat.active_slot())
                    .is_some_and(|d| d.activation == Activation::Hold)
            })
            .map(|e| e.id)
            .collect();

        for id in held {
            self.try_attack(id);
        }
    }

    fn run_physics(&mut self, dt: f64) {
        let fixed = self.config.fixed_timestep_secs;
        self.accumulator += dt;

        let mut steps = 0;
        while self.accumulator + TIME_EPSILON >= fixed {
            if steps == MAX_STEPS_PER_TICK {
                warn!("⏱️ Physics fell behind, dropping {:.3}s of simulation", self.accumulator);
                self.accumulator = 0.0;
                break;
            }
            self.accumulator -= fixed;
            self.step += 1;
            steps += 1;

            let step_time = self.now - self.accumulator.max(0.0);
            self.integrate_movement(fixed as f32);
            self.step_projectiles(fixed as f32);
            self.resolve_melee_contacts(step_time);
        }
    }

    fn publish_positions(&mut self) {
        for entity in self.registry.iter() {
            publish(
                &mut self.store,
                Role::Owner(entity.session),
                entity.id,
                FieldKey::Position,
                entity.position,
            );
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn handle_command(&mut self, session: SessionId, command: Command) {
        let Some(id) = self.registry.entity_for_session(session) else {
            trace!("🚫 Dropping {} from {} without a live entity", command.name(), session);
            return;
        };

        match command {
            Command::Move { vector } => self.handle_move(id, session, vector),
            Command::AttackPrimary { pressed, aim } => self.handle_primary(id, pressed, aim),
            Command::AttackSecondary { pressed } => self.handle_secondary(id, pressed),
            Command::ChangeAttackSlot { index } => self.handle_change_slot(id, session, index),
            Command::Interact => self.handle_interact(id),
            Command::Zoom { delta } => trace!("🔍 Zoom {:+.2} from {}", delta, session),
        }
    }

    /// Movement and facing are trusted from the owning session.
    fn handle_move(&mut self, id: EntityId, session: SessionId, vector: Vec2) {
        let Some(entity) = self.registry.get_mut(id) else { return };
        if entity.is_dead() {
            return;
        }

        entity.move_intent = vector.clamp_length(1.0);
        let owner = Role::Owner(session);
        publish(&mut self.store, owner, id, FieldKey::IsMoving, entity.is_moving());
        if entity.move_intent.x != 0.0 {
            entity.facing_left = entity.move_intent.x < 0.0;
            publish(&mut self.store, owner, id, FieldKey::IsFacingLeft, entity.facing_left);
        }
    }

    fn handle_primary(&mut self, id: EntityId, pressed: bool, aim: Option<Vec2>) {
        let Some(entity) = self.registry.get_mut(id) else { return };
        entity.combat.set_primary_input(pressed, aim);
        if pressed {
            self.try_attack(id);
        }
    }

    fn handle_secondary(&mut self, id: EntityId, pressed: bool) {
        let now = self.now;
        let Some(entity) = self.registry.get_mut(id) else { return };
        let action = entity.capabilities.secondary;

        if pressed {
            let dead = entity.is_dead();
            if let Err(rejection) = entity.combat.begin_secondary(now, &action, dead) {
                trace!("🚫 {} {} rejected: {:?}", id, action.name, rejection);
                return;
            }

            self.next_buff += 1;
            let buff = BuffId(self.next_buff);
            entity.buffs.grant(buff, action.effect);
            entity.secondary_buff = Some(buff);
            entity.refresh_protection();
            publish(&mut self.store, Role::Authority, id, FieldKey::IsSecondaryActing, true);

            // hold actions last until release, shown as an open-ended icon
            let duration_secs = match action.mode {
                SecondaryMode::Trigger { duration_secs } => duration_secs,
                SecondaryMode::Hold => 0.0,
            };
            self.events.push(BroadcastEvent::BuffIcon {
                entity: id,
                kind: action.effect,
                duration_secs,
            });
            debug!("🛡️ {} started {}", id, action.name);
        } else if entity.combat.release_secondary(&action) {
            end_secondary_effect(entity);
            publish(&mut self.store, Role::Authority, id, FieldKey::IsSecondaryActing, false);
            debug!("🛡️ {} released {}", id, action.name);
        }
    }

    fn handle_change_slot(&mut self, id: EntityId, session: SessionId, index: usize) {
        let Some(entity) = self.registry.get_mut(id) else { return };
        let slot_count = self.attacks.slot_count(entity.variant());

        match entity.combat.change_slot(index, slot_count) {
            Ok(true) => publish(&mut self.store, Role::Owner(session), id, FieldKey::ActiveAttackSlot, index),
            Ok(false) => {}
            Err(rejection) => trace!("🚫 {} slot change to {} rejected: {:?}", id, index, rejection),
        }
    }

    fn handle_interact(&mut self, id: EntityId) {
        let Some(entity) = self.registry.get_mut(id) else { return };
        if entity.is_dead() {
            return;
        }
        let Some(pickup) = self.pickups.take_nearest(entity.position, self.config.interact_radius) else {
            trace!("🤲 Nothing in reach of {}", id);
            return;
        };

        match pickup.kind {
            PickupKind::Coins { amount } => {
                entity.coins = entity.coins.saturating_add(amount);
                publish(&mut self.store, Role::Authority, id, FieldKey::CoinCount, entity.coins);
                debug!("🪙 {} picked up {} coin(s)", id, amount);
            }
            PickupKind::Buff { kind, duration_secs } => {
                self.grant_buff(id, kind, duration_secs);
            }
        }
    }

    // ------------------------------------------------------------------
    // Attacks
    // ------------------------------------------------------------------

    fn try_attack(&mut self, id: EntityId) -> bool {
        let now = self.now;
        let global_cooldown = self.config.global_cooldown_secs;
        let attacks = Arc::clone(&self.attacks);

        let Some(entity) = self.registry.get_mut(id) else { return false };
        let slot = entity.combat.active_slot();
        let Some(descriptor) = attacks.descriptor(entity.variant(), slot) else {
            error!("❌ {} has no attack in slot {} for {:?}", id, slot, entity.variant());
            return false;
        };

        let dead = entity.is_dead();
        let slot = match entity
            .combat
            .try_begin_attack(now, global_cooldown, descriptor, entity.secondary.as_mut(), dead)
        {
            Ok(slot) => slot,
            Err(rejection) => {
                trace!("🚫 {} {} rejected: {:?}", id, descriptor.name, rejection);
                return false;
            }
        };

        publish(&mut self.store, Role::Authority, id, FieldKey::IsAttacking, true);
        if descriptor.has_cost() {
            publish(&mut self.store, Role::Authority, id, FieldKey::CurrentSecondaryStat, entity.secondary_value());
        }
        let aim = entity.combat.aim();
        self.events.push(BroadcastEvent::AttackCommitted {
            entity: id,
            slot,
            animation_key: descriptor.animation_key.clone(),
        });
        debug!("⚔️ {} committed {} (slot {})", id, descriptor.name, slot);

        if descriptor.cast_time_secs > 0.0 {
            self.scheduler.schedule(
                now + descriptor.cast_time_secs,
                ScheduledTask::ReleaseCast { entity: id, slot, aim },
            );
        } else {
            self.release_attack(id, descriptor, aim);
        }
        true
    }

    fn release_cast(&mut self, id: EntityId, slot: usize, aim: Option<Vec2>) {
        let attacks = Arc::clone(&self.attacks);
        let Some(entity) = self.registry.get(id).filter(|e| !e.is_dead()) else {
            debug!("💨 Cast of {} dropped, caster is gone", id);
            return;
        };
        let Some(descriptor) = attacks.descriptor(entity.variant(), slot) else {
            error!("❌ Cast of {} lost its descriptor for slot {}", id, slot);
            return;
        };
        self.release_attack(id, descriptor, aim);
    }

    /// Produces the effect of a committed attack.
    fn release_attack(&mut self, id: EntityId, descriptor: &AttackDescriptor, aim: Option<Vec2>) {
        let now = self.now;
        let Some(entity) = self.registry.get_mut(id) else { return };

        match &descriptor.delivery {
            Delivery::Melee { shape, window_secs } => {
                let damage = descriptor.damage * entity.buffs.damage_multiplier();
                match entity.hitbox.as_mut() {
                    Some(hitbox) => {
                        hitbox.swing = Some(ActiveSwing {
                            shape: *shape,
                            range: descriptor.range,
                            damage,
                            until: now + window_secs,
                        });
                    }
                    None if !entity.warned_missing_hitbox => {
                        entity.warned_missing_hitbox = true;
                        warn!("⚠️ {} has no melee hitbox, {} deals no contact damage", id, descriptor.name);
                    }
                    None => {}
                }
            }
            Delivery::Projectile { key } => {
                let spawn = entity.position;
                let team = entity.team();
                let base = shot_direction(spawn, aim, entity.facing_left, entity.capabilities.direction_lock);
                let directions =
                    fan_directions(base, entity.capabilities.multishot, self.config.multishot_spread_degrees);
                for direction in directions {
                    self.launch_projectile(LaunchOrder {
                        spawn,
                        direction,
                        key: key.clone(),
                        attacker: id,
                        team,
                        damage: descriptor.damage,
                    });
                }
            }
            Delivery::Area { radius, effect_key } => {
                let damage = descriptor.damage * entity.buffs.damage_multiplier();
                let origin = entity.position;
                let centre = match aim {
                    Some(point) => origin + (point - origin).clamp_length(descriptor.range),
                    None => origin + entity.facing() * descriptor.range,
                };
                self.events.push(BroadcastEvent::AreaEffect {
                    key: effect_key.clone(),
                    position: centre,
                    radius: *radius,
                });

                let targets: Vec<EntityId> = self
                    .registry
                    .iter()
                    .filter(|t| t.id != id && t.position.distance(centre) <= *radius)
                    .map(|t| t.id)
                    .collect();
                for target in targets {
                    self.apply_damage(target, damage, id);
                }
            }
        }
    }

    /// Spawns an authoritative projectile and broadcasts its visual twin.
    ///
    /// The attacker's damage buffs multiply `order.damage`. Returns `None`
    /// for an unknown projectile kind.
    pub fn launch_projectile(&mut self, mut order: LaunchOrder) -> Option<ProjectileId> {
        let Some(spec) = self.projectile_specs.get(&order.key).copied() else {
            warn!("⚠️ Unknown projectile kind '{}', shot from {} dropped", order.key, order.attacker);
            return None;
        };
        if let Some(attacker) = self.registry.get(order.attacker) {
            order.damage *= attacker.buffs.damage_multiplier();
        }

        let projectile = self.projectiles.launch(&spec, order);
        let event = BroadcastEvent::ProjectileVisual {
            projectile: projectile.id,
            key: projectile.key.clone(),
            attacker: projectile.attacker,
            team: projectile.team,
            position: projectile.position,
            direction: projectile.direction,
            speed: projectile.speed,
            lifetime_secs: projectile.remaining_secs,
        };
        let id = projectile.id;
        trace!("🏹 {} launched {} toward {}", projectile.attacker, id, projectile.direction);
        self.events.push(event);
        Some(id)
    }

    // ------------------------------------------------------------------
    // Physics
    // ------------------------------------------------------------------

    fn integrate_movement(&mut self, dt: f32) {
        for entity in self.registry.iter_mut() {
            if entity.is_dead() || !entity.is_moving() {
                continue;
            }
            let speed = entity.capabilities.move_speed;
            entity.position += entity.move_intent * (speed * dt);
        }
    }

    fn step_projectiles(&mut self, dt: f32) {
        let body_radius = self.config.entity_radius;
        let mut survivors = Vec::new();

        for mut projectile in self.projectiles.take() {
            let alive = projectile.advance(dt);
            let hit = self
                .registry
                .iter()
                .filter(|e| e.id != projectile.attacker && !e.is_dead())
                .filter(|e| !projectile.team.is_allied_with(e.team()))
                .map(|e| (e.id, e.position.distance(projectile.position)))
                .filter(|(_, distance)| *distance <= projectile.radius + body_radius)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id);

            match hit {
                Some(target) => {
                    trace!("🎯 {} hit {}", projectile.id, target);
                    self.apply_damage_from(target, projectile.damage, projectile.attacker, projectile.team);
                }
                None if alive => survivors.push(projectile),
                None => trace!("💨 {} expired", projectile.id),
            }
        }
        self.projectiles.restore(survivors);
    }

    fn resolve_melee_contacts(&mut self, time: f64) {
        let step = self.step;
        let mut swings = Vec::new();

        for entity in self.registry.iter_mut() {
            let Some(swing) = entity.hitbox.as_ref().and_then(|h| h.swing) else { continue };
            if swing.until + TIME_EPSILON < time || entity.is_dead() {
                if let Some(hitbox) = entity.hitbox.as_mut() {
                    hitbox.swing = None;
                }
                continue;
            }
            swings.push((entity.id, entity.team(), entity.position, entity.facing(), swing));
        }

        for (attacker, team, origin, facing, swing) in swings {
            let mut reached: Vec<(EntityId, f32)> = self
                .registry
                .iter()
                .filter(|t| t.id != attacker && !t.is_dead() && !team.is_allied_with(t.team()))
                .filter(|t| melee_reaches(swing.shape, origin, facing, swing.range, t.position))
                .map(|t| (t.id, origin.distance(t.position)))
                .collect();
            if reached.is_empty() {
                continue;
            }
            if swing.shape == HitShape::Single {
                reached.sort_by(|a, b| a.1.total_cmp(&b.1));
                reached.truncate(1);
            }
            if !self.contacts.try_register(attacker, time, step) {
                continue;
            }
            for (target, _) in reached {
                self.apply_damage_from(target, swing.damage, attacker, team);
            }
        }
    }

    // ------------------------------------------------------------------
    // Damage, death and respawn
    // ------------------------------------------------------------------

    /// Applies `amount` damage from `attacker` to `target`.
    ///
    /// A target that already died this tick has been despawned, so repeated
    /// lethal calls are rejected with `UnknownTarget` and the death fires
    /// once.
    pub fn apply_damage(&mut self, target: EntityId, amount: f32, attacker: EntityId) -> DamageOutcome {
        let attacker_team = match self.registry.get(attacker) {
            Some(entity) => entity.team(),
            None => {
                debug!("❓ Attacker {} is not registered, resolving hit without a team", attacker);
                TeamIndex::NONE
            }
        };
        self.apply_damage_from(target, amount, attacker, attacker_team)
    }

    fn apply_damage_from(
        &mut self,
        target: EntityId,
        amount: f32,
        attacker: EntityId,
        attacker_team: TeamIndex,
    ) -> DamageOutcome {
        let Some(victim) = self.registry.get_mut(target) else {
            trace!("🛡️ Hit on unknown {} from {} dropped", target, attacker);
            return DamageOutcome::Rejected(DamageRejection::UnknownTarget);
        };

        let event = DamageEvent {
            attacker,
            target,
            amount,
            attacker_team,
            target_team: victim.team(),
        };
        let outcome = resolve_hit(&event, &mut victim.health);

        match outcome {
            DamageOutcome::Rejected(rejection) => {
                trace!("🛡️ Hit on {} from {} rejected: {:?}", target, attacker, rejection);
            }
            DamageOutcome::Applied { new, .. } => {
                publish(&mut self.store, Role::Authority, target, FieldKey::CurrentHealth, new);
            }
            DamageOutcome::Killed { .. } => {
                publish(&mut self.store, Role::Authority, target, FieldKey::CurrentHealth, 0.0f32);
                let position = victim.position;
                self.events.push(BroadcastEvent::Death {
                    entity: target,
                    killer: Some(attacker),
                    position,
                });
                self.credit_kill(attacker, target);
                self.handle_death(target);
            }
        }
        outcome
    }

    /// Credits a kill to `killer`. A killer that has died since it attacked
    /// is credited through its session: the respawned entity if there is one,
    /// otherwise the pending respawn ticket.
    fn credit_kill(&mut self, killer: EntityId, victim: EntityId) {
        let reward = self.config.kill_reward_coins;
        let killer = if self.registry.contains(killer) {
            killer
        } else {
            let Some(session) = self.fallen.get(&killer).copied() else {
                debug!("💀 {} died to {}, which is no longer registered", victim, killer);
                return;
            };
            match self.registry.entity_for_session(session) {
                Some(current) if current == victim => {
                    debug!("💀 {} fell to a hit from its own previous life", victim);
                    return;
                }
                Some(current) => current,
                None => {
                    self.credit_pending_respawn(session, victim, reward);
                    return;
                }
            }
        };
        let Some(entity) = self.registry.get_mut(killer) else {
            return;
        };
        entity.kills += 1;
        entity.coins = entity.coins.saturating_add(reward);
        publish(&mut self.store, Role::Authority, killer, FieldKey::KillCount, entity.kills);
        publish(&mut self.store, Role::Authority, killer, FieldKey::CoinCount, entity.coins);
        info!("💀 {} killed {} (kills: {})", killer, victim, entity.kills);
    }

    fn credit_pending_respawn(&mut self, session: SessionId, victim: EntityId, reward: u64) {
        let ticket = self.scheduler.iter_mut().find_map(|task| match task {
            ScheduledTask::Respawn(ticket) if ticket.session == session => Some(ticket),
            _ => None,
        });
        match ticket {
            Some(ticket) => {
                ticket.kills += 1;
                ticket.coins = ticket.coins.saturating_add(reward);
                info!(
                    "💀 Session {} killed {} while awaiting respawn (kills: {})",
                    session, victim, ticket.kills
                );
            }
            None => debug!("💀 {} died to session {}, which has no pending respawn", victim, session),
        }
    }

    fn handle_death(&mut self, id: EntityId) {
        let Some(entity) = self.despawn(id) else {
            error!("❌ Dead {} was missing from the registry", id);
            return;
        };
        self.fallen.insert(id, entity.session);
        let ticket = self.lifecycle.death_ticket(&entity);
        let fire_at = self.now + self.lifecycle.respawn_delay_secs();
        debug!(
            "⏳ Session {} respawns at t={:.2} keeping {} coin(s)",
            ticket.session, fire_at, ticket.coins
        );
        self.scheduler.schedule(fire_at, ScheduledTask::Respawn(ticket));
    }

    /// Removes an entity from every registry in one step and cancels its
    /// scheduled work. Pending field writes still flush this tick.
    fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.registry.remove(id)?;
        self.lifecycle.detach_entity(entity.session);
        self.store.retire_entity(id);
        let cancelled = self.scheduler.cancel_where(|task| task.entity() == Some(id));
        self.contacts.forget(id);
        self.events.push(BroadcastEvent::Despawned { entity: id });
        debug!("🧹 Despawned {} ({} scheduled task(s) cancelled)", id, cancelled);
        Some(entity)
    }

    fn respawn(&mut self, ticket: RespawnTicket) {
        if let Err(e) = self.lifecycle.validate_respawn(&ticket) {
            match e {
                LifecycleError::SessionDisconnected(_) => debug!("💤 Discarding respawn: {}", e),
                _ => warn!("⚠️ Discarding respawn: {}", e),
            }
            return;
        }

        let session = ticket.session;
        let coins = ticket.coins;
        let position = self.spawns.nearest(ticket.death_position);
        match self.spawn_entity(session, ticket.profile, position, coins, ticket.kills) {
            Ok(entity) => {
                self.events.push(BroadcastEvent::Respawned {
                    session,
                    entity,
                    position,
                    coins,
                });
                info!("✨ Session {} respawned as {} at {} with {} coin(s)", session, entity, position, coins);
            }
            Err(e) => error!("❌ Respawn of session {} failed: {}", session, e),
        }
    }

    fn spawn_entity(
        &mut self,
        session: SessionId,
        profile: SpawnProfile,
        position: Vec2,
        coins: u64,
        kills: u64,
    ) -> Result<EntityId, LifecycleError> {
        let id = self.registry.allocate_id();
        let mut entity = Entity::new(id, session, profile, position);
        entity.coins = coins;
        entity.kills = kills;
        let fields = entity.initial_fields();

        self.lifecycle.attach_entity(session, id)?;
        if let Err(e) = self.registry.insert(entity) {
            self.lifecycle.detach_entity(session);
            return Err(e);
        }
        if let Err(e) = self.store.register_entity(id, session, fields) {
            error!("❌ Replication registration failed for {}: {}", id, e);
        }
        Ok(id)
    }

    fn expire_buff(&mut self, id: EntityId, buff: BuffId) {
        if let Some(entity) = self.registry.get_mut(id) {
            if entity.buffs.remove(buff).is_some() {
                entity.refresh_protection();
                trace!("⌛ Buff {:?} on {} expired", buff, id);
            }
        }
    }

    // ------------------------------------------------------------------
    // Buffs and pickups
    // ------------------------------------------------------------------

    /// Grants a timed buff to a live entity and broadcasts its icon.
    pub fn grant_buff(&mut self, id: EntityId, kind: BuffKind, duration_secs: f64) -> Option<BuffId> {
        let entity = self.registry.get_mut(id).filter(|e| !e.is_dead())?;
        self.next_buff += 1;
        let buff = BuffId(self.next_buff);
        entity.buffs.grant(buff, kind);
        entity.refresh_protection();

        self.scheduler.schedule(
            self.now + duration_secs.max(0.0),
            ScheduledTask::ExpireBuff { entity: id, buff },
        );
        self.events.push(BroadcastEvent::BuffIcon {
            entity: id,
            kind,
            duration_secs,
        });
        debug!("✨ {} gained {:?} for {:.1}s", id, kind, duration_secs);
        Some(buff)
    }

    pub fn spawn_pickup(&mut self, position: Vec2, kind: PickupKind) -> PickupId {
        self.pickups.spawn(position, kind)
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn attacks(&self) -> &Arc<AttackRegistry> {
        &self.attacks
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.registry.get(id)
    }

    pub fn entity_for_session(&self, session: SessionId) -> Option<EntityId> {
        self.registry.entity_for_session(session)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.registry.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    pub fn session_count(&self) -> usize {
        self.lifecycle.session_count()
    }

    pub fn is_session_registered(&self, session: SessionId) -> bool {
        self.lifecycle.is_registered(session)
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardRow> {
        self.registry.leaderboard()
    }

    pub fn pending_respawns(&self) -> usize {
        self.scheduler
            .iter()
            .filter(|task| matches!(task, ScheduledTask::Respawn(_)))
            .count()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    pub fn pickups(&self) -> &PickupSet {
        &self.pickups
    }

    pub fn queued_commands(&self) -> usize {
        self.inbox.len()
    }

    /// Authoritative value of a replicated field.
    pub fn read(&self, entity: EntityId, key: FieldKey) -> Option<&FieldValue> {
        self.store.read(entity, key)
    }

    pub fn version(&self, entity: EntityId, key: FieldKey) -> Option<u64> {
        self.store.version(entity, key)
    }

    /// Every live field at its current version, for observers that join late
    /// or fall behind.
    pub fn snapshot(&self) -> Vec<FieldUpdate> {
        self.store.snapshot()
    }

    /// Registers a handler for flushed field transitions on the authority.
    pub fn subscribe<F>(&mut self, filter: FieldFilter, handler: F) -> SubscriptionId
    where
        F: FnMut(&FieldUpdate) + Send + 'static,
    {
        self.store.subscribe(filter, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    #[cfg(test)]
    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.registry.get_mut(id)
    }
}
