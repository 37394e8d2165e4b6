//! The single player-controlled entity type.
//!
//! Per-character behaviour comes from the variant's [`Capabilities`]; there is
//! no per-character entity type.

use crate::combat::{
    BuffId, BuffSet, Capabilities, CharacterVariant, CombatState, HitShape, ResourcePool,
};
use crate::replication::{FieldKey, FieldValue};
use crate::types::{EntityId, SessionId, TeamIndex, Vec2};
use serde::{Deserialize, Serialize};

/// Session metadata resolved once at spawn time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnProfile {
    pub name: String,
    #[serde(default)]
    pub variant: CharacterVariant,
    #[serde(default)]
    pub team: TeamIndex,
}

impl SpawnProfile {
    pub fn new(name: impl Into<String>, variant: CharacterVariant, team: TeamIndex) -> Self {
        Self {
            name: name.into(),
            variant,
            team,
        }
    }
}

/// An open melee swing. Hits are checked every physics step while
/// `until` has not passed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveSwing {
    pub shape: HitShape,
    pub range: f32,
    pub damage: f32,
    pub until: f64,
}

/// Contact hitbox carried by melee bodies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeleeHitbox {
    pub swing: Option<ActiveSwing>,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub session: SessionId,
    pub profile: SpawnProfile,
    pub capabilities: Capabilities,
    pub position: Vec2,
    pub facing_left: bool,
    /// Latest clamped movement intent
    pub move_intent: Vec2,
    pub health: ResourcePool,
    pub secondary: Option<ResourcePool>,
    pub combat: CombatState,
    pub buffs: BuffSet,
    /// Buff applied while the secondary action is active
    pub secondary_buff: Option<BuffId>,
    pub coins: u64,
    pub kills: u64,
    pub hitbox: Option<MeleeHitbox>,
    pub warned_missing_hitbox: bool,
}

impl Entity {
    pub fn new(id: EntityId, session: SessionId, profile: SpawnProfile, position: Vec2) -> Self {
        let capabilities = profile.variant.capabilities();
        let secondary = (capabilities.max_secondary > 0.0)
            .then(|| ResourcePool::new(capabilities.max_secondary));
        let hitbox = capabilities.melee_hitbox.then(MeleeHitbox::default);

        Self {
            id,
            session,
            capabilities,
            position,
            facing_left: false,
            move_intent: Vec2::ZERO,
            health: ResourcePool::new(capabilities.max_health),
            secondary,
            combat: CombatState::new(),
            buffs: BuffSet::new(),
            secondary_buff: None,
            coins: 0,
            kills: 0,
            hitbox,
            warned_missing_hitbox: false,
            profile,
        }
    }

    pub fn variant(&self) -> CharacterVariant {
        self.profile.variant
    }

    pub fn team(&self) -> TeamIndex {
        self.profile.team
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_dead()
    }

    pub fn is_moving(&self) -> bool {
        !self.move_intent.is_near_zero()
    }

    pub fn facing(&self) -> Vec2 {
        Vec2::facing_axis(self.facing_left)
    }

    /// Re-derives the health pool's protection multiplier from active buffs.
    pub fn refresh_protection(&mut self) {
        let multiplier = self.buffs.protection_multiplier();
        self.health.set_protection(multiplier);
    }

    pub fn secondary_value(&self) -> f32 {
        self.secondary.as_ref().map_or(0.0, ResourcePool::current)
    }

    /// Every replicated field with its value at spawn.
    pub fn initial_fields(&self) -> Vec<(FieldKey, FieldValue)> {
        vec![
            (FieldKey::IsMoving, self.is_moving().into()),
            (FieldKey::IsFacingLeft, self.facing_left.into()),
            (FieldKey::IsAttacking, self.combat.is_attacking().into()),
            (FieldKey::IsSecondaryActing, self.combat.is_secondary_acting().into()),
            (FieldKey::ActiveAttackSlot, self.combat.active_slot().into()),
            (FieldKey::CurrentHealth, self.health.current().into()),
            (FieldKey::CurrentSecondaryStat, self.secondary_value().into()),
            (FieldKey::TeamIndex, self.team().into()),
            (FieldKey::DisplayName, self.profile.name.as_str().into()),
            (FieldKey::CoinCount, self.coins.into()),
            (FieldKey::KillCount, self.kills.into()),
            (FieldKey::Position, self.position.into()),
        ]
    }
}
