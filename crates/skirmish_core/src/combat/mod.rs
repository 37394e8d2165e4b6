//! # Combat
//!
//! Attack descriptors, the character capability table, resource pools, the
//! per-entity state machine, damage rules and projectiles. Everything here is
//! plain data plus free functions; the authority wires it together.

pub mod buff;
pub mod cooldown;
pub mod damage;
pub mod descriptor;
pub mod pool;
pub mod projectile;
pub mod state;
pub mod variant;

pub use buff::{ActiveBuff, BuffId, BuffKind, BuffSet};
pub use cooldown::{CooldownLedger, SlotKey};
pub use damage::{
    check_eligibility, cone_contains, melee_reaches, resolve_hit, ContactLimiter, DamageEvent,
    DamageOutcome, DamageRejection,
};
pub use descriptor::{
    Activation, AttackDescriptor, AttackRegistry, Delivery, HitShape, ProjectileKey,
    ProjectileRegistry, ProjectileSpec,
};
pub use pool::{PoolHit, ResourcePool};
pub use projectile::{fan_directions, shot_direction, LaunchOrder, Projectile, ProjectileSet, VisualProjectile};
pub use state::{ActionState, CombatState, Rejection, TickTransitions};
pub use variant::{
    default_loadout, Capabilities, CharacterVariant, ResourceKind, SecondaryAction, SecondaryMode,
};
