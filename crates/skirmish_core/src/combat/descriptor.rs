//! Immutable attack and projectile parameters.
//!
//! Descriptors are built once at startup, stored behind `Arc` and looked up
//! by slot index. Nothing mutates them at runtime.

use super::variant::CharacterVariant;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name of a projectile kind, e.g. `"arrow"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectileKey(pub String);

impl ProjectileKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for ProjectileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trigger attacks fire once per press; hold attacks repeat while the
/// button stays down, gated by the same cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Trigger,
    Hold,
}

/// Reach of a melee hitbox relative to the attacker's facing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum HitShape {
    /// Nearest enemy inside a narrow frontal cone
    Single,
    /// Every enemy inside a frontal cone
    Frontal { half_angle_deg: f32 },
    /// Every enemy within range in any direction
    Around,
}

/// How an attack reaches its targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delivery {
    /// Contact hitbox active for `window_secs` after the attack is released
    Melee { shape: HitShape, window_secs: f64 },
    Projectile { key: ProjectileKey },
    /// Area placed at the aim point, clamped to the attack range
    Area { radius: f32, effect_key: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackDescriptor {
    pub name: String,
    pub damage: f32,
    pub cooldown_secs: f64,
    pub range: f32,
    /// Debited from the secondary-stat pool at commit; 0 means free
    pub resource_cost: f32,
    pub animation_key: String,
    pub activation: Activation,
    pub delivery: Delivery,
    /// Delay between commit and effect release; 0 releases immediately
    #[serde(default)]
    pub cast_time_secs: f64,
}

impl AttackDescriptor {
    pub fn has_cost(&self) -> bool {
        self.resource_cost > 0.0
    }

    pub fn is_melee(&self) -> bool {
        matches!(self.delivery, Delivery::Melee { .. })
    }
}

/// Kinematics of one projectile kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    pub speed: f32,
    pub lifetime_secs: f32,
    pub radius: f32,
}

/// Per-variant attack loadouts, shared by reference.
#[derive(Debug, Clone, Default)]
pub struct AttackRegistry {
    loadouts: HashMap<CharacterVariant, Arc<[AttackDescriptor]>>,
}

impl AttackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the default loadout of every variant.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for variant in CharacterVariant::ALL {
            registry.register(variant, super::variant::default_loadout(variant));
        }
        registry
    }

    /// Replaces the loadout of `variant`.
    pub fn register(&mut self, variant: CharacterVariant, attacks: Vec<AttackDescriptor>) {
        self.loadouts.insert(variant, attacks.into());
    }

    pub fn loadout(&self, variant: CharacterVariant) -> Option<Arc<[AttackDescriptor]>> {
        self.loadouts.get(&variant).cloned()
    }

    pub fn descriptor(&self, variant: CharacterVariant, slot: usize) -> Option<&AttackDescriptor> {
        self.loadouts.get(&variant).and_then(|l| l.get(slot))
    }

    pub fn slot_count(&self, variant: CharacterVariant) -> usize {
        self.loadouts.get(&variant).map_or(0, |l| l.len())
    }

    pub fn has_variant(&self, variant: CharacterVariant) -> bool {
        self.loadouts.contains_key(&variant)
    }
}

/// Projectile key to kinematics lookup.
#[derive(Debug, Clone, Default)]
pub struct ProjectileRegistry {
    specs: HashMap<ProjectileKey, ProjectileSpec>,
}

impl ProjectileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            ProjectileKey::new("arrow"),
            ProjectileSpec {
                speed: 18.0,
                lifetime_secs: 1.5,
                radius: 0.3,
            },
        );
        registry.register(
            ProjectileKey::new("firebolt"),
            ProjectileSpec {
                speed: 12.0,
                lifetime_secs: 2.0,
                radius: 0.4,
            },
        );
        registry
    }

    pub fn register(&mut self, key: ProjectileKey, spec: ProjectileSpec) {
        self.specs.insert(key, spec);
    }

    pub fn get(&self, key: &ProjectileKey) -> Option<&ProjectileSpec> {
        self.specs.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_roster() {
        let registry = AttackRegistry::with_defaults();
        for variant in CharacterVariant::ALL {
            assert_eq!(registry.slot_count(variant), 2, "{variant:?} has two slots");
        }
        assert!(registry.descriptor(CharacterVariant::MeleeSingle, 2).is_none());
    }

    #[test]
    fn test_loadouts_are_shared_not_copied() {
        let registry = AttackRegistry::with_defaults();
        let a = registry.loadout(CharacterVariant::RangedSingle).expect("archer loadout");
        let b = registry.loadout(CharacterVariant::RangedSingle).expect("archer loadout");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_every_default_projectile_key_resolves() {
        let attacks = AttackRegistry::with_defaults();
        let projectiles = ProjectileRegistry::with_defaults();
        for variant in CharacterVariant::ALL {
            for attack in attacks.loadout(variant).expect("loadout").iter() {
                if let Delivery::Projectile { key } = &attack.delivery {
                    assert!(projectiles.get(key).is_some(), "missing projectile {key}");
                }
            }
        }
    }
}
