//! Temporary multipliers on outgoing damage and incoming damage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "multiplier", rename_all = "snake_case")]
pub enum BuffKind {
    /// Multiplies outgoing attack damage
    DamageBoost(f32),
    /// Multiplies incoming damage; below 1.0 reduces it
    Protection(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuffId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveBuff {
    pub id: BuffId,
    pub kind: BuffKind,
}

/// Buffs currently applied to one entity. Multipliers of the same kind stack
/// multiplicatively.
#[derive(Debug, Clone, Default)]
pub struct BuffSet {
    active: Vec<ActiveBuff>,
}

impl BuffSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, id: BuffId, kind: BuffKind) {
        self.active.push(ActiveBuff { id, kind });
    }

    pub fn remove(&mut self, id: BuffId) -> Option<ActiveBuff> {
        let index = self.active.iter().position(|b| b.id == id)?;
        Some(self.active.remove(index))
    }

    pub fn damage_multiplier(&self) -> f32 {
        self.active
            .iter()
            .filter_map(|b| match b.kind {
                BuffKind::DamageBoost(m) => Some(m),
                BuffKind::Protection(_) => None,
            })
            .product()
    }

    pub fn protection_multiplier(&self) -> f32 {
        self.active
            .iter()
            .filter_map(|b| match b.kind {
                BuffKind::Protection(m) => Some(m),
                BuffKind::DamageBoost(_) => None,
            })
            .product()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_is_neutral() {
        let buffs = BuffSet::new();
        assert_eq!(buffs.damage_multiplier(), 1.0);
        assert_eq!(buffs.protection_multiplier(), 1.0);
    }

    #[test]
    fn test_multipliers_stack_and_remove() {
        let mut buffs = BuffSet::new();
        buffs.grant(BuffId(1), BuffKind::DamageBoost(1.5));
        buffs.grant(BuffId(2), BuffKind::DamageBoost(2.0));
        buffs.grant(BuffId(3), BuffKind::Protection(0.5));
        assert_eq!(buffs.damage_multiplier(), 3.0);
        assert_eq!(buffs.protection_multiplier(), 0.5);

        assert!(buffs.remove(BuffId(2)).is_some());
        assert!(buffs.remove(BuffId(2)).is_none());
        assert_eq!(buffs.damage_multiplier(), 1.5);
    }
}
