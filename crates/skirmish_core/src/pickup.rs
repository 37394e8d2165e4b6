//! World pickups collected with `Interact`.

use crate::combat::BuffKind;
use crate::types::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PickupId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PickupKind {
    Coins { amount: u64 },
    Buff { kind: BuffKind, duration_secs: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pickup {
    pub id: PickupId,
    pub position: Vec2,
    pub kind: PickupKind,
}

#[derive(Debug, Default)]
pub struct PickupSet {
    next_id: u64,
    pickups: BTreeMap<PickupId, Pickup>,
}

impl PickupSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, position: Vec2, kind: PickupKind) -> PickupId {
        self.next_id += 1;
        let id = PickupId(self.next_id);
        self.pickups.insert(id, Pickup { id, position, kind });
        id
    }

    /// Removes and returns the closest pickup within `radius` of `position`.
    /// Ties go to the older pickup.
    pub fn take_nearest(&mut self, position: Vec2, radius: f32) -> Option<Pickup> {
        let id = self
            .pickups
            .values()
            .map(|p| (p.id, p.position.distance(position)))
            .filter(|(_, distance)| *distance <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)?;
        self.pickups.remove(&id)
    }

    pub fn get(&self, id: PickupId) -> Option<&Pickup> {
        self.pickups.get(&id)
    }

    pub fn len(&self) -> usize {
        self.pickups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty()
    }
}
