//! Read-only observer copy of replicated fields.

use super::bus::{FieldFilter, SubscriberSet, SubscriptionId};
use super::store::{FieldKey, FieldUpdate, FieldValue};
use crate::error::CoreError;
use crate::types::EntityId;
use std::collections::{HashMap, HashSet};
use tracing::{error, trace};

/// Eventually-consistent mirror held by every observer.
///
/// Updates apply only when their version is newer than the locally held one,
/// so duplicated or reordered deliveries are harmless. Handlers receive the
/// locally held value as `old`.
///
/// Entity ids are never reused, so a retired entity stays retired: late
/// copies of its updates are refused instead of resurrecting it.
#[derive(Debug, Default)]
pub struct ObserverMirror {
    values: HashMap<(EntityId, FieldKey), (FieldValue, u64)>,
    retired: HashSet<EntityId>,
    subscribers: SubscriberSet,
}

impl ObserverMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one update. Returns false for stale versions and retired
    /// entities.
    pub fn apply(&mut self, update: &FieldUpdate) -> bool {
        if self.retired.contains(&update.entity) {
            trace!("⏭️ Ignoring {:?} for retired {}", update.key, update.entity);
            return false;
        }
        let slot = (update.entity, update.key);
        let old = match self.values.get(&slot) {
            Some((_, held)) if *held >= update.version => {
                trace!(
                    "⏭️ Ignoring stale {:?} v{} for {} (held v{})",
                    update.key,
                    update.version,
                    update.entity,
                    held
                );
                return false;
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        };

        self.values
            .insert(slot, (update.new.clone(), update.version));
        let local = FieldUpdate {
            old,
            ..update.clone()
        };
        self.subscribers.notify(&local);
        true
    }

    pub fn read(&self, entity: EntityId, key: FieldKey) -> Option<&FieldValue> {
        self.values.get(&(entity, key)).map(|(v, _)| v)
    }

    pub fn version(&self, entity: EntityId, key: FieldKey) -> Option<u64> {
        self.values.get(&(entity, key)).map(|(_, v)| *v)
    }

    /// Observers never write. Calling this is a bug and always errors.
    pub fn write(
        &mut self,
        entity: EntityId,
        key: FieldKey,
        _value: FieldValue,
    ) -> Result<(), CoreError> {
        error!("🚫 Observer mirror write to {:?} on {} rejected", key, entity);
        Err(CoreError::ObserverWrite { entity, key })
    }

    /// Drops every field of a despawned entity and refuses its later updates.
    pub fn forget_entity(&mut self, entity: EntityId) {
        self.values.retain(|(e, _), _| *e != entity);
        self.retired.insert(entity);
    }

    /// Retires every mirrored entity missing from `live`. Returns how many.
    pub fn retain_entities(&mut self, live: &HashSet<EntityId>) -> usize {
        let gone: Vec<EntityId> = self
            .entity_ids()
            .into_iter()
            .filter(|entity| !live.contains(entity))
            .collect();
        for entity in &gone {
            self.forget_entity(*entity);
        }
        gone.len()
    }

    pub fn is_retired(&self, entity: EntityId) -> bool {
        self.retired.contains(&entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entity_ids().len()
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.values.keys().map(|(e, _)| *e).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn subscribe<F>(&mut self, filter: FieldFilter, handler: F) -> SubscriptionId
    where
        F: FnMut(&FieldUpdate) + Send + 'static,
    {
        self.subscribers.subscribe(filter, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}
