//! Authority-side publish/subscribe store of replicated entity fields.
//!
//! The store is a typed key-value table keyed by `(entity, field)`. Writes are
//! versioned per field and logged in global write order; [`ReplicationStore::flush`]
//! turns the log into the ordered batch of [`FieldUpdate`]s broadcast to every
//! observer, and feeds the same batch to local subscribers.

use super::bus::{FieldFilter, SubscriberSet, SubscriptionId};
use super::field::{ReplicatedField, Role, WriteRefusal, Writer};
use crate::error::CoreError;
use crate::types::{EntityId, SessionId, TeamIndex, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, error};

/// Every field replicated for a player entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    IsMoving,
    IsFacingLeft,
    IsAttacking,
    IsSecondaryActing,
    ActiveAttackSlot,
    CurrentHealth,
    CurrentSecondaryStat,
    TeamIndex,
    DisplayName,
    CoinCount,
    KillCount,
    Position,
}

impl FieldKey {
    pub const ALL: [FieldKey; 12] = [
        FieldKey::IsMoving,
        FieldKey::IsFacingLeft,
        FieldKey::IsAttacking,
        FieldKey::IsSecondaryActing,
        FieldKey::ActiveAttackSlot,
        FieldKey::CurrentHealth,
        FieldKey::CurrentSecondaryStat,
        FieldKey::TeamIndex,
        FieldKey::DisplayName,
        FieldKey::CoinCount,
        FieldKey::KillCount,
        FieldKey::Position,
    ];

    /// Movement, facing and slot selection belong to the controlling
    /// session; everything else is gameplay state owned by the authority.
    pub fn writer(self) -> Writer {
        match self {
            FieldKey::IsMoving
            | FieldKey::IsFacingLeft
            | FieldKey::ActiveAttackSlot
            | FieldKey::Position => Writer::Owner,
            _ => Writer::Authority,
        }
    }
}

/// A replicated value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Text(String),
    Vec2(Vec2),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            FieldValue::Vec2(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for FieldValue {
    fn from(v: usize) -> Self {
        FieldValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<Vec2> for FieldValue {
    fn from(v: Vec2) -> Self {
        FieldValue::Vec2(v)
    }
}

impl From<TeamIndex> for FieldValue {
    fn from(v: TeamIndex) -> Self {
        FieldValue::Int(i64::from(v.0))
    }
}

/// One `(key, value, version)` change as delivered to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub entity: EntityId,
    pub key: FieldKey,
    pub old: Option<FieldValue>,
    pub new: FieldValue,
    pub version: u64,
}

#[derive(Debug)]
struct EntityFields {
    owner: SessionId,
    fields: BTreeMap<FieldKey, ReplicatedField<FieldValue>>,
}

#[derive(Debug, Default)]
pub struct ReplicationStore {
    entities: HashMap<EntityId, EntityFields>,
    write_log: VecDeque<(EntityId, FieldKey)>,
    retiring: Vec<EntityId>,
    subscribers: SubscriberSet,
}

impl ReplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity's fields. Initial values are delivered at the next
    /// flush with `old == None`.
    pub fn register_entity<I>(
        &mut self,
        entity: EntityId,
        owner: SessionId,
        initial: I,
    ) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = (FieldKey, FieldValue)>,
    {
        if self.entities.contains_key(&entity) {
            return Err(CoreError::DuplicateEntity(entity));
        }

        let mut fields = BTreeMap::new();
        for (key, value) in initial {
            fields.insert(key, ReplicatedField::new(value, key.writer(), Some(owner)));
            self.write_log.push_back((entity, key));
        }
        self.entities.insert(entity, EntityFields { owner, fields });
        debug!("📡 Registered replicated fields for {}", entity);
        Ok(())
    }

    /// Marks an entity for removal after its pending transitions flush.
    pub fn retire_entity(&mut self, entity: EntityId) {
        if self.entities.contains_key(&entity) && !self.retiring.contains(&entity) {
            self.retiring.push(entity);
        }
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    pub fn owner(&self, entity: EntityId) -> Option<SessionId> {
        self.entities.get(&entity).map(|e| e.owner)
    }

    /// Writes a field as `role`.
    ///
    /// Returns `Ok(true)` when a transition was queued and `Ok(false)` for an
    /// unchanged value. Role violations are programming errors: they are
    /// logged at error level and returned, never silently ignored.
    pub fn write(
        &mut self,
        role: Role,
        entity: EntityId,
        key: FieldKey,
        value: impl Into<FieldValue>,
    ) -> Result<bool, CoreError> {
        let field = self
            .entities
            .get_mut(&entity)
            .and_then(|e| e.fields.get_mut(&key))
            .ok_or(CoreError::UnknownEntity(entity))?;

        match field.write(role, value.into()) {
            Ok(true) => {
                self.write_log.push_back((entity, key));
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(WriteRefusal::Observer) => {
                error!("🚫 Observer write to {:?} on {} rejected", key, entity);
                Err(CoreError::ObserverWrite { entity, key })
            }
            Err(WriteRefusal::NotWriter) => {
                error!("🚫 {} may not write {:?} on {}", role, key, entity);
                Err(CoreError::NotWriter {
                    entity,
                    key,
                    role: role.to_string(),
                })
            }
        }
    }

    pub fn read(&self, entity: EntityId, key: FieldKey) -> Option<&FieldValue> {
        self.entities
            .get(&entity)
            .and_then(|e| e.fields.get(&key))
            .map(|f| f.get())
    }

    pub fn version(&self, entity: EntityId, key: FieldKey) -> Option<u64> {
        self.entities
            .get(&entity)
            .and_then(|e| e.fields.get(&key))
            .map(|f| f.version())
    }

    /// Current value of every live field as updates with `old == None`, in
    /// entity order. Late observers apply it before their first tick batch.
    pub fn snapshot(&self) -> Vec<FieldUpdate> {
        let mut entities: Vec<_> = self
            .entities
            .iter()
            .filter(|(entity, _)| !self.retiring.contains(entity))
            .collect();
        entities.sort_by_key(|(entity, _)| **entity);

        entities
            .into_iter()
            .flat_map(|(entity, fields)| {
                fields.fields.iter().map(move |(key, field)| FieldUpdate {
                    entity: *entity,
                    key: *key,
                    old: None,
                    new: field.get().clone(),
                    version: field.version(),
                })
            })
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.write_log.is_empty()
    }

    /// Drains every queued transition in write order, notifies local
    /// subscribers and drops retired entities.
    pub fn flush(&mut self) -> Vec<FieldUpdate> {
        let mut updates = Vec::with_capacity(self.write_log.len());
        while let Some((entity, key)) = self.write_log.pop_front() {
            let transition = self
                .entities
                .get_mut(&entity)
                .and_then(|e| e.fields.get_mut(&key))
                .and_then(|f| f.pop_pending());
            if let Some(t) = transition {
                updates.push(FieldUpdate {
                    entity,
                    key,
                    old: t.old,
                    new: t.new,
                    version: t.version,
                });
            }
        }

        for update in &updates {
            self.subscribers.notify(update);
        }

        for entity in self.retiring.drain(..) {
            self.entities.remove(&entity);
            debug!("📡 Dropped replicated fields for {}", entity);
        }

        updates
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
