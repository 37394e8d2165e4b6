//! Subscription registry shared by the authority store and observer mirrors.
//!
//! Handlers run synchronously in subscription order, once per delivered
//! transition. Presentation code subscribes here instead of being called
//! directly by the simulation.

use super::store::{FieldKey, FieldUpdate};
use crate::types::EntityId;
use tracing::trace;

pub type FieldHandler = Box<dyn FnMut(&FieldUpdate) + Send>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Selects the transitions a handler receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFilter {
    /// `None` matches every entity
    pub entity: Option<EntityId>,
    pub key: FieldKey,
}

impl FieldFilter {
    pub fn any(key: FieldKey) -> Self {
        Self { entity: None, key }
    }

    pub fn entity(entity: EntityId, key: FieldKey) -> Self {
        Self {
            entity: Some(entity),
            key,
        }
    }

    pub fn matches(&self, update: &FieldUpdate) -> bool {
        self.key == update.key && self.entity.map_or(true, |e| e == update.entity)
    }
}

struct Subscriber {
    id: SubscriptionId,
    filter: FieldFilter,
    handler: FieldHandler,
}

#[derive(Default)]
pub struct SubscriberSet {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, filter: FieldFilter, handler: F) -> SubscriptionId
    where
        F: FnMut(&FieldUpdate) + Send + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push(Subscriber {
            id,
            filter,
            handler: Box::new(handler),
        });
        trace!("📝 Subscribed {:?} to {:?}", id, filter);
        id
    }

    /// Returns false when the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        before != self.subscribers.len()
    }

    pub fn notify(&mut self, update: &FieldUpdate) {
        for subscriber in self.subscribers.iter_mut() {
            if subscriber.filter.matches(update) {
                (subscriber.handler)(update);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl std::fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberSet")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
