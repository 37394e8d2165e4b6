//! Live entity registry with its session, team and leaderboard indices.
//!
//! Every index is updated inside the same `&mut self` call as the entity
//! table, so a session lookup can never resolve to a removed entity.

use crate::entity::Entity;
use crate::error::LifecycleError;
use crate::types::{EntityId, SessionId, TeamIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub session: SessionId,
    pub entity: EntityId,
    pub name: String,
    pub team: TeamIndex,
    pub kills: u64,
    pub coins: u64,
}

#[derive(Debug, Default)]
pub struct EntityRegistry {
    next_id: u64,
    entities: BTreeMap<EntityId, Entity>,
    by_session: HashMap<SessionId, EntityId>,
    teams: BTreeMap<TeamIndex, BTreeSet<EntityId>>,
    leaderboard: BTreeSet<EntityId>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh id. Ids are never reused.
    pub fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    pub fn insert(&mut self, entity: Entity) -> Result<(), LifecycleError> {
        if self.by_session.contains_key(&entity.session) {
            return Err(LifecycleError::AlreadyRegistered(entity.session));
        }
        let id = entity.id;
        self.by_session.insert(entity.session, id);
        self.teams.entry(entity.team()).or_default().insert(id);
        self.leaderboard.insert(id);
        debug!("🗂️ Registered {} for session {}", id, entity.session);
        self.entities.insert(id, entity);
        Ok(())
    }

    /// Removes an entity from every index at once.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if self.by_session.get(&entity.session) == Some(&id) {
            self.by_session.remove(&entity.session);
        }
        if let Some(members) = self.teams.get_mut(&entity.team()) {
            members.remove(&id);
            if members.is_empty() {
                self.teams.remove(&entity.team());
            }
        }
        self.leaderboard.remove(&id);
        debug!("🗂️ Deregistered {} for session {}", id, entity.session);
        Some(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entity_for_session(&self, session: SessionId) -> Option<EntityId> {
        self.by_session.get(&session).copied()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Ids in ascending order, which is also spawn order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn team_members(&self, team: TeamIndex) -> Vec<EntityId> {
        self.teams
            .get(&team)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Kills descending, then coins descending, then name.
    pub fn leaderboard(&self) -> Vec<LeaderboardRow> {
        let mut rows: Vec<LeaderboardRow> = self
            .leaderboard
            .iter()
            .filter_map(|id| self.entities.get(id))
            .map(|e| LeaderboardRow {
                session: e.session,
                entity: e.id,
                name: e.profile.name.clone(),
                team: e.team(),
                kills: e.kills,
                coins: e.coins,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.kills
                .cmp(&a.kills)
                .then_with(|| b.coins.cmp(&a.coins))
                .then_with(|| a.name.cmp(&b.name))
        });
        rows
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::CharacterVariant;
    use crate::entity::SpawnProfile;
    use crate::types::Vec2;

    fn entity(registry: &mut EntityRegistry, name: &str, team: i32) -> Entity {
        let id = registry.allocate_id();
        Entity::new(
            id,
            SessionId::new(),
            SpawnProfile::new(name, CharacterVariant::MeleeSingle, TeamIndex(team)),
            Vec2::ZERO,
        )
    }

    #[test]
    fn test_remove_clears_every_index() {
        let mut registry = EntityRegistry::new();
        let e = entity(&mut registry, "a", 1);
        let (id, session) = (e.id, e.session);
        registry.insert(e).expect("first insert");

        assert_eq!(registry.entity_for_session(session), Some(id));
        assert_eq!(registry.team_members(TeamIndex(1)), vec![id]);

        let removed = registry.remove(id).expect("present");
        assert_eq!(removed.id, id);
        assert_eq!(registry.entity_for_session(session), None);
        assert!(registry.team_members(TeamIndex(1)).is_empty());
        assert!(registry.leaderboard().is_empty());
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn test_one_live_entity_per_session() {
        let mut registry = EntityRegistry::new();
        let first = entity(&mut registry, "a", -1);
        let session = first.session;
        registry.insert(first).expect("first insert");

        let mut second = entity(&mut registry, "a", -1);
        second.session = session;
        assert_eq!(registry.insert(second), Err(LifecycleError::AlreadyRegistered(session)));
    }

    #[test]
    fn test_leaderboard_orders_by_kills() {
        let mut registry = EntityRegistry::new();
        let mut low = entity(&mut registry, "low", -1);
        low.kills = 1;
        let mut high = entity(&mut registry, "high", -1);
        high.kills = 4;
        registry.insert(low).expect("insert");
        registry.insert(high).expect("insert");

        let names: Vec<_> = registry.leaderboard().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["high", "low"]);
    }
}
