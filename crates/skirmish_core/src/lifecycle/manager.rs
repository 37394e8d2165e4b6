//! Session registration and respawn bookkeeping.
//!
//! Sessions outlive entity instances: a death discards the entity but keeps
//! the session, whose [`RespawnTicket`] carries what the next instance
//! inherits.

use crate::entity::{Entity, SpawnProfile};
use crate::error::LifecycleError;
use crate::types::{EntityId, SessionId, Vec2};
use std::collections::HashMap;
use tracing::debug;

/// Floor tolerance so products like `0.29 * 100` do not round down a coin.
const COIN_EPSILON: f64 = 1e-9;

/// What a respawn inherits from the instance that died.
#[derive(Debug, Clone, PartialEq)]
pub struct RespawnTicket {
    pub session: SessionId,
    pub profile: SpawnProfile,
    pub coins: u64,
    pub kills: u64,
    pub death_position: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub profile: SpawnProfile,
    /// `None` while dead and waiting for a respawn
    pub entity: Option<EntityId>,
}

#[derive(Debug)]
pub struct LifecycleManager {
    sessions: HashMap<SessionId, SessionRecord>,
    respawn_delay_secs: f64,
    retained_coin_fraction: f64,
}

impl LifecycleManager {
    pub fn new(respawn_delay_secs: f64, retained_coin_fraction: f64) -> Self {
        Self {
            sessions: HashMap::new(),
            respawn_delay_secs,
            retained_coin_fraction: retained_coin_fraction.clamp(0.0, 1.0),
        }
    }

    pub fn respawn_delay_secs(&self) -> f64 {
        self.respawn_delay_secs
    }

    pub fn register_session(&mut self, session: SessionId, profile: SpawnProfile) -> Result<(), LifecycleError> {
        if self.sessions.contains_key(&session) {
            return Err(LifecycleError::AlreadyRegistered(session));
        }
        self.sessions.insert(session, SessionRecord { profile, entity: None });
        debug!("👤 Session {} registered", session);
        Ok(())
    }

    pub fn unregister_session(&mut self, session: SessionId) -> Result<SessionRecord, LifecycleError> {
        let record = self
            .sessions
            .remove(&session)
            .ok_or(LifecycleError::SessionNotRegistered(session))?;
        debug!("👤 Session {} unregistered", session);
        Ok(record)
    }

    pub fn session(&self, session: SessionId) -> Option<&SessionRecord> {
        self.sessions.get(&session)
    }

    pub fn is_registered(&self, session: SessionId) -> bool {
        self.sessions.contains_key(&session)
    }

    pub fn attach_entity(&mut self, session: SessionId, entity: EntityId) -> Result<(), LifecycleError> {
        let record = self
            .sessions
            .get_mut(&session)
            .ok_or(LifecycleError::SessionNotRegistered(session))?;
        record.entity = Some(entity);
        Ok(())
    }

    pub fn detach_entity(&mut self, session: SessionId) {
        if let Some(record) = self.sessions.get_mut(&session) {
            record.entity = None;
        }
    }

    /// `floor(coins * retained_fraction)`.
    pub fn retained_coins(&self, coins: u64) -> u64 {
        (coins as f64 * self.retained_coin_fraction + COIN_EPSILON).floor() as u64
    }

    /// Builds the respawn ticket for an entity that just died.
    pub fn death_ticket(&self, entity: &Entity) -> RespawnTicket {
        RespawnTicket {
            session: entity.session,
            profile: entity.profile.clone(),
            coins: self.retained_coins(entity.coins),
            kills: entity.kills,
            death_position: entity.position,
        }
    }

    /// Checks that a due ticket still has a session to respawn into.
    pub fn validate_respawn(&self, ticket: &RespawnTicket) -> Result<(), LifecycleError> {
        match self.sessions.get(&ticket.session) {
            None => Err(LifecycleError::SessionDisconnected(ticket.session)),
            Some(record) if record.entity.is_some() => Err(LifecycleError::AlreadyRegistered(ticket.session)),
            Some(_) => Ok(()),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::CharacterVariant;
    use crate::types::TeamIndex;

    fn profile() -> SpawnProfile {
        SpawnProfile::new("p", CharacterVariant::RangedSingle, TeamIndex(0))
    }

    #[test]
    fn test_retained_coins_floor() {
        let manager = LifecycleManager::new(5.0, 0.66);
        assert_eq!(manager.retained_coins(100), 66);
        assert_eq!(manager.retained_coins(1), 0);
        assert_eq!(manager.retained_coins(0), 0);

        let exact = LifecycleManager::new(5.0, 0.29);
        assert_eq!(exact.retained_coins(100), 29);
    }

    #[test]
    fn test_ticket_for_disconnected_session_is_refused() {
        let mut manager = LifecycleManager::new(5.0, 0.66);
        let session = SessionId::new();
        manager.register_session(session, profile()).expect("registers");
        let mut entity = Entity::new(EntityId(1), session, profile(), Vec2::new(3.0, 0.0));
        entity.coins = 100;
        entity.kills = 2;

        let ticket = manager.death_ticket(&entity);
        assert_eq!(ticket.coins, 66);
        assert_eq!(ticket.kills, 2);
        assert_eq!(manager.validate_respawn(&ticket), Ok(()));

        manager.unregister_session(session).expect("unregisters");
        assert_eq!(
            manager.validate_respawn(&ticket),
            Err(LifecycleError::SessionDisconnected(session))
        );
        assert_eq!(
            manager.unregister_session(session),
            Err(LifecycleError::SessionNotRegistered(session))
        );
    }

    #[test]
    fn test_double_registration_is_an_error() {
        let mut manager = LifecycleManager::new(5.0, 0.66);
        let session = SessionId::new();
        manager.register_session(session, profile()).expect("registers");
        assert_eq!(
            manager.register_session(session, profile()),
            Err(LifecycleError::AlreadyRegistered(session))
        );
    }
}
