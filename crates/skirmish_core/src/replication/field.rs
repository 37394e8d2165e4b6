//! The replicated field primitive.
//!
//! A field has exactly one writer role. Every accepted write bumps the version
//! and queues an `(old, new)` transition; the queue is drained in write order
//! at the next flush so back-to-back writes inside one tick are all delivered.

use crate::types::SessionId;
use std::collections::VecDeque;
use std::fmt;

/// Which role owns writes to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Writer {
    /// Gameplay state: only the authority may write.
    Authority,
    /// Cosmetic state written on behalf of the controlling session.
    Owner,
}

/// The role a caller presents when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Authority,
    Owner(SessionId),
    Observer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Authority => write!(f, "authority"),
            Role::Owner(session) => write!(f, "owner {session}"),
            Role::Observer => write!(f, "observer"),
        }
    }
}

/// Why a write was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRefusal {
    Observer,
    NotWriter,
}

/// One delivered change. `old` is `None` for the initial value.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<T> {
    pub old: Option<T>,
    pub new: T,
    pub version: u64,
}

#[derive(Debug, Clone)]
pub struct ReplicatedField<T> {
    value: T,
    version: u64,
    writer: Writer,
    owner: Option<SessionId>,
    pending: VecDeque<Transition<T>>,
}

impl<T: Clone + PartialEq> ReplicatedField<T> {
    /// Creates a field at version 1 with its initial value queued for delivery.
    pub fn new(initial: T, writer: Writer, owner: Option<SessionId>) -> Self {
        let mut pending = VecDeque::new();
        pending.push_back(Transition {
            old: None,
            new: initial.clone(),
            version: 1,
        });
        Self {
            value: initial,
            version: 1,
            writer,
            owner,
            pending,
        }
    }

    /// Latest locally known value.
    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn writer(&self) -> Writer {
        self.writer
    }

    pub fn may_write(&self, role: Role) -> bool {
        match (self.writer, role) {
            (_, Role::Observer) => false,
            (Writer::Authority, Role::Authority) => true,
            (Writer::Owner, Role::Owner(session)) => self.owner == Some(session),
            _ => false,
        }
    }

    /// Writes a value. Returns `Ok(false)` when the value is unchanged, in
    /// which case no transition is queued.
    pub fn write(&mut self, role: Role, value: T) -> Result<bool, WriteRefusal> {
        if role == Role::Observer {
            return Err(WriteRefusal::Observer);
        }
        if !self.may_write(role) {
            return Err(WriteRefusal::NotWriter);
        }
        if self.value == value {
            return Ok(false);
        }

        self.version += 1;
        let old = std::mem::replace(&mut self.value, value.clone());
        self.pending.push_back(Transition {
            old: Some(old),
            new: value,
            version: self.version,
        });
        Ok(true)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Pops the oldest undelivered transition.
    pub fn pop_pending(&mut self) -> Option<Transition<T>> {
        self.pending.pop_front()
    }
}
