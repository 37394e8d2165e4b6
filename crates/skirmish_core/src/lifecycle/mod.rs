//! # Lifecycle
//!
//! Registration, death and respawn of entity instances.
//!
//! - [`EntityRegistry`] - live entities plus session/team/leaderboard indices
//! - [`LifecycleManager`] - sessions and respawn tickets
//! - [`SpawnPoints`] - join placement and nearest-graveyard lookup

pub mod manager;
pub mod registry;
pub mod spawn;

pub use manager::{LifecycleManager, RespawnTicket, SessionRecord};
pub use registry::{EntityRegistry, LeaderboardRow};
pub use spawn::SpawnPoints;
