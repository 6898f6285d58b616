pub mod core;
pub mod error;
pub mod failover;
pub mod fetch;
pub mod media;
#[cfg(unix)]
pub mod mpv;
pub mod prober;
pub mod render;
pub mod retry;
pub mod scheduler;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::core::{Backends, PlayerCore, PlayerEvent, PlayerSettings, PlayerUpdate};
pub use crate::state::{Snapshot, StateManager};
