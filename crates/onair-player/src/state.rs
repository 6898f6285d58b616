use std::sync::Arc;

use onair_proto::protocol::{DisplayState, PlayerState, StatusLine};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::render::volume_icon;

/// What `GET /api/state` returns.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub player: PlayerState,
    pub display: DisplayState,
}

/// Shared handle on the player and display state.
///
/// Only the core writes; HTTP handlers and tests read. Every write bumps
/// `PlayerState::rev`, including display-only writes, so a reader polling
/// `rev` sees all changes.
#[derive(Clone)]
pub struct StateManager {
    state: Arc<RwLock<PlayerState>>,
    display: Arc<RwLock<DisplayState>>,
}

impl StateManager {
    pub fn new(volume: f32) -> Self {
        let state = PlayerState {
            rev: 1,
            volume,
            ..Default::default()
        };
        let display = DisplayState {
            volume_icon: volume_icon(volume, false),
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            display: Arc::new(RwLock::new(display)),
        }
    }

    pub async fn get_state(&self) -> PlayerState {
        self.state.read().await.clone()
    }

    pub async fn get_display(&self) -> DisplayState {
        self.display.read().await.clone()
    }

    pub async fn snapshot(&self) -> Snapshot {
        Snapshot {
            player: self.get_state().await,
            display: self.get_display().await,
        }
    }

    pub async fn rev(&self) -> u64 {
        self.state.read().await.rev
    }

    /// Apply `f` to the player state and bump `rev`.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut PlayerState),
    {
        let mut state = self.state.write().await;
        f(&mut state);
        state.rev += 1;
    }

    /// Apply `f` to the display state and bump `rev`.
    pub async fn update_display<F>(&self, f: F)
    where
        F: FnOnce(&mut DisplayState),
    {
        f(&mut *self.display.write().await);
        self.state.write().await.rev += 1;
    }

    pub async fn set_status(&self, text: &str, is_error: bool) {
        let status = StatusLine {
            text: text.to_string(),
            is_error,
        };
        self.update_display(|d| d.status = status).await;
    }

    pub async fn set_volume(&self, volume: f32, muted: bool) {
        self.update(|s| {
            s.volume = volume;
            s.muted = muted;
        })
        .await;
        self.display.write().await.volume_icon = volume_icon(volume, muted);
    }
}
