use async_trait::async_trait;
use tracing::debug;

use crate::error::MediaError;

/// Lifecycle signals a playback surface reports back to the core.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSignal {
    Error(String),
    Stalled,
    Waiting,
    CanPlay,
}

/// The audio playback surface. Implementations report [`MediaSignal`]s
/// through the core's event channel, not through return values.
#[async_trait]
pub trait MediaOutput: Send {
    async fn load(&mut self, url: &str) -> Result<(), MediaError>;
    async fn play(&mut self) -> Result<(), MediaError>;
    async fn pause(&mut self) -> Result<(), MediaError>;
    async fn stop(&mut self) -> Result<(), MediaError>;
    async fn set_volume(&mut self, volume: f32) -> Result<(), MediaError>;
    async fn set_muted(&mut self, muted: bool) -> Result<(), MediaError>;
}

/// Accepts every command and plays nothing. Used for headless polling.
#[derive(Debug, Default)]
pub struct NullMedia;

#[async_trait]
impl MediaOutput for NullMedia {
    async fn load(&mut self, url: &str) -> Result<(), MediaError> {
        debug!("null media: load {}", url);
        Ok(())
    }

    async fn play(&mut self) -> Result<(), MediaError> {
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), MediaError> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), MediaError> {
        Ok(())
    }

    async fn set_volume(&mut self, _volume: f32) -> Result<(), MediaError> {
        Ok(())
    }

    async fn set_muted(&mut self, _muted: bool) -> Result<(), MediaError> {
        Ok(())
    }
}
