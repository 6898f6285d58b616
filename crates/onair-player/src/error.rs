//! Error taxonomy for the player core.
//!
//! Nothing here is fatal: every variant is recovered locally, either by
//! trying the next candidate, re-resolving the API endpoint on the next
//! tick, or scheduling a reconnect.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Stream,
    Api,
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateKind::Stream => f.write_str("stream"),
            CandidateKind::Api => f.write_str("api"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// One candidate did not answer in time; the next one is tried.
    #[error("{kind} candidate unreachable: {url}")]
    Probe { kind: CandidateKind, url: String },

    /// Every configured candidate failed its probe.
    #[error("all {0} candidates unreachable")]
    AllCandidatesExhausted(CandidateKind),

    /// Now-playing poll failed.
    #[error("now-playing fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The media output reported an error or refused a command.
    #[error("playback failed: {0}")]
    Playback(#[from] MediaError),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media backend unavailable: {0}")]
    Unavailable(String),

    #[error("media command failed: {0}")]
    Command(String),

    #[error("media element error: {0}")]
    Element(String),
}
