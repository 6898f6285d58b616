use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Candidates ────────────────────────────────────────────────────────────────

/// A stream or API URL with its failover priority (lower is preferred).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    #[serde(default)]
    pub priority: i32,
}

impl Candidate {
    pub fn new(url: impl Into<String>, priority: i32) -> Self {
        Self {
            url: url.into(),
            priority,
        }
    }
}

// ── Player state ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Good,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub elapsed_seconds: f64,
    pub duration_seconds: f64,
}

/// Counters kept for the periodic diagnostics log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub buffering_events: u64,
    pub connection_errors: u64,
    pub quality_changes: u64,
}

/// Full state of one player instance. `rev` increases on every mutation so
/// readers can tell whether anything changed since their last look.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub rev: u64,
    pub active_stream_url: Option<String>,
    pub active_api_url: Option<String>,
    pub quality: Quality,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub is_playing: bool,
    pub volume: f32,
    pub muted: bool,
    pub visibility: Visibility,
    pub track: Option<TrackInfo>,
    pub last_update: Option<DateTime<Utc>>,
    pub diagnostics: Diagnostics,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            rev: 0,
            active_stream_url: None,
            active_api_url: None,
            quality: Quality::Good,
            retry_count: 0,
            last_error: None,
            is_playing: false,
            volume: 0.7,
            muted: false,
            visibility: Visibility::Visible,
            track: None,
            last_update: None,
            diagnostics: Diagnostics::default(),
        }
    }
}

// ── Now-playing payload ───────────────────────────────────────────────────────

/// Now-playing document as served by the broadcast server's API. Every field
/// is optional; unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NowPlaying {
    #[serde(default)]
    pub now_playing: Option<CurrentEntry>,
    #[serde(default)]
    pub playing_next: Option<QueueEntry>,
    #[serde(default)]
    pub song_history: Option<Vec<QueueEntry>>,
    #[serde(default)]
    pub listeners: Option<Listeners>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Song {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentEntry {
    #[serde(default)]
    pub song: Option<Song>,
    #[serde(default)]
    pub elapsed: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueEntry {
    #[serde(default)]
    pub song: Option<Song>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listeners {
    #[serde(default)]
    pub current: Option<u64>,
}

// ── Display model ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackLine {
    pub title: String,
    pub artist: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentLine {
    pub title: String,
    pub artist: String,
    /// `"m:ss / m:ss"`.
    pub progress: String,
    pub duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLine {
    pub title: String,
    pub artist: String,
    pub duration: Option<String>,
    pub is_new: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VolumeIcon {
    Mute,
    Down,
    #[default]
    Up,
}

/// Everything a front end would paint. Fields are overwritten wholesale by
/// the render step; `None` means the field has never been filled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayState {
    pub status: StatusLine,
    pub current: Option<CurrentLine>,
    pub next: Option<TrackLine>,
    pub history: Option<Vec<HistoryLine>>,
    pub listeners: Option<String>,
    pub volume_icon: VolumeIcon,
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Requests accepted by the player core (from the control API or tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    Connect,
    TogglePlayback,
    SetVolume { value: f32 },
    ToggleMute,
    SetVisibility { visibility: Visibility },
    SetNetworkQuality { quality: Quality },
    Teardown,
}

// ── Chat ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user: String,
    pub text: String,
    /// Unix seconds.
    pub timestamp: i64,
}
