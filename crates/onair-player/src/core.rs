//! The player controller.
//!
//! `PlayerCore` owns the scheduler, the retry governor, the media output and
//! every timer. All external inputs (HTTP commands, media signals) arrive as
//! [`PlayerEvent`]s on one mpsc channel; timers are polled in the same
//! `select!`, so there is never more than one of each and clearing one is
//! just setting it to `None`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use onair_proto::config::Config;
use onair_proto::i18n::{Locale, Strings};
use onair_proto::protocol::{Candidate, Command, Diagnostics, Quality, Visibility};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{CandidateKind, MediaError, PlayerError};
use crate::failover::select_candidate;
use crate::fetch::{HttpNowPlaying, NowPlayingSource};
use crate::media::{MediaOutput, MediaSignal};
use crate::prober::{HttpProber, Prober};
use crate::render;
use crate::retry::RetryGovernor;
use crate::scheduler::{PollScheduler, ScheduleState};
use crate::state::StateManager;

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Command(Command),
    Media(MediaSignal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerUpdate {
    StateChanged,
    ReconnectScheduled(Duration),
    /// The poll timer was replaced; `None` means polling stopped.
    PollRescheduled(Option<Duration>),
    Polled { ok: bool },
    /// Counters as logged by the periodic diagnostics tick.
    Diagnostics(Diagnostics),
}

#[derive(Debug, Clone)]
pub struct PlayerSettings {
    pub streams: Vec<Candidate>,
    pub api: Vec<Candidate>,
    pub update_interval: Duration,
    pub reconnect_delay: Duration,
    pub reconnect_ceiling: Duration,
    pub probe_timeout: Duration,
    pub fetch_timeout: Duration,
    pub locale: Locale,
    pub volume: f32,
    pub diagnostics_interval: Option<Duration>,
}

impl PlayerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            streams: config.streams.clone(),
            api: config.api.candidates(),
            update_interval: config.player.update_interval(),
            reconnect_delay: config.player.reconnect_delay(),
            reconnect_ceiling: config.player.reconnect_ceiling(),
            probe_timeout: config.player.probe_timeout(),
            fetch_timeout: config.player.fetch_timeout(),
            locale: config.player.locale,
            volume: config.player.volume.clamp(0.0, 1.0),
            diagnostics_interval: config
                .diagnostics
                .enabled
                .then(|| Duration::from_secs(config.diagnostics.log_interval_secs.max(1))),
        }
    }
}

/// Network and audio collaborators of the core.
pub struct Backends {
    pub stream_prober: Arc<dyn Prober>,
    pub api_prober: Arc<dyn Prober>,
    pub source: Arc<dyn NowPlayingSource>,
    pub media: Box<dyn MediaOutput>,
}

impl Backends {
    /// HEAD-probed streams, GET-probed API, reqwest fetches.
    pub fn http(client: reqwest::Client, media: Box<dyn MediaOutput>) -> Self {
        Self {
            stream_prober: Arc::new(HttpProber::stream(client.clone())),
            api_prober: Arc::new(HttpProber::api(client.clone())),
            source: Arc::new(HttpNowPlaying::new(client)),
            media,
        }
    }
}

enum Wake {
    Event(PlayerEvent),
    Closed,
    Poll,
    Reconnect,
    Diagnostics,
}

pub struct PlayerCore {
    settings: PlayerSettings,
    state: StateManager,
    stream_prober: Arc<dyn Prober>,
    api_prober: Arc<dyn Prober>,
    source: Arc<dyn NowPlayingSource>,
    media: Box<dyn MediaOutput>,
    scheduler: PollScheduler,
    governor: RetryGovernor,
    updates: broadcast::Sender<PlayerUpdate>,
    poll: Option<Interval>,
    poll_period: Option<Duration>,
    reconnect_at: Option<Instant>,
    diagnostics: Option<Interval>,
    /// The user asked for audio; cleared only by an explicit pause.
    intend_playing: bool,
}

impl PlayerCore {
    pub fn new(
        settings: PlayerSettings,
        backends: Backends,
        updates: broadcast::Sender<PlayerUpdate>,
    ) -> Self {
        Self {
            state: StateManager::new(settings.volume),
            scheduler: PollScheduler::new(settings.update_interval),
            governor: RetryGovernor::new(settings.reconnect_delay, settings.reconnect_ceiling),
            stream_prober: backends.stream_prober,
            api_prober: backends.api_prober,
            source: backends.source,
            media: backends.media,
            settings,
            updates,
            poll: None,
            poll_period: None,
            reconnect_at: None,
            diagnostics: None,
            intend_playing: false,
        }
    }

    pub fn state_manager(&self) -> StateManager {
        self.state.clone()
    }

    fn strings(&self) -> &'static Strings {
        self.settings.locale.strings()
    }

    /// Run until `Teardown` arrives or every event sender is dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<PlayerEvent>) {
        info!(
            "player: {} stream(s), {} api endpoint(s), poll every {:?}",
            self.settings.streams.len(),
            self.settings.api.len(),
            self.settings.update_interval
        );
        if let Err(e) = self.media.set_volume(self.settings.volume).await {
            warn!("player: initial volume: {}", e);
        }
        self.diagnostics = self.settings.diagnostics_interval.map(delayed_interval);

        loop {
            let wake = tokio::select! {
                ev = events.recv() => match ev {
                    Some(ev) => Wake::Event(ev),
                    None => Wake::Closed,
                },
                _ = tick(&mut self.poll) => Wake::Poll,
                _ = deadline(self.reconnect_at) => Wake::Reconnect,
                _ = tick(&mut self.diagnostics) => Wake::Diagnostics,
            };

            let before = self.state.rev().await;
            let keep_running = match wake {
                Wake::Event(PlayerEvent::Command(Command::Teardown)) | Wake::Closed => {
                    self.teardown().await;
                    false
                }
                Wake::Event(PlayerEvent::Command(cmd)) => {
                    debug!("player: command {:?}", cmd);
                    self.handle_command(cmd).await;
                    true
                }
                Wake::Event(PlayerEvent::Media(signal)) => {
                    self.handle_media(signal).await;
                    true
                }
                Wake::Poll => {
                    self.poll_tick().await;
                    true
                }
                Wake::Reconnect => {
                    self.reconnect_at = None;
                    self.governor.fire();
                    info!("player: reconnect attempt {}", self.governor.retry_count());
                    self.connect().await;
                    true
                }
                Wake::Diagnostics => {
                    self.log_diagnostics().await;
                    true
                }
            };
            if self.state.rev().await != before {
                let _ = self.updates.send(PlayerUpdate::StateChanged);
            }
            if !keep_running {
                break;
            }
        }
        info!("player: event loop stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect => self.connect().await,
            Command::TogglePlayback => self.toggle_playback().await,
            Command::SetVolume { value } => {
                let volume = value.clamp(0.0, 1.0);
                let muted = self.state.get_state().await.muted;
                if let Err(e) = self.media.set_volume(volume).await {
                    warn!("player: set volume: {}", e);
                }
                self.state.set_volume(volume, muted).await;
            }
            Command::ToggleMute => {
                let current = self.state.get_state().await;
                let muted = !current.muted;
                if let Err(e) = self.media.set_muted(muted).await {
                    warn!("player: set muted: {}", e);
                }
                self.state.set_volume(current.volume, muted).await;
            }
            Command::SetVisibility { visibility } => self.set_visibility(visibility).await,
            Command::SetNetworkQuality { quality } => match quality {
                Quality::Degraded => self.degrade().await,
                Quality::Good => self.recover().await,
            },
            // Handled by the run loop.
            Command::Teardown => {}
        }
    }

    async fn handle_media(&mut self, signal: MediaSignal) {
        match signal {
            MediaSignal::Error(reason) => {
                self.playback_failure(MediaError::Element(reason)).await
            }
            MediaSignal::Stalled | MediaSignal::Waiting => {
                debug!("player: buffering");
                self.state
                    .update(|s| s.diagnostics.buffering_events += 1)
                    .await;
                self.degrade().await;
            }
            MediaSignal::CanPlay => {
                self.state.set_status(self.strings().ready, false).await;
                self.recover().await;
            }
        }
    }

    // ── connection ────────────────────────────────────────────────────────────

    async fn connect(&mut self) {
        self.cancel_reconnect();
        self.state.set_status(self.strings().connecting, false).await;

        let picked = select_candidate(
            &self.settings.streams,
            self.stream_prober.as_ref(),
            self.settings.probe_timeout,
            CandidateKind::Stream,
        )
        .await;

        let Some(stream) = picked else {
            let err = PlayerError::AllCandidatesExhausted(CandidateKind::Stream);
            self.state
                .set_status(self.strings().all_streams_unavailable, true)
                .await;
            self.state
                .update(|s| {
                    s.active_stream_url = None;
                    s.is_playing = false;
                    s.last_error = Some(err.to_string());
                })
                .await;
            self.schedule_reconnect().await;
            self.scheduler.suspend();
            self.sync_poll_timer();
            return;
        };

        if let Err(e) = self.start_media(&stream.url).await {
            self.state
                .update(|s| s.active_stream_url = Some(stream.url.clone()))
                .await;
            self.playback_failure(e).await;
            return;
        }

        self.intend_playing = true;
        self.governor.reset();
        self.state
            .update(|s| {
                s.active_stream_url = Some(stream.url.clone());
                s.retry_count = 0;
                s.last_error = None;
                s.is_playing = true;
            })
            .await;
        self.state.set_status(self.strings().online, false).await;
        info!("player: connected to {}", stream.url);

        if self.scheduler.state() == ScheduleState::Idle {
            self.scheduler.start();
        } else {
            self.scheduler.resume();
        }
        self.sync_poll_timer();
        self.poll_tick().await;
    }

    async fn start_media(&mut self, url: &str) -> Result<(), MediaError> {
        self.media.load(url).await?;
        self.media.play().await
    }

    async fn playback_failure(&mut self, err: MediaError) {
        let err = PlayerError::Playback(err);
        warn!("player: {}", err);
        self.state
            .update(|s| {
                s.diagnostics.connection_errors += 1;
                s.last_error = Some(err.to_string());
                s.is_playing = false;
            })
            .await;
        self.state.set_status(self.strings().reconnecting, true).await;
        self.schedule_reconnect().await;
        self.scheduler.suspend();
        self.sync_poll_timer();
    }

    async fn schedule_reconnect(&mut self) {
        match self.governor.on_failure() {
            Some(delay) => {
                self.reconnect_at = Some(Instant::now() + delay);
                let retry_count = self.governor.retry_count();
                self.state.update(|s| s.retry_count = retry_count).await;
                info!("player: reconnect #{} in {:?}", retry_count, delay);
                let _ = self.updates.send(PlayerUpdate::ReconnectScheduled(delay));
            }
            None => debug!("player: reconnect already pending"),
        }
    }

    fn cancel_reconnect(&mut self) {
        self.governor.cancel();
        self.reconnect_at = None;
    }

    async fn toggle_playback(&mut self) {
        if self.state.get_state().await.is_playing {
            if let Err(e) = self.media.pause().await {
                warn!("player: pause: {}", e);
            }
            self.intend_playing = false;
            self.state.update(|s| s.is_playing = false).await;
            self.state.set_status(self.strings().paused, false).await;
        } else {
            self.connect().await;
        }
    }

    // ── polling ───────────────────────────────────────────────────────────────

    async fn resolve_api(&mut self) -> Option<String> {
        let picked = select_candidate(
            &self.settings.api,
            self.api_prober.as_ref(),
            self.settings.probe_timeout,
            CandidateKind::Api,
        )
        .await
        .map(|c| c.url);
        let url = picked.clone();
        self.state.update(|s| s.active_api_url = url).await;
        picked
    }

    async fn poll_tick(&mut self) {
        let api_url = match self.state.get_state().await.active_api_url {
            Some(url) => Some(url),
            None => self.resolve_api().await,
        };
        let Some(api_url) = api_url else {
            let _ = self.updates.send(PlayerUpdate::Polled { ok: false });
            return;
        };

        match self.source.fetch(&api_url, self.settings.fetch_timeout).await {
            Ok(payload) => {
                let locale = self.settings.locale;
                let view = render::render(&payload, locale);
                let track = render::track_info(&payload, locale);
                self.state
                    .update(|s| {
                        if track.is_some() {
                            s.track = track;
                        }
                        s.last_update = Some(Utc::now());
                    })
                    .await;
                self.state
                    .update_display(|d| render::apply(d, view))
                    .await;
                let _ = self.updates.send(PlayerUpdate::Polled { ok: true });
            }
            Err(e) => {
                warn!("player: {} from {}", PlayerError::Fetch(e), api_url);
                self.state.update(|s| s.active_api_url = None).await;
                let _ = self.updates.send(PlayerUpdate::Polled { ok: false });
            }
        }
    }

    /// Make the poll timer match the scheduler. A changed period replaces the
    /// timer, so the next tick is one full period from now.
    fn sync_poll_timer(&mut self) {
        let period = self.scheduler.interval();
        if period == self.poll_period {
            return;
        }
        self.poll_period = period;
        self.poll = period.map(delayed_interval);
        let _ = self.updates.send(PlayerUpdate::PollRescheduled(period));
    }

    // ── environment signals ───────────────────────────────────────────────────

    async fn degrade(&mut self) {
        if self.state.get_state().await.quality == Quality::Degraded {
            return;
        }
        info!("player: network quality degraded");
        self.state
            .update(|s| {
                s.quality = Quality::Degraded;
                s.diagnostics.quality_changes += 1;
            })
            .await;
        self.scheduler.degrade();
        self.sync_poll_timer();
    }

    async fn recover(&mut self) {
        if self.state.get_state().await.quality == Quality::Good {
            return;
        }
        info!("player: network quality recovered");
        self.state
            .update(|s| {
                s.quality = Quality::Good;
                s.diagnostics.quality_changes += 1;
            })
            .await;
        self.scheduler.recover();
        self.sync_poll_timer();
    }

    async fn set_visibility(&mut self, visibility: Visibility) {
        self.state.update(|s| s.visibility = visibility).await;
        match visibility {
            Visibility::Hidden => {
                self.scheduler.background();
            }
            Visibility::Visible => {
                self.scheduler.foreground();
                let playing = self.state.get_state().await.is_playing;
                if self.intend_playing && playing {
                    if let Err(e) = self.media.play().await {
                        warn!("player: resume on foreground: {}", e);
                    }
                }
            }
        }
        self.sync_poll_timer();
    }

    // ── housekeeping ──────────────────────────────────────────────────────────

    async fn log_diagnostics(&mut self) {
        let s = self.state.get_state().await;
        info!(
            quality = ?s.quality,
            buffering_events = s.diagnostics.buffering_events,
            connection_errors = s.diagnostics.connection_errors,
            quality_changes = s.diagnostics.quality_changes,
            last_error = s.last_error.as_deref().unwrap_or("-"),
            stream = s.active_stream_url.as_deref().unwrap_or("-"),
            playing = s.is_playing,
            volume = s.volume,
            muted = s.muted,
            "player: diagnostics"
        );
        let _ = self.updates.send(PlayerUpdate::Diagnostics(s.diagnostics));
    }

    async fn teardown(&mut self) {
        info!("player: teardown");
        if let Err(e) = self.media.stop().await {
            warn!("player: stop: {}", e);
        }
        self.cancel_reconnect();
        self.diagnostics = None;
        self.scheduler.teardown();
        self.sync_poll_timer();
        self.intend_playing = false;
        self.state.update(|s| s.is_playing = false).await;
    }
}

/// Interval whose first tick is one `period` from now.
fn delayed_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
