//! Poll scheduling state machine.
//!
//! Transitions:
//!
//! ```text
//!   Idle ──start──▶ Polling(…)
//!   Polling ──degrade──▶ Polling(base × 2)      (ignored while hidden)
//!   Polling ──background──▶ Polling(base × 3)
//!   Polling ──foreground / recover──▶ Polling(…)
//!   Polling ──suspend──▶ Suspended ──resume──▶ Polling(…)
//!   any ──teardown──▶ Idle
//! ```
//!
//! `Polling(…)` is the rate the tracked signals call for: base × 3 while
//! hidden, base × 2 while visible on a degraded network, base otherwise.
//! Every interval is derived from `base`, never from the previous interval,
//! so repeated background/foreground flips cannot drift.

use std::time::Duration;

use onair_proto::protocol::{Quality, Visibility};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Idle,
    Polling(Duration),
    Suspended,
}

#[derive(Debug, Clone)]
pub struct PollScheduler {
    base: Duration,
    state: ScheduleState,
    visibility: Visibility,
    quality: Quality,
}

impl PollScheduler {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            state: ScheduleState::Idle,
            visibility: Visibility::Visible,
            quality: Quality::Good,
        }
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    /// Current poll period, `None` unless polling.
    pub fn interval(&self) -> Option<Duration> {
        match self.state {
            ScheduleState::Polling(d) => Some(d),
            _ => None,
        }
    }

    /// Idle → Polling after the first successful connect. Signals seen while
    /// idle still count.
    pub fn start(&mut self) -> Option<Duration> {
        if self.state == ScheduleState::Idle {
            self.set(ScheduleState::Polling(self.period()));
        }
        self.interval()
    }

    /// Polling → Polling(base × 2). While hidden the background rate wins.
    pub fn degrade(&mut self) -> Option<Duration> {
        self.quality = Quality::Degraded;
        self.repoll();
        self.interval()
    }

    /// Polling → Polling(base), or keeps the background rate while hidden.
    pub fn recover(&mut self) -> Option<Duration> {
        self.quality = Quality::Good;
        self.repoll();
        self.interval()
    }

    /// Polling → Polling(base × 3).
    pub fn background(&mut self) -> Option<Duration> {
        self.visibility = Visibility::Hidden;
        self.repoll();
        self.interval()
    }

    /// Polling → Polling(base), or base × 2 if the network is still degraded.
    pub fn foreground(&mut self) -> Option<Duration> {
        self.visibility = Visibility::Visible;
        self.repoll();
        self.interval()
    }

    /// Polling → Suspended while the stream connection is down.
    pub fn suspend(&mut self) {
        if matches!(self.state, ScheduleState::Polling(_)) {
            self.set(ScheduleState::Suspended);
        }
    }

    /// Suspended → Polling at the rate the current signals call for.
    pub fn resume(&mut self) -> Option<Duration> {
        if self.state == ScheduleState::Suspended {
            self.set(ScheduleState::Polling(self.period()));
        }
        self.interval()
    }

    /// Any → Idle.
    pub fn teardown(&mut self) {
        self.set(ScheduleState::Idle);
    }

    fn period(&self) -> Duration {
        match (self.visibility, self.quality) {
            (Visibility::Hidden, _) => self.base * 3,
            (Visibility::Visible, Quality::Degraded) => self.base * 2,
            (Visibility::Visible, Quality::Good) => self.base,
        }
    }

    fn repoll(&mut self) {
        if matches!(self.state, ScheduleState::Polling(_)) {
            self.set(ScheduleState::Polling(self.period()));
        }
    }

    fn set(&mut self, next: ScheduleState) {
        if next != self.state {
            debug!("scheduler: {:?} → {:?}", self.state, next);
            self.state = next;
        }
    }
}
